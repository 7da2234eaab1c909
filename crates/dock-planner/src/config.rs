//! 运动参数
//!
//! 所有偏移量与速度都可以通过配置文件的 `[motion]` 段覆盖，
//! 未给出的字段使用下面的默认值。

use crate::PlannerError;
use dock_protocol::Pose;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 直线运动速度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveSpeed {
    /// 速度（mm/s）
    pub velocity: f64,
    /// 加速度（mm/s²）
    pub acceleration: f64,
}

impl MoveSpeed {
    pub const fn new(velocity: f64, acceleration: f64) -> Self {
        Self {
            velocity,
            acceleration,
        }
    }

    fn is_valid(&self) -> bool {
        self.velocity.is_finite()
            && self.velocity > 0.0
            && self.acceleration.is_finite()
            && self.acceleration > 0.0
    }
}

/// 振荡插入参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiggleProfile {
    pub amplitude: Pose,
    pub period: Pose,
    /// 振荡持续时间（秒），之后急停
    pub duration_secs: f64,
}

impl Default for WiggleProfile {
    fn default() -> Self {
        Self {
            amplitude: Pose::new(-47.0, 1.25, 0.0, 0.0, 0.0, 0.0),
            period: Pose::new(10.0, 0.25, 0.0, 0.0, 0.0, 0.0),
            duration_secs: 10.0,
        }
    }
}

impl WiggleProfile {
    pub fn duration(&self) -> Result<Duration, PlannerError> {
        Duration::try_from_secs_f64(self.duration_secs).map_err(|e| {
            PlannerError::InvalidProfile(format!("wiggle duration {}: {}", self.duration_secs, e))
        })
    }
}

/// 柔顺插入参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceControlProfile {
    /// 任务空间刚度
    pub stiffness: [f64; 6],
    /// 工具坐标系下的插入位移
    pub insertion: Pose,
    pub speed: MoveSpeed,
}

impl Default for ForceControlProfile {
    fn default() -> Self {
        Self {
            stiffness: [3000.0, 3000.0, 3000.0, 200.0, 200.0, 200.0],
            insertion: Pose::new(-47.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            speed: MoveSpeed::new(75.0, 100.0),
        }
    }
}

/// 运动参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// 相机到工具的偏移
    pub camera_offset: Pose,
    /// 粗定位阶段的补拍偏移
    pub retake_offset: Pose,
    pub approach_speed: MoveSpeed,
    /// 精定位阶段的安全距离偏移
    pub safety_offset: Pose,
    pub docking_speed: MoveSpeed,
    pub home_speed: MoveSpeed,
    pub wiggle: WiggleProfile,
    pub force_control: ForceControlProfile,
    /// 拔出时工具坐标系下的后退位移
    pub retreat: Pose,
    pub retreat_speed: MoveSpeed,
    /// 数据采集时工具坐标系下的探测位移
    pub probe: Pose,
    pub probe_speed: MoveSpeed,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            camera_offset: Pose::new(-82.0, -6.0, 55.5, 0.0, 0.0, 0.0),
            retake_offset: Pose::new(-250.0, 0.0, -100.0, 0.0, 0.0, 0.0),
            approach_speed: MoveSpeed::new(300.0, 300.0),
            safety_offset: Pose::new(-80.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            docking_speed: MoveSpeed::new(100.0, 100.0),
            home_speed: MoveSpeed::new(300.0, 300.0),
            wiggle: WiggleProfile::default(),
            force_control: ForceControlProfile::default(),
            retreat: Pose::new(60.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            retreat_speed: MoveSpeed::new(50.0, 50.0),
            probe: Pose::new(0.0, 0.0, -1.0, 0.0, 0.0, 0.0),
            probe_speed: MoveSpeed::new(100.0, 100.0),
        }
    }
}

impl MotionConfig {
    /// 校验速度为正、振荡时长可用
    pub fn validate(&self) -> Result<(), PlannerError> {
        let speeds = [
            ("approach_speed", self.approach_speed),
            ("docking_speed", self.docking_speed),
            ("home_speed", self.home_speed),
            ("force_control.speed", self.force_control.speed),
            ("retreat_speed", self.retreat_speed),
            ("probe_speed", self.probe_speed),
        ];
        for (name, speed) in speeds {
            if !speed.is_valid() {
                return Err(PlannerError::InvalidProfile(format!(
                    "{} must be positive, got vel={} acc={}",
                    name, speed.velocity, speed.acceleration
                )));
            }
        }
        self.wiggle.duration()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MotionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.wiggle.duration().unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: MotionConfig = serde_json::from_str(
            r#"{"camera_offset": [0, 0, 0, 0, 0, 0], "wiggle": {"duration_secs": 4.5}}"#,
        )
        .unwrap();
        assert!(config.camera_offset.is_zero());
        assert_eq!(config.wiggle.duration_secs, 4.5);
        assert_eq!(config.wiggle.amplitude, WiggleProfile::default().amplitude);
        assert_eq!(config.retreat_speed, MoveSpeed::new(50.0, 50.0));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MotionConfig::default();
        config.docking_speed = MoveSpeed::new(0.0, 100.0);
        assert!(matches!(config.validate(), Err(PlannerError::InvalidProfile(_))));

        let mut config = MotionConfig::default();
        config.wiggle.duration_secs = -1.0;
        assert!(matches!(config.validate(), Err(PlannerError::InvalidProfile(_))));
    }
}
