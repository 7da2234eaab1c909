//! 运动原语
//!
//! 封闭的原语集合，按执行器脚本语法编码为一行文本：
//!
//! | 原语 | 线上文本 |
//! |------|----------|
//! | MoveAbsolute | `movel([..], vel=V, acc=A, ref=DR_BASE, mod=DR_MV_MOD_ABS)` |
//! | MoveRelative | `movel([..], vel=V, acc=A, ref=DR_TOOL, mod=DR_MV_MOD_REL)` |
//! | HomeLearned | `move_home(DR_HOME_TARGET_USER)` |
//! | Oscillate | `amove_periodic([..], period=[..])` |
//! | Wait | `wait(S)` |
//! | ComplianceEnable | `task_compliance_ctrl([..])` |
//! | ComplianceDisable | `release_compliance_ctrl()` |
//! | HardStop | `stop(DR_SSTOP)` |
//!
//! 直线运动统一使用同步 `movel`：执行器在运动完成后才回复遥测，
//! 保证同一时刻只有一条原语在途。

use dock_protocol::Pose;
use std::fmt::{self, Write};
use std::time::Duration;

/// 参考坐标系
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// 基座坐标系
    Base,
    /// 工具坐标系
    Tool,
}

impl Reference {
    const fn symbol(self) -> &'static str {
        match self {
            Reference::Base => "DR_BASE",
            Reference::Tool => "DR_TOOL",
        }
    }
}

/// 直线运动参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearMove {
    /// 目标位姿（绝对运动）或位移量（相对运动），mm/deg
    pub target: Pose,
    /// 速度（mm/s）
    pub velocity: f64,
    /// 加速度（mm/s²）
    pub acceleration: f64,
    /// 参考坐标系；`None` 时使用执行器当前默认坐标系
    pub reference: Option<Reference>,
}

impl LinearMove {
    pub fn new(target: Pose, velocity: f64, acceleration: f64) -> Self {
        Self {
            target,
            velocity,
            acceleration,
            reference: None,
        }
    }

    /// 指定参考坐标系
    pub fn in_frame(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// 运动原语
#[derive(Debug, Clone, PartialEq)]
pub enum MotionPrimitive {
    /// 绝对直线运动
    MoveAbsolute(LinearMove),
    /// 相对直线运动
    MoveRelative(LinearMove),
    /// 回到执行器示教的 home 位置
    HomeLearned,
    /// 周期振荡（异步，需随后 `Wait` + `HardStop`）
    Oscillate { amplitude: Pose, period: Pose },
    /// 执行器端等待
    Wait(Duration),
    /// 开启任务空间柔顺控制
    ComplianceEnable { stiffness: [f64; 6] },
    /// 释放柔顺控制
    ComplianceDisable,
    /// 急停（软停止）
    HardStop,
}

impl MotionPrimitive {
    /// 原语名称（用于日志）
    pub const fn name(&self) -> &'static str {
        match self {
            MotionPrimitive::MoveAbsolute(_) => "move_absolute",
            MotionPrimitive::MoveRelative(_) => "move_relative",
            MotionPrimitive::HomeLearned => "home_learned",
            MotionPrimitive::Oscillate { .. } => "oscillate",
            MotionPrimitive::Wait(_) => "wait",
            MotionPrimitive::ComplianceEnable { .. } => "compliance_enable",
            MotionPrimitive::ComplianceDisable => "compliance_disable",
            MotionPrimitive::HardStop => "hard_stop",
        }
    }

    /// 是否为相对运动
    pub fn is_relative(&self) -> bool {
        matches!(self, MotionPrimitive::MoveRelative(_))
    }

    /// 是否为绝对运动
    pub fn is_absolute(&self) -> bool {
        matches!(self, MotionPrimitive::MoveAbsolute(_))
    }

    /// 直线运动参数（仅 MoveAbsolute / MoveRelative）
    pub fn linear(&self) -> Option<&LinearMove> {
        match self {
            MotionPrimitive::MoveAbsolute(m) | MotionPrimitive::MoveRelative(m) => Some(m),
            _ => None,
        }
    }

    /// 编码为执行器脚本文本
    pub fn encode(&self) -> String {
        let mut out = String::new();
        // 写入 String 不会失败
        let _ = self.write_script(&mut out);
        out
    }

    fn write_script(&self, out: &mut String) -> fmt::Result {
        match self {
            MotionPrimitive::MoveAbsolute(m) => write_movel(out, m, "DR_MV_MOD_ABS"),
            MotionPrimitive::MoveRelative(m) => write_movel(out, m, "DR_MV_MOD_REL"),
            MotionPrimitive::HomeLearned => out.write_str("move_home(DR_HOME_TARGET_USER)"),
            MotionPrimitive::Oscillate { amplitude, period } => {
                out.write_str("amove_periodic(")?;
                write_list(out, amplitude.as_array())?;
                out.write_str(", period=")?;
                write_list(out, period.as_array())?;
                out.write_str(")")
            },
            MotionPrimitive::Wait(duration) => write!(out, "wait({})", duration.as_secs_f64()),
            MotionPrimitive::ComplianceEnable { stiffness } => {
                out.write_str("task_compliance_ctrl(")?;
                write_list(out, stiffness)?;
                out.write_str(")")
            },
            MotionPrimitive::ComplianceDisable => out.write_str("release_compliance_ctrl()"),
            MotionPrimitive::HardStop => out.write_str("stop(DR_SSTOP)"),
        }
    }
}

impl fmt::Display for MotionPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn write_movel(out: &mut String, m: &LinearMove, mode: &str) -> fmt::Result {
    out.write_str("movel(")?;
    write_list(out, m.target.as_array())?;
    write!(out, ", vel={}, acc={}", m.velocity, m.acceleration)?;
    if let Some(reference) = m.reference {
        write!(out, ", ref={}", reference.symbol())?;
    }
    write!(out, ", mod={})", mode)
}

fn write_list(out: &mut String, values: &[f64]) -> fmt::Result {
    out.write_char('[')?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write!(out, "{}", v)?;
    }
    out.write_char(']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_relative_move() {
        let m = LinearMove::new(Pose::new(-232.0, -6.0, -44.5, 0.0, 0.0, 0.0), 300.0, 300.0);
        let primitive = MotionPrimitive::MoveRelative(m);
        assert_eq!(
            primitive.encode(),
            "movel([-232, -6, -44.5, 0, 0, 0], vel=300, acc=300, mod=DR_MV_MOD_REL)"
        );
        assert!(primitive.is_relative());
        assert!(!primitive.is_absolute());
    }

    #[test]
    fn test_encode_absolute_move_in_base_frame() {
        let m = LinearMove::new(Pose::new(400.0, 0.0, 300.0, 0.0, 180.0, 0.0), 300.0, 300.0)
            .in_frame(Reference::Base);
        assert_eq!(
            MotionPrimitive::MoveAbsolute(m).encode(),
            "movel([400, 0, 300, 0, 180, 0], vel=300, acc=300, ref=DR_BASE, mod=DR_MV_MOD_ABS)"
        );
    }

    #[test]
    fn test_encode_fixed_primitives() {
        assert_eq!(
            MotionPrimitive::HomeLearned.encode(),
            "move_home(DR_HOME_TARGET_USER)"
        );
        assert_eq!(MotionPrimitive::HardStop.encode(), "stop(DR_SSTOP)");
        assert_eq!(
            MotionPrimitive::ComplianceDisable.encode(),
            "release_compliance_ctrl()"
        );
        assert_eq!(
            MotionPrimitive::Wait(Duration::from_secs(10)).encode(),
            "wait(10)"
        );
        assert_eq!(
            MotionPrimitive::Wait(Duration::from_millis(500)).encode(),
            "wait(0.5)"
        );
    }

    #[test]
    fn test_encode_oscillation_and_compliance() {
        let primitive = MotionPrimitive::Oscillate {
            amplitude: Pose::new(-47.0, 1.25, 0.0, 0.0, 0.0, 0.0),
            period: Pose::new(10.0, 0.25, 0.0, 0.0, 0.0, 0.0),
        };
        assert_eq!(
            primitive.encode(),
            "amove_periodic([-47, 1.25, 0, 0, 0, 0], period=[10, 0.25, 0, 0, 0, 0])"
        );

        let primitive = MotionPrimitive::ComplianceEnable {
            stiffness: [3000.0, 3000.0, 3000.0, 200.0, 200.0, 200.0],
        };
        assert_eq!(
            primitive.to_string(),
            "task_compliance_ctrl([3000, 3000, 3000, 200, 200, 200])"
        );
    }
}
