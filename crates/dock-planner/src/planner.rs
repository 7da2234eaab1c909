//! 运动规划器
//!
//! 把高层动作（接近、插入、拔出、回零、急停、数据采集）展开为原语序列，
//! 逐条经执行器下发，并根据遥测更新 [`RobotState`]。

use crate::config::{MotionConfig, MoveSpeed};
use crate::geometry::{DEFAULT_HOME_TOLERANCE, convert_unit, within};
use crate::state::{PlugInMethod, RobotState};
use crate::PlannerError;
use dock_actuator::{ActuatorTransport, LinearMove, MotionPrimitive, Reference, Telemetry};
use dock_protocol::{Channel, DetectionResult, Pose, Publisher, notice};
use serde_json::json;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 插入序列（固定三条原语）
type InsertionPlan = SmallVec<[MotionPrimitive; 3]>;

/// 接近阶段的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproachOutcome {
    /// 粗定位完成，需要补拍
    RetakeImage,
    /// 精定位完成，可以插入
    InPosition,
    /// 安全急停生效，未下发任何运动
    Held,
}

impl ApproachOutcome {
    /// 发布到视觉通道的触发词
    pub fn notice(self) -> Option<&'static str> {
        match self {
            ApproachOutcome::RetakeImage => Some(notice::RETAKE_IMAGE),
            ApproachOutcome::InPosition => Some(notice::IN_POSITION),
            ApproachOutcome::Held => None,
        }
    }
}

/// 运动规划器
pub struct MotionPlanner<T: ActuatorTransport = Box<dyn ActuatorTransport>> {
    transport: T,
    publisher: Arc<dyn Publisher>,
    state: RobotState,
    motion: MotionConfig,
    home_tolerance: f64,
}

impl<T: ActuatorTransport> MotionPlanner<T> {
    pub fn new(
        transport: T,
        publisher: Arc<dyn Publisher>,
        state: RobotState,
        motion: MotionConfig,
    ) -> Self {
        Self {
            transport,
            publisher,
            state,
            motion,
            home_tolerance: DEFAULT_HOME_TOLERANCE,
        }
    }

    /// 设置"接近 home"的相对容差
    pub fn with_home_tolerance(mut self, tolerance: f64) -> Self {
        self.home_tolerance = tolerance;
        self
    }

    pub fn state(&self) -> &RobotState {
        &self.state
    }

    pub fn motion(&self) -> &MotionConfig {
        &self.motion
    }

    pub fn home_tolerance(&self) -> f64 {
        self.home_tolerance
    }

    // ==================== 动作 ====================

    /// 根据检测结果接近插座
    ///
    /// 当前位姿在 home 附近时做粗定位（相对运动 + 补拍），否则做精定位。
    /// 急停生效时精定位不下发任何运动。
    ///
    /// # Errors
    /// - `PlannerError::Protocol`: 单位不支持
    /// - `PlannerError::EmptyDetection`: 检测位姿全零
    /// - `PlannerError::MissingFrontSocketPose`: 关闭精确检测且未配置前置位姿
    /// - `PlannerError::Actuator`: 执行器失败
    pub fn approach(&mut self, unit: &str, detected: Pose) -> Result<ApproachOutcome, PlannerError> {
        let pose = convert_unit(unit, detected)?;
        if pose.is_zero() {
            return Err(PlannerError::EmptyDetection);
        }

        let target = pose + self.motion.camera_offset;
        debug!("Socket at {} (tool frame {})", pose, target);

        let outcome = if within(&self.state.current_pose, &self.state.home_pose, self.home_tolerance) {
            let displacement = target + self.motion.retake_offset;
            info!("Coarse approach: relative move {}", displacement);
            self.dispatch(relative(displacement, self.motion.approach_speed, None))?;
            ApproachOutcome::RetakeImage
        } else if self.state.safety_stop_active {
            warn!("Safety stop active, fine approach skipped");
            ApproachOutcome::Held
        } else {
            let primitive = if self.state.accurate_detection {
                let displacement = target + self.motion.safety_offset;
                info!("Fine approach: relative move {}", displacement);
                relative(displacement, self.motion.docking_speed, None)
            } else {
                let front = self
                    .state
                    .front_socket_pose()
                    .ok_or(PlannerError::MissingFrontSocketPose(self.state.selected_target))?;
                info!(
                    "Fine approach: front socket pose {} (target {})",
                    front, self.state.selected_target
                );
                MotionPrimitive::MoveAbsolute(
                    LinearMove::new(
                        front,
                        self.motion.docking_speed.velocity,
                        self.motion.docking_speed.acceleration,
                    )
                    .in_frame(Reference::Base),
                )
            };
            self.dispatch(primitive)?;
            ApproachOutcome::InPosition
        };

        if let Some(text) = outcome.notice() {
            self.publisher.notify(Channel::VisionInput, text);
        }
        Ok(outcome)
    }

    /// 插入插头
    pub fn insert(&mut self) -> Result<(), PlannerError> {
        let plan = self.insertion_plan()?;
        info!(
            "Inserting plug ({:?}, {} primitives)",
            self.state.plug_in_method,
            plan.len()
        );
        for primitive in plan {
            self.dispatch(primitive)?;
        }

        self.publisher
            .notify(Channel::VisionInput, notice::INSERTION_COMPLETE);
        self.publisher.notify(Channel::Safety, notice::STOP_DETECTION);
        Ok(())
    }

    fn insertion_plan(&self) -> Result<InsertionPlan, PlannerError> {
        let mut plan = InsertionPlan::new();
        match self.state.plug_in_method {
            PlugInMethod::Wiggle => {
                let wiggle = &self.motion.wiggle;
                plan.push(MotionPrimitive::Oscillate {
                    amplitude: wiggle.amplitude,
                    period: wiggle.period,
                });
                plan.push(MotionPrimitive::Wait(wiggle.duration()?));
                plan.push(MotionPrimitive::HardStop);
            },
            PlugInMethod::ForceControl => {
                let profile = &self.motion.force_control;
                plan.push(MotionPrimitive::ComplianceEnable {
                    stiffness: profile.stiffness,
                });
                plan.push(relative(profile.insertion, profile.speed, Some(Reference::Tool)));
                plan.push(MotionPrimitive::ComplianceDisable);
            },
        }
        Ok(plan)
    }

    /// 回到 home
    ///
    /// 标定回零使用执行器示教的 home；否则以绝对运动回到 `home_pose`。
    /// 成功后清除安全急停锁存。
    pub fn home(&mut self, calibration: bool) -> Result<(), PlannerError> {
        let primitive = if calibration {
            info!("Homing to learned position (calibration)");
            MotionPrimitive::HomeLearned
        } else {
            info!("Homing to {}", self.state.home_pose);
            MotionPrimitive::MoveAbsolute(
                LinearMove::new(
                    self.state.home_pose,
                    self.motion.home_speed.velocity,
                    self.motion.home_speed.acceleration,
                )
                .in_frame(Reference::Base),
            )
        };
        self.dispatch(primitive)?;

        if self.state.safety_stop_active {
            info!("Safety stop cleared");
        }
        self.state.safety_stop_active = false;
        Ok(())
    }

    /// 拔出插头并回到 home
    pub fn extract(&mut self) -> Result<(), PlannerError> {
        info!("Extracting plug");
        self.dispatch(relative(
            self.motion.retreat,
            self.motion.retreat_speed,
            Some(Reference::Tool),
        ))?;
        self.publisher.notify(Channel::Safety, notice::START_DETECTION);

        self.home(false)?;
        self.publisher
            .notify(Channel::VisionInput, notice::EXTRACTION_COMPLETE);
        Ok(())
    }

    /// 安全急停
    ///
    /// 锁存在下发原语之前设置，执行器失败也不会让锁存保持打开。
    pub fn stop(&mut self) -> Result<(), PlannerError> {
        warn!("Safety stop requested");
        self.state.safety_stop_active = true;

        let result = self.dispatch(MotionPrimitive::HardStop);
        self.publisher.notify(Channel::Broadcast, notice::SAFETY_STOP);
        result.map(|_| ())
    }

    /// 检测失败或不可靠时的重新定位
    ///
    /// 目前没有重新定位策略，只记录日志。
    pub fn reposition(&mut self, result: DetectionResult) {
        info!(
            "Reposition requested after {:?} detection, no strategy configured",
            result
        );
    }

    /// 数据采集探测
    ///
    /// 探测运动期间遥测位姿会被转发到视觉通道。
    pub fn collect_data(&mut self) -> Result<Pose, PlannerError> {
        self.state.collect_data = true;
        let result = self.dispatch(relative(
            self.motion.probe,
            self.motion.probe_speed,
            Some(Reference::Tool),
        ));
        self.state.collect_data = false;
        Ok(result?.pose)
    }

    /// 选择前置插座目标
    pub fn select_target(&mut self, index: usize) -> Result<(), PlannerError> {
        let available = self.state.front_socket_poses.len();
        if index >= available {
            return Err(PlannerError::InvalidTarget { index, available });
        }
        info!("Selected front socket target {}", index);
        self.state.selected_target = index;
        Ok(())
    }

    // ==================== 下发 ====================

    /// 下发一条原语并应用遥测副作用
    fn dispatch(&mut self, primitive: MotionPrimitive) -> Result<Telemetry, PlannerError> {
        let telemetry = self.transport.send(&primitive).map_err(|e| {
            error!(
                "Actuator {} failed on {}: {}",
                self.transport.peer(),
                primitive.name(),
                e
            );
            e
        })?;

        self.state.current_pose = telemetry.pose;
        if matches!(primitive, MotionPrimitive::HomeLearned) && self.state.is_first_home_move {
            info!("Home pose captured: {}", telemetry.pose);
            self.state.home_pose = telemetry.pose;
            self.state.is_first_home_move = false;
        }
        if self.state.collect_data {
            self.publisher.publish(Channel::VisionInput, json!(telemetry.pose));
        }

        self.publisher.publish(
            Channel::ActuatorEcho,
            json!({
                "primitive": primitive.name(),
                "pose": telemetry.pose,
                "wrench": telemetry.wrench,
            }),
        );
        Ok(telemetry)
    }
}

fn relative(displacement: Pose, speed: MoveSpeed, reference: Option<Reference>) -> MotionPrimitive {
    let mut linear = LinearMove::new(displacement, speed.velocity, speed.acceleration);
    linear.reference = reference;
    MotionPrimitive::MoveRelative(linear)
}
