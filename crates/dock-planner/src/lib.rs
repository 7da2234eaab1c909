//! # Dock Motion Planner
//!
//! 运动规划层：把视觉检测结果和操作命令翻译为执行器原语序列。
//!
//! - 独占 [`RobotState`]，是唯一的写入者
//! - 每条原语都经由 [`dock_actuator::ActuatorTransport`] 同步下发
//! - 阶段结果和触发词通过 [`dock_protocol::Publisher`] 发布到命名通道

pub mod config;
mod error;
pub mod geometry;
pub mod planner;
pub mod state;

pub use config::{ForceControlProfile, MotionConfig, MoveSpeed, WiggleProfile};
pub use error::PlannerError;
pub use geometry::{DEFAULT_HOME_TOLERANCE, convert_unit, within};
pub use planner::{ApproachOutcome, MotionPlanner};
pub use state::{PlugInMethod, RobotState};
