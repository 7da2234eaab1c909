//! 规划层错误类型

use dock_actuator::ActuatorError;
use dock_protocol::ProtocolError;
use thiserror::Error;

/// 规划层错误类型
///
/// 所有变体都不重试，直接上报给编排层。
#[derive(Error, Debug)]
pub enum PlannerError {
    /// 检测位姿全零（视觉未给出有效结果）
    #[error("Detected pose is empty (all zeros)")]
    EmptyDetection,

    /// 未配置所选目标的前置插座位姿
    #[error("No front socket pose configured for target {0}")]
    MissingFrontSocketPose(usize),

    /// 目标索引越界
    #[error("Target index {index} out of range ({available} front socket poses configured)")]
    InvalidTarget { index: usize, available: usize },

    /// 运动配置无效
    #[error("Invalid motion profile: {0}")]
    InvalidProfile(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),
}
