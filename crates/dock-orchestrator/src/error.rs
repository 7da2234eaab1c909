//! 编排层错误类型

use dock_planner::PlannerError;
use dock_protocol::ProtocolError;
use thiserror::Error;

/// 编排层错误类型
///
/// 错误文本原样作为广播通道上 `{"error": ...}` 的内容。
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    /// 入站行不是合法 JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
