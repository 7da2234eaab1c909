//! # Dock Orchestrator
//!
//! 编排层：信封路由 + 对接状态机。
//!
//! ```text
//! 入站 JSON ──► EnvelopeRouter ──► Orchestrator ──► MotionPlanner ──► Actuator
//!                    │                  │
//!                    └── 错误广播 ◄──────┘
//! ```
//!
//! - 所有信封在同一个处理线程上逐条处理
//! - 任何处理错误都转换为广播通道上的 `{"error": ...}`，状态机不前进
//! - 状态快照通过 `ArcSwap` 发布，其他线程无锁读取

mod error;
pub mod orchestrator;
pub mod router;
pub mod state;

pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
pub use router::EnvelopeRouter;
pub use state::{OrchestratorState, StatusHandle, StatusSnapshot};
