//! # Dock Protocol
//!
//! 插接编排系统的消息协议定义（无 IO 依赖）
//!
//! ## 模块
//!
//! - `pose`: 六自由度位姿与单位制
//! - `envelope`: 入站信封（kind / topic / payload）校验与解析
//! - `message`: 命令、通知的主题枚举与 payload 解码
//! - `channel`: 出站命名通道与 `Publisher` 抽象
//!
//! ## 线上格式
//!
//! 入站信封为 JSON 对象：
//!
//! ```json
//! {"message_type": "cmd", "content": "socket_detection",
//!  "data": {"result": 1, "unit": "m/rad", "coords": [0.1, 0, 0, 0, 0, 0]}}
//! ```
//!
//! 也接受别名字段 `kind` / `topic` / `payload`。

pub mod channel;
pub mod envelope;
mod error;
pub mod message;
pub mod pose;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// 重新导出常用类型
pub use channel::{Channel, Outbound, Publisher, notice};
pub use envelope::{Envelope, EnvelopeKind};
pub use error::ProtocolError;
pub use message::{
    Command, CommandTopic, Detection, DetectionResult, Notification, NotificationTopic,
    SafetyEvent, SafetyPhase,
};
pub use pose::{Pose, PoseUnit};
