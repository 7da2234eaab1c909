//! 出站命名通道
//!
//! 通道是逻辑目的地，而不是物理连接；由网络前端映射到实际传输。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// 命名通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// 执行器回显
    #[serde(rename = "robot_echo")]
    ActuatorEcho,
    /// 视觉输入（触发拍照 / 转发遥测）
    #[serde(rename = "take_image")]
    VisionInput,
    /// 安全子系统
    #[serde(rename = "message_safety")]
    Safety,
    /// 广播给所有监听者
    #[serde(rename = "message_all")]
    Broadcast,
}

impl Channel {
    /// 线上名称
    pub const fn wire_name(self) -> &'static str {
        match self {
            Channel::ActuatorEcho => "robot_echo",
            Channel::VisionInput => "take_image",
            Channel::Safety => "message_safety",
            Channel::Broadcast => "message_all",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// 出站消息（前端线上格式：每行一个 JSON）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outbound {
    pub channel: Channel,
    pub payload: Value,
}

/// 出站发布接口
///
/// 由网络前端实现。实现必须是非阻塞的或至少有界阻塞的：
/// 发布发生在唯一的处理线程上，慢客户端不能拖住执行器序列。
pub trait Publisher: Send + Sync {
    /// 向命名通道发布一条消息
    fn publish(&self, channel: Channel, payload: Value);

    /// 发布纯文本通知
    fn notify(&self, channel: Channel, text: &str) {
        self.publish(channel, Value::String(text.to_string()));
    }
}

/// 标准通知文本
///
/// 这些字符串是与视觉、安全子系统约定的触发词，不能随意修改。
pub mod notice {
    pub const TAKE_IMAGE: &str = "take image";
    pub const RETAKE_IMAGE: &str = "retake image";
    pub const IN_POSITION: &str = "in position";
    pub const BEGIN_DETECTION: &str = "begin detection";
    pub const INSERTION_COMPLETE: &str = "insertion complete";
    pub const EXTRACTION_COMPLETE: &str = "extraction complete";
    pub const START_DETECTION: &str = "start detection";
    pub const STOP_DETECTION: &str = "stop detection";
    pub const SAFETY_STOP: &str = "safety stop";
    pub const SAFETY_ACK: &str = "safety monitoring acknowledged";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_channel_wire_names_match_serde() {
        for channel in [
            Channel::ActuatorEcho,
            Channel::VisionInput,
            Channel::Safety,
            Channel::Broadcast,
        ] {
            let value = serde_json::to_value(channel).unwrap();
            assert_eq!(value, json!(channel.wire_name()));
        }
    }

    #[test]
    fn test_outbound_line_format() {
        let outbound = Outbound {
            channel: Channel::VisionInput,
            payload: json!(notice::TAKE_IMAGE),
        };
        let line = serde_json::to_string(&outbound).unwrap();
        assert_eq!(line, r#"{"channel":"take_image","payload":"take image"}"#);
    }
}
