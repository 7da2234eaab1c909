//! 测试替身
//!
//! `RecordingPublisher` 记录所有出站消息，供规划层和编排层的测试断言。

use crate::channel::{Channel, Outbound, Publisher};
use parking_lot::Mutex;
use serde_json::Value;

/// 记录出站消息的 Publisher
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    sent: Mutex<Vec<Outbound>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有已发布消息（按发布顺序）
    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().clone()
    }

    /// 某个通道上的全部 payload
    pub fn on(&self, channel: Channel) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.channel == channel)
            .map(|m| m.payload.clone())
            .collect()
    }

    /// 某个通道上是否出现过指定文本
    pub fn contains_text(&self, channel: Channel, text: &str) -> bool {
        self.on(channel).iter().any(|p| p.as_str() == Some(text))
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, channel: Channel, payload: Value) {
        self.sent.lock().push(Outbound { channel, payload });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::notice;

    #[test]
    fn test_recording_publisher() {
        let publisher = RecordingPublisher::new();
        publisher.notify(Channel::VisionInput, notice::TAKE_IMAGE);
        publisher.notify(Channel::Safety, notice::STOP_DETECTION);

        assert_eq!(publisher.sent().len(), 2);
        assert!(publisher.contains_text(Channel::VisionInput, notice::TAKE_IMAGE));
        assert!(!publisher.contains_text(Channel::Broadcast, notice::TAKE_IMAGE));

        publisher.clear();
        assert!(publisher.sent().is_empty());
    }
}
