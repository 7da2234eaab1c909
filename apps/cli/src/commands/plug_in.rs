//! 插入命令
//!
//! 完整对接流程：
//!
//! ```text
//! reset_plug_in ──► "take image" ──► 视觉 ──► socket_detection
//!                        ▲                          │
//!                        └──── "retake image" ◄─────┤
//!                                                   ▼
//!                   "insertion complete" ◄── start_plug_in ◄── "in position"
//! ```

use crate::client::{DockClient, ServerEvent};
use crate::vision::{self, DEFAULT_VISION_CMD, VisionError};
use anyhow::{Result, bail};
use clap::Args;
use dock_protocol::message::field;
use dock_protocol::{Channel, Envelope, EnvelopeKind, Outbound, notice};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

/// 插入命令参数
#[derive(Args, Debug)]
pub struct PlugInCommand {
    /// 前置插座目标索引
    #[arg(short, long)]
    pub target: Option<usize>,

    /// 视觉检测命令（由 `sh -c` 执行）
    #[arg(long, default_value = DEFAULT_VISION_CMD)]
    pub vision_cmd: String,
}

/// 收到一条下行消息后的动作
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// 与本流程无关
    Wait,
    /// 发送信封，继续等待
    Send(Envelope),
    /// 发送信封后终止（服务端不会再推进流程）
    SendAndAbort(Envelope, String),
    /// 插入完成
    Done,
    /// 服务端报告失败
    Failed(String),
}

impl PlugInCommand {
    pub fn execute(&self, client: &mut DockClient) -> Result<()> {
        println!("🏠 复位到初始位置...");
        client.send(&reset_envelope(self.target))?;

        loop {
            let ServerEvent::Outbound(outbound) = client.next_event()? else {
                continue;
            };
            match next_step(&outbound, || vision::capture(&self.vision_cmd))? {
                Step::Wait => {},
                Step::Send(envelope) => {
                    info!("Sending {}", envelope.topic);
                    client.send(&envelope)?;
                },
                Step::SendAndAbort(envelope, reason) => {
                    client.send(&envelope)?;
                    bail!("{}", reason);
                },
                Step::Done => {
                    println!("✅ 插入完成");
                    return Ok(());
                },
                Step::Failed(reason) => bail!("Docking failed: {}", reason),
            }
        }
    }
}

/// `reset_plug_in` 信封
pub fn reset_envelope(target: Option<usize>) -> Envelope {
    let mut payload = Map::new();
    if let Some(target) = target {
        payload.insert(field::TARGET.into(), json!(target));
    }
    Envelope::command("reset_plug_in", payload)
}

/// 根据一条下行消息决定下一步
///
/// `vision` 只在服务端请求拍照时调用。
pub fn next_step<F>(outbound: &Outbound, vision: F) -> Result<Step, VisionError>
where
    F: FnOnce() -> Result<String, VisionError>,
{
    match (outbound.channel, &outbound.payload) {
        (Channel::VisionInput, Value::String(text))
            if text == notice::TAKE_IMAGE || text == notice::RETAKE_IMAGE =>
        {
            println!("📷 {}", text);
            let output = vision()?;
            let envelope = vision::normalize(&output)?;
            Ok(classify_detection(envelope))
        },
        (Channel::VisionInput, Value::String(text)) if text == notice::IN_POSITION => {
            println!("🎯 已到达插入位置");
            Ok(Step::Send(Envelope::command("start_plug_in", Map::new())))
        },
        (Channel::VisionInput, Value::String(text)) if text == notice::INSERTION_COMPLETE => {
            Ok(Step::Done)
        },
        (Channel::Broadcast, Value::String(text)) if text == notice::SAFETY_STOP => {
            Ok(Step::Failed("safety stop".to_string()))
        },
        (Channel::Broadcast, Value::Object(object)) => {
            if let Some(error) = object.get("error") {
                return Ok(Step::Failed(text_of(error)));
            }
            if let Some(reason) = object.get("reason") {
                return Ok(Step::Failed(text_of(reason)));
            }
            Ok(Step::Wait)
        },
        _ => Ok(Step::Wait),
    }
}

/// 只有成功检测会推进服务端流程，其余结果发送后终止
fn classify_detection(envelope: Envelope) -> Step {
    if envelope.kind == EnvelopeKind::Notification {
        let reason = format!("Vision unavailable ({})", envelope.topic);
        return Step::SendAndAbort(envelope, reason);
    }
    let success = envelope.payload.get(field::RESULT) == Some(&json!(1));
    if success {
        Step::Send(envelope)
    } else {
        warn!("No usable detection: {:?}", envelope.payload);
        Step::SendAndAbort(envelope, "No usable socket detection".to_string())
    }
}

fn text_of(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}
