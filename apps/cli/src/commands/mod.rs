//! 命令定义和实现

pub mod plug_in;
pub mod send;

pub use plug_in::PlugInCommand;
pub use send::SendCommand;

use crate::client::{DockClient, ServerEvent};
use anyhow::{Result, bail};
use dock_protocol::{Channel, Outbound, notice};
use serde_json::Value;

/// 等待第一条满足条件的广播；期间的急停或错误广播视为失败
pub fn await_outbound<F>(client: &mut DockClient, mut accept: F) -> Result<Outbound>
where
    F: FnMut(&Outbound) -> bool,
{
    loop {
        let ServerEvent::Outbound(outbound) = client.next_event()? else {
            continue;
        };
        if accept(&outbound) {
            return Ok(outbound);
        }
        match (outbound.channel, &outbound.payload) {
            (Channel::Broadcast, Value::String(text)) if text == notice::SAFETY_STOP => {
                bail!("Safety stop")
            },
            (Channel::Broadcast, Value::Object(object)) if object.contains_key("error") => {
                bail!("Server error: {}", object["error"])
            },
            _ => {},
        }
    }
}

/// 等待指定的文本通知
pub fn await_notice(client: &mut DockClient, expected: &str) -> Result<()> {
    await_outbound(client, |outbound| outbound.payload.as_str() == Some(expected))?;
    Ok(())
}

/// 等待视觉通道上转发的遥测位姿
pub fn await_pose(client: &mut DockClient) -> Result<Value> {
    let outbound = await_outbound(client, |outbound| {
        outbound.channel == Channel::VisionInput && outbound.payload.is_array()
    })?;
    Ok(outbound.payload)
}
