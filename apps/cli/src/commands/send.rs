//! 原始信封发送

use crate::client::DockClient;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use dock_protocol::Envelope;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Cmd,
    Msg,
}

/// 发送任意信封（调试用）
#[derive(Args, Debug)]
pub struct SendCommand {
    /// 信封类型
    #[arg(short, long, value_enum, default_value_t = KindArg::Cmd)]
    pub kind: KindArg,

    /// 主题，例如 `move_home`、`safety_detection`
    #[arg(short, long)]
    pub topic: String,

    /// payload（JSON 对象）
    #[arg(short, long, default_value = "{}")]
    pub data: String,
}

impl SendCommand {
    pub fn envelope(&self) -> Result<Envelope> {
        let payload: Map<String, Value> = serde_json::from_str(&self.data)
            .with_context(|| format!("--data must be a JSON object, got {}", self.data))?;
        Ok(match self.kind {
            KindArg::Cmd => Envelope::command(&self.topic, payload),
            KindArg::Msg => Envelope::notification(&self.topic, payload),
        })
    }

    pub fn execute(&self, client: &mut DockClient) -> Result<()> {
        let envelope = self.envelope()?;
        client.send(&envelope)?;
        println!("📤 {}", envelope.to_value());
        Ok(())
    }
}
