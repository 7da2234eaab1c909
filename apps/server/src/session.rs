//! 客户端会话
//!
//! 每个连接一个读线程：逐行解析 JSON，转发到唯一的处理线程。

use crate::hub::{ChannelHub, ClientId};
use crossbeam_channel::Sender;
use serde_json::Value;
use std::io::{BufRead, BufReader, Read};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// 单行入站消息的最大字节数（不含换行）
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// 处理线程的入站事件
#[derive(Debug)]
pub enum Inbound {
    /// 一条信封（尚未校验）
    Envelope(Value),
    /// 客户端请求状态快照
    Status(ClientId),
    /// 无法解析为 JSON 的行
    Invalid(serde_json::Error),
    /// 客户端断开
    Disconnected(ClientId),
    /// 进程退出
    Shutdown,
}

impl Inbound {
    /// 解析一行入站文本
    pub fn parse(client: ClientId, line: &str) -> Self {
        match serde_json::from_str::<Value>(line) {
            Ok(value) if is_status_request(&value) => Inbound::Status(client),
            Ok(value) => Inbound::Envelope(value),
            Err(e) => Inbound::Invalid(e),
        }
    }
}

fn is_status_request(value: &Value) -> bool {
    value.get("request").and_then(Value::as_str) == Some("status")
}

/// 注册连接并启动读线程
pub fn spawn_session(
    stream: TcpStream,
    hub: Arc<ChannelHub>,
    inbox: Sender<Inbound>,
) -> std::io::Result<ClientId> {
    let reader = stream.try_clone()?;
    let id = hub.register(stream)?;

    thread::Builder::new()
        .name(format!("client_{}", id))
        .spawn(move || read_loop(id, reader, inbox))?;
    Ok(id)
}

fn read_loop(id: ClientId, stream: TcpStream, inbox: Sender<Inbound>) {
    let mut reader = BufReader::new(stream);
    let mut buf = String::new();
    loop {
        buf.clear();
        // 多读一个字节用于识别超长行
        let limit = MAX_LINE_LEN as u64 + 1;
        match (&mut reader).take(limit).read_line(&mut buf) {
            Ok(0) => break,
            Ok(_) if buf.len() > MAX_LINE_LEN && !buf.ends_with('\n') => {
                warn!("Client {} sent a line over {} bytes, disconnecting", id, MAX_LINE_LEN);
                break;
            },
            Ok(_) => {},
            Err(e) => {
                warn!("Client {} read error: {}", id, e);
                break;
            },
        }
        let line = buf.trim();
        if line.is_empty() {
            continue;
        }
        debug!("Client {} <- {}", id, line);
        if inbox.send(Inbound::parse(id, line)).is_err() {
            // 处理线程已退出
            return;
        }
    }
    let _ = inbox.send(Inbound::Disconnected(id));
}
