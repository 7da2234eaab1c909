//! 服务端连接
//!
//! 与 `dock-server` 之间的 JSON 行协议：
//! - 上行：信封，或 `{"request": "status"}`
//! - 下行：`{"channel": ..., "payload": ...}` 广播，或状态快照回复

use dock_protocol::{Envelope, Outbound};
use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server closed the connection")]
    Closed,

    #[error("Invalid JSON from server: {0}")]
    Json(#[from] serde_json::Error),
}

/// 服务端下行消息
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// 通道广播
    Outbound(Outbound),
    /// 只发给本客户端的回复（状态快照）
    Reply(Value),
}

impl ServerEvent {
    fn parse(line: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(line)?;
        if value.get("channel").is_some() {
            Ok(ServerEvent::Outbound(serde_json::from_value(value)?))
        } else {
            Ok(ServerEvent::Reply(value))
        }
    }
}

pub struct DockClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    line: String,
}

impl DockClient {
    /// 连接服务端
    ///
    /// `read_timeout` 为等待下一条下行消息的上限，`None` 表示无限等待。
    pub fn connect(addr: &str, read_timeout: Option<Duration>) -> Result<Self, ClientError> {
        let writer = TcpStream::connect(addr).map_err(|source| ClientError::Connect {
            addr: addr.to_string(),
            source,
        })?;
        writer.set_read_timeout(read_timeout)?;
        let reader = BufReader::new(writer.try_clone()?);
        debug!("Connected to {}", addr);
        Ok(Self {
            reader,
            writer,
            line: String::new(),
        })
    }

    pub fn send(&mut self, envelope: &Envelope) -> Result<(), ClientError> {
        self.send_value(&envelope.to_value())
    }

    fn send_value(&mut self, value: &Value) -> Result<(), ClientError> {
        let mut line = value.to_string();
        debug!("-> {}", line);
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        Ok(())
    }

    /// 阻塞读取下一条下行消息（跳过空行）
    pub fn next_event(&mut self) -> Result<ServerEvent, ClientError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Err(ClientError::Closed);
            }
            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            trace!("<- {}", line);
            return Ok(ServerEvent::parse(line)?);
        }
    }

    /// 请求状态快照；期间收到的广播被丢弃
    pub fn status(&mut self) -> Result<Value, ClientError> {
        self.send_value(&json!({ "request": "status" }))?;
        loop {
            if let ServerEvent::Reply(value) = self.next_event()? {
                return Ok(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dock_protocol::{Channel, notice};
    use serde_json::Map;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_parse_server_event() {
        let event = ServerEvent::parse(r#"{"channel": "take_image", "payload": "take image"}"#)
            .unwrap();
        assert_eq!(
            event,
            ServerEvent::Outbound(Outbound {
                channel: Channel::VisionInput,
                payload: json!(notice::TAKE_IMAGE),
            })
        );

        let reply = ServerEvent::parse(r#"{"state": "idle"}"#).unwrap();
        assert!(matches!(reply, ServerEvent::Reply(_)));

        assert!(ServerEvent::parse(r#"{"channel": "nowhere", "payload": 1}"#).is_err());
    }

    #[test]
    fn test_status_skips_broadcasts() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;

            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let envelope: Value = serde_json::from_str(&line).unwrap();
            assert_eq!(envelope["content"], "move_home");

            line.clear();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line.trim(), r#"{"request":"status"}"#);
            writer
                .write_all(b"{\"channel\":\"message_all\",\"payload\":\"begin detection\"}\n")
                .unwrap();
            writer.write_all(b"{\"state\":\"idle\",\"handled\":1}\n").unwrap();
        });

        let mut client = DockClient::connect(&addr, Some(Duration::from_secs(5))).unwrap();
        client.send(&Envelope::command("move_home", Map::new())).unwrap();
        let status = client.status().unwrap();
        assert_eq!(status["state"], "idle");
        server.join().unwrap();

        assert!(matches!(client.next_event(), Err(ClientError::Closed)));
    }
}
