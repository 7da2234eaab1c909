//! 客户端连接表
//!
//! `ChannelHub` 持有所有客户端的写端，实现 [`Publisher`]：每条出站消息
//! 序列化为一行 `{"channel": ..., "payload": ...}` 写给所有客户端。
//! 写失败的客户端会被移除。

use dock_protocol::{Channel, Outbound, Publisher};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 客户端 ID（从 1 开始，0 保留）
pub type ClientId = u32;

/// 单个客户端写超时，慢客户端不能拖住处理线程
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

struct ClientSink {
    addr: SocketAddr,
    stream: TcpStream,
}

/// 客户端连接表
pub struct ChannelHub {
    clients: Mutex<HashMap<ClientId, ClientSink>>,
    next_id: AtomicU32,
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelHub {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    /// 注册客户端写端
    pub fn register(&self, stream: TcpStream) -> std::io::Result<ClientId> {
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        let addr = stream.peer_addr()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clients.lock().insert(id, ClientSink { addr, stream });
        info!("Client {} connected from {}", id, addr);
        Ok(id)
    }

    pub fn unregister(&self, id: ClientId) {
        if let Some(sink) = self.clients.lock().remove(&id) {
            info!("Client {} ({}) disconnected", id, sink.addr);
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// 只回复给一个客户端
    pub fn send_to(&self, id: ClientId, value: &Value) {
        let line = encode_line(value);
        let mut clients = self.clients.lock();
        let failed = match clients.get_mut(&id) {
            Some(sink) => sink.stream.write_all(line.as_bytes()).is_err(),
            None => {
                debug!("Reply to unknown client {} dropped", id);
                false
            },
        };
        if failed {
            warn!("Client {} write failed, dropping", id);
            clients.remove(&id);
        }
    }

    fn broadcast_line(&self, line: &str) {
        let mut clients = self.clients.lock();
        clients.retain(|id, sink| match sink.stream.write_all(line.as_bytes()) {
            Ok(()) => true,
            Err(e) => {
                warn!("Client {} ({}) write failed: {}, dropping", id, sink.addr, e);
                false
            },
        });
    }
}

impl Publisher for ChannelHub {
    fn publish(&self, channel: Channel, payload: Value) {
        let outbound = Outbound { channel, payload };
        match serde_json::to_value(&outbound) {
            Ok(value) => {
                debug!("-> {}", value);
                self.broadcast_line(&encode_line(&value));
            },
            Err(e) => warn!("Failed to encode outbound message on {}: {}", channel, e),
        }
    }
}

fn encode_line(value: &Value) -> String {
    let mut line = value.to_string();
    line.push('\n');
    line
}
