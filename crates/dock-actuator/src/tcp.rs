//! TCP 执行器连接
//!
//! 执行器侧是一个脚本解释器，监听 TCP 端口，一次接收一条脚本文本，
//! 执行完成后回复当前位姿。连接在启动时建立一次并持续复用。
//!
//! 一次请求若未收到完整回复（超时、IO 错误、回复超长），迟到的回复仍会
//! 留在连接上，之后的回复无法再与请求对应。此时连接被标记为失步，
//! 后续调用直接返回 `ActuatorError::Desynced`，不再写出任何原语。

use crate::telemetry::{Telemetry, frame_end};
use crate::{ActuatorError, ActuatorTransport, MotionPrimitive};
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace, warn};

const READ_CHUNK: usize = 1024;

/// 单条回复的最大字节数
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// TCP 执行器传输
pub struct TcpActuator {
    stream: TcpStream,
    peer: SocketAddr,
    idle_timeout: Duration,
    buf: Vec<u8>,
    desynced: bool,
}

impl TcpActuator {
    /// 连接执行器
    ///
    /// `idle_timeout` 同时用作连接超时和每条原语的读超时。
    pub fn connect(addr: impl ToSocketAddrs, idle_timeout: Duration) -> Result<Self, ActuatorError> {
        let addrs: Vec<SocketAddr> = addr.to_socket_addrs()?.collect();
        let mut last_err = None;

        for candidate in &addrs {
            match TcpStream::connect_timeout(candidate, idle_timeout) {
                Ok(stream) => return Self::from_stream(stream, idle_timeout),
                Err(e) => {
                    warn!("Actuator connect to {} failed: {}", candidate, e);
                    last_err = Some(e);
                },
            }
        }

        let addr = addrs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(ActuatorError::Connect {
            addr,
            source: last_err
                .unwrap_or_else(|| std::io::Error::new(ErrorKind::NotFound, "no address resolved")),
        })
    }

    /// 使用已建立的连接
    pub fn from_stream(stream: TcpStream, idle_timeout: Duration) -> Result<Self, ActuatorError> {
        stream.set_read_timeout(Some(idle_timeout))?;
        stream.set_write_timeout(Some(idle_timeout))?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        debug!("Actuator connected: {}", peer);
        Ok(Self {
            stream,
            peer,
            idle_timeout,
            buf: Vec::with_capacity(READ_CHUNK),
            desynced: false,
        })
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// 连接是否已失步
    pub fn is_desynced(&self) -> bool {
        self.desynced
    }

    /// 写出原语并读取一条完整回复帧
    fn exchange(&mut self, script: &str) -> Result<Vec<u8>, ActuatorError> {
        // 上一条原语的残留回复不属于本次调用
        self.buf.clear();

        self.stream.write_all(script.as_bytes()).map_err(|e| match e.kind() {
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => ActuatorError::ConnectionClosed,
            _ => e.into(),
        })?;
        self.stream.flush()?;

        self.read_frame()
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, ActuatorError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(end) = frame_end(&self.buf) {
                return Ok(self.buf.drain(..end).collect());
            }
            if self.buf.len() > MAX_FRAME_LEN {
                return Err(ActuatorError::InvalidTelemetry(format!(
                    "reply exceeds {} bytes without a complete frame",
                    MAX_FRAME_LEN
                )));
            }

            match self.stream.read(&mut chunk) {
                Ok(0) => return Err(ActuatorError::ConnectionClosed),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(ActuatorError::Timeout(self.idle_timeout));
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl ActuatorTransport for TcpActuator {
    fn send(&mut self, primitive: &MotionPrimitive) -> Result<Telemetry, ActuatorError> {
        if self.desynced {
            return Err(ActuatorError::Desynced);
        }

        let script = primitive.encode();
        debug!("Actuator <- {}", script);

        let frame = match self.exchange(&script) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Actuator {} desynchronized after {}: {}", self.peer, primitive.name(), e);
                self.desynced = true;
                return Err(e);
            },
        };

        // 完整帧已消费，解析失败不影响后续请求的对应关系
        let text = String::from_utf8_lossy(&frame);
        trace!("Actuator reply: {}", text);
        Telemetry::parse(&text)
    }

    fn peer(&self) -> String {
        self.peer.to_string()
    }
}
