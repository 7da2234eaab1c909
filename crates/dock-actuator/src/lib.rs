//! # Dock Actuator Transport
//!
//! 执行器传输层：与机械臂脚本解释器之间的同步 请求/遥测 通道。
//!
//! - 每次调用发送一条运动原语，阻塞直到收到一条遥测或空闲超时
//! - 同一连接在进程生命周期内复用，不自动重连
//! - 运动原语是封闭的类型集合，线上脚本文本只在本 crate 内生成

use std::time::Duration;
use thiserror::Error;

pub mod primitive;
pub mod tcp;
pub mod telemetry;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use primitive::{LinearMove, MotionPrimitive, Reference};
pub use tcp::TcpActuator;
pub use telemetry::Telemetry;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockActuator, MockFailure};

/// 默认空闲超时（与执行器端的监听超时一致）
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// 执行器传输层错误类型
///
/// 所有变体对当前命令都是致命的；调用方不会自动重试。
#[derive(Error, Debug)]
pub enum ActuatorError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 建立连接失败
    #[error("Failed to connect to actuator at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// 空闲超时内未收到遥测
    #[error("Actuator timeout after {0:?}")]
    Timeout(Duration),

    /// 执行器关闭了连接
    #[error("Actuator closed the connection")]
    ConnectionClosed,

    /// 遥测无法解析
    #[error("Invalid telemetry: {0}")]
    InvalidTelemetry(String),

    /// 之前的请求未正常结束，连接上的回复顺序已不可信
    #[error("Actuator connection desynchronized by an earlier failure, reconnect required")]
    Desynced,
}

impl ActuatorError {
    /// 是否为超时
    pub fn is_timeout(&self) -> bool {
        matches!(self, ActuatorError::Timeout(_))
    }
}

/// 执行器传输接口
///
/// 实现必须串行化：一次只允许一条原语在途。
pub trait ActuatorTransport: Send {
    /// 发送一条运动原语并等待遥测
    fn send(&mut self, primitive: &MotionPrimitive) -> Result<Telemetry, ActuatorError>;

    /// 对端描述（用于日志）
    fn peer(&self) -> String {
        "actuator".to_string()
    }
}

impl<T: ActuatorTransport + ?Sized> ActuatorTransport for Box<T> {
    fn send(&mut self, primitive: &MotionPrimitive) -> Result<Telemetry, ActuatorError> {
        (**self).send(primitive)
    }

    fn peer(&self) -> String {
        (**self).peer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actuator_error_display() {
        let err = ActuatorError::Timeout(Duration::from_secs(60));
        assert!(err.to_string().contains("timeout"));
        assert!(err.is_timeout());

        let err = ActuatorError::ConnectionClosed;
        assert_eq!(err.to_string(), "Actuator closed the connection");
        assert!(!err.is_timeout());

        let err = ActuatorError::Connect {
            addr: "10.0.0.5:7005".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(err.to_string().contains("10.0.0.5:7005"));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: ActuatorError = io.into();
        assert!(matches!(err, ActuatorError::Io(_)));
    }
}
