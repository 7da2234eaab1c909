//! 信封路由
//!
//! 校验入站 JSON 的三个必需字段，把主题解码为枚举后转发给状态机。

use crate::OrchestratorError;
use crate::orchestrator::Orchestrator;
use dock_actuator::ActuatorTransport;
use dock_protocol::{CommandTopic, Envelope, EnvelopeKind, NotificationTopic, ProtocolError};
use serde_json::Value;
use tracing::{debug, warn};

/// 信封路由器
pub struct EnvelopeRouter<T: ActuatorTransport = Box<dyn ActuatorTransport>> {
    orchestrator: Orchestrator<T>,
}

impl<T: ActuatorTransport> EnvelopeRouter<T> {
    pub fn new(orchestrator: Orchestrator<T>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator<T> {
        &self.orchestrator
    }

    /// 路由一条入站信封
    ///
    /// 未知的信封类型只记录日志，返回 `Ok`。
    ///
    /// # Errors
    /// - `ProtocolError::MalformedEnvelope`: 缺少必需字段（由调用方广播）
    /// - `ProtocolError::NotAnObject`: 入站值不是 JSON 对象
    pub fn route(&mut self, value: &Value) -> Result<(), OrchestratorError> {
        let envelope = match Envelope::from_value(value) {
            Ok(envelope) => envelope,
            Err(ProtocolError::UnknownEnvelopeKind(kind)) => {
                warn!("Unknown envelope kind '{}', dropped", kind);
                return Ok(());
            },
            Err(e) => return Err(e.into()),
        };

        debug!("Routing {} '{}'", envelope.kind.as_str(), envelope.topic);
        match envelope.kind {
            EnvelopeKind::Command => {
                let topic = CommandTopic::parse(&envelope.topic);
                self.orchestrator.handle_command(&topic, &envelope.payload);
            },
            EnvelopeKind::Notification => {
                let topic = NotificationTopic::parse(&envelope.topic);
                self.orchestrator
                    .handle_notification(&topic, &envelope.payload);
            },
        }
        Ok(())
    }

    /// 路由一条入站信封，失败时广播错误
    pub fn route_and_report(&mut self, value: &Value) {
        if let Err(e) = self.route(value) {
            warn!("Rejected envelope: {}", e);
            self.orchestrator.report(&e);
        }
    }

    /// 解析并路由一行文本
    pub fn route_line(&mut self, line: &str) {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => self.route_and_report(&value),
            Err(e) => {
                let err = OrchestratorError::from(e);
                warn!("Rejected line: {}", err);
                self.orchestrator.report(&err);
            },
        }
    }
}
