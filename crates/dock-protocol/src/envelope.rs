//! 入站信封
//!
//! 每个信封恰好携带三个字段：类型（cmd / msg）、主题、payload。
//! 缺少任一字段即为 `MalformedEnvelope`。

use crate::error::ProtocolError;
use serde_json::{Map, Value, json};

/// 线上字段名：(主名称, 别名)
const FIELD_KIND: (&str, &str) = ("message_type", "kind");
const FIELD_TOPIC: (&str, &str) = ("content", "topic");
const FIELD_PAYLOAD: (&str, &str) = ("data", "payload");

/// 信封类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// 命令（`cmd`）
    Command,
    /// 通知（`msg`）
    Notification,
}

impl EnvelopeKind {
    /// 线上标签
    pub const fn as_str(self) -> &'static str {
        match self {
            EnvelopeKind::Command => "cmd",
            EnvelopeKind::Notification => "msg",
        }
    }

    fn parse(value: &Value) -> Result<Self, ProtocolError> {
        match value.as_str() {
            Some("cmd") | Some("command") => Ok(EnvelopeKind::Command),
            Some("msg") | Some("notification") => Ok(EnvelopeKind::Notification),
            Some(other) => Err(ProtocolError::UnknownEnvelopeKind(other.to_string())),
            None => Err(ProtocolError::UnknownEnvelopeKind(value.to_string())),
        }
    }
}

/// 入站信封
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub kind: EnvelopeKind,
    pub topic: String,
    pub payload: Map<String, Value>,
}

impl Envelope {
    /// 创建命令信封
    pub fn command(topic: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            kind: EnvelopeKind::Command,
            topic: topic.into(),
            payload,
        }
    }

    /// 创建通知信封
    pub fn notification(topic: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            kind: EnvelopeKind::Notification,
            topic: topic.into(),
            payload,
        }
    }

    /// 从 JSON 值解析并校验信封
    ///
    /// 先检查三个必需字段是否齐全（一次性报告全部缺失字段），
    /// 再解析类型。`data` 若是字符串，则按 JSON 对象解析；`null` 视为空对象。
    ///
    /// # Errors
    /// - `ProtocolError::NotAnObject`: 顶层不是对象
    /// - `ProtocolError::MalformedEnvelope`: 缺少字段
    /// - `ProtocolError::UnknownEnvelopeKind`: 类型不是 cmd / msg
    /// - `ProtocolError::InvalidField`: topic 或 payload 类型错误
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let object = value
            .as_object()
            .ok_or_else(|| ProtocolError::NotAnObject(value.to_string()))?;

        let kind = lookup(object, FIELD_KIND);
        let topic = lookup(object, FIELD_TOPIC);
        let payload = lookup(object, FIELD_PAYLOAD);

        let missing: Vec<&'static str> = [
            (kind.is_none(), FIELD_KIND.0),
            (topic.is_none(), FIELD_TOPIC.0),
            (payload.is_none(), FIELD_PAYLOAD.0),
        ]
        .into_iter()
        .filter_map(|(absent, name)| absent.then_some(name))
        .collect();

        let (Some(kind), Some(topic), Some(payload)) = (kind, topic, payload) else {
            return Err(ProtocolError::MalformedEnvelope { missing });
        };

        let kind = EnvelopeKind::parse(kind)?;
        let topic = match topic {
            Value::String(s) => s.clone(),
            other => {
                return Err(ProtocolError::InvalidField {
                    field: "content",
                    reason: format!("expected a string, got {other}"),
                });
            },
        };

        Ok(Self {
            kind,
            topic,
            payload: parse_payload(payload)?,
        })
    }

    /// 序列化为线上格式
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert(FIELD_KIND.0.to_string(), json!(self.kind.as_str()));
        object.insert(FIELD_TOPIC.0.to_string(), json!(self.topic));
        object.insert(
            FIELD_PAYLOAD.0.to_string(),
            Value::Object(self.payload.clone()),
        );
        Value::Object(object)
    }
}

fn lookup<'a>(object: &'a Map<String, Value>, (name, alias): (&str, &str)) -> Option<&'a Value> {
    object.get(name).or_else(|| object.get(alias))
}

fn parse_payload(value: &Value) -> Result<Map<String, Value>, ProtocolError> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ProtocolError::InvalidField {
                field: "data",
                reason: format!("expected an object, got {other}"),
            }),
            Err(e) => Err(ProtocolError::InvalidField {
                field: "data",
                reason: e.to_string(),
            }),
        },
        other => Err(ProtocolError::InvalidField {
            field: "data",
            reason: format!("expected an object, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_envelope() {
        let value = json!({
            "message_type": "cmd",
            "content": "socket_detection",
            "data": {"result": 1}
        });
        let envelope = Envelope::from_value(&value).unwrap();
        assert_eq!(envelope.kind, EnvelopeKind::Command);
        assert_eq!(envelope.topic, "socket_detection");
        assert_eq!(envelope.payload.get("result"), Some(&json!(1)));
    }

    #[test]
    fn test_parse_alias_fields() {
        let value = json!({"kind": "msg", "topic": "container_down", "payload": {}});
        let envelope = Envelope::from_value(&value).unwrap();
        assert_eq!(envelope.kind, EnvelopeKind::Notification);
        assert_eq!(envelope.topic, "container_down");
    }

    #[test]
    fn test_missing_fields_reported_together() {
        let value = json!({"message_type": "cmd"});
        let err = Envelope::from_value(&value).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MalformedEnvelope {
                missing: vec!["content", "data"]
            }
        );
    }

    #[test]
    fn test_unknown_kind() {
        let value = json!({"message_type": "rpc", "content": "x", "data": {}});
        assert_eq!(
            Envelope::from_value(&value).unwrap_err(),
            ProtocolError::UnknownEnvelopeKind("rpc".to_string())
        );
    }

    #[test]
    fn test_string_payload_is_parsed() {
        let value = json!({
            "message_type": "cmd",
            "content": "reset_plug_in",
            "data": "{\"target\": 1}"
        });
        let envelope = Envelope::from_value(&value).unwrap();
        assert_eq!(envelope.payload.get("target"), Some(&json!(1)));
    }

    #[test]
    fn test_null_payload_is_empty() {
        let value = json!({"message_type": "cmd", "content": "move_home", "data": null});
        let envelope = Envelope::from_value(&value).unwrap();
        assert!(envelope.payload.is_empty());
    }

    #[test]
    fn test_not_an_object() {
        let err = Envelope::from_value(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, ProtocolError::NotAnObject(_)));
    }

    #[test]
    fn test_to_value_uses_wire_names() {
        let envelope = Envelope::command("start_plug_in", Map::new());
        let value = envelope.to_value();
        assert_eq!(value["message_type"], "cmd");
        assert_eq!(value["content"], "start_plug_in");
        assert!(value["data"].is_object());
        assert_eq!(Envelope::from_value(&value).unwrap(), envelope);
    }
}
