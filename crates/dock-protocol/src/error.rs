//! 协议层错误类型定义

use thiserror::Error;

/// 协议层错误类型
///
/// 这些错误都不是致命的：编排器在边界处捕获后转换为广播通道上的
/// `{"error": ...}` 通知。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 信封缺少必需字段
    #[error("Message is missing key(s): {}", missing.join(", "))]
    MalformedEnvelope { missing: Vec<&'static str> },

    /// 信封不是 JSON 对象
    #[error("Envelope must be a JSON object, got: {0}")]
    NotAnObject(String),

    /// 未知的信封类型（既不是 cmd 也不是 msg）
    #[error("Unknown envelope kind: {0}")]
    UnknownEnvelopeKind(String),

    /// payload 缺少必需字段
    #[error("'{0}' not in data")]
    MissingField(&'static str),

    /// payload 字段类型或取值非法
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// 不支持的位姿单位
    #[error("Unsupported unit: {0}")]
    UnsupportedUnit(String),

    /// 位姿长度不是 6
    #[error("Invalid pose: expected 6 components, got {len}")]
    InvalidPose { len: usize },

    /// 结果码不在已知范围内
    #[error("Unknown result code {code} for '{field}'")]
    UnknownResultCode { field: &'static str, code: i64 },
}

#[cfg(test)]
mod tests {
    use super::ProtocolError;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::MalformedEnvelope {
            missing: vec!["content", "data"],
        };
        assert_eq!(err.to_string(), "Message is missing key(s): content, data");

        let err = ProtocolError::MissingField("unit");
        assert_eq!(err.to_string(), "'unit' not in data");

        let err = ProtocolError::UnsupportedUnit("cm/grad".to_string());
        assert!(err.to_string().contains("cm/grad"));

        let err = ProtocolError::InvalidPose { len: 3 };
        assert!(err.to_string().contains("got 3"));
    }
}
