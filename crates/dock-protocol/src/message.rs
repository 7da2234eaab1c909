//! 命令与通知
//!
//! 主题在路由边界处一次性解码为封闭枚举（带 `Unknown` 分支），
//! payload 由编排器在受保护的处理流程中按主题解码，
//! 这样 payload 错误会被转换为广播错误通知而不是中断路由。

use crate::error::ProtocolError;
use crate::pose::Pose;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde_json::{Map, Value};

/// payload 字段名
pub mod field {
    pub const RESULT: &str = "result";
    pub const UNIT: &str = "unit";
    pub const COORDS: &str = "coords";
    pub const TARGET: &str = "target";
    pub const MESSAGE: &str = "message";
}

// ==================== 主题 ====================

/// 命令主题
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandTopic {
    MoveHome,
    SocketDetection,
    PlugIn,
    PlugOut,
    ResetApproach,
    CollectData,
    /// 未知主题（记录警告，不报错）
    Unknown(String),
}

impl CommandTopic {
    /// 解析线上主题
    pub fn parse(topic: &str) -> Self {
        match topic {
            "move_home" => CommandTopic::MoveHome,
            "socket_detection" => CommandTopic::SocketDetection,
            "start_plug_in" => CommandTopic::PlugIn,
            "start_unplug" => CommandTopic::PlugOut,
            "reset_plug_in" => CommandTopic::ResetApproach,
            "collect_data" => CommandTopic::CollectData,
            other => CommandTopic::Unknown(other.to_string()),
        }
    }

    /// 线上主题
    pub fn as_str(&self) -> &str {
        match self {
            CommandTopic::MoveHome => "move_home",
            CommandTopic::SocketDetection => "socket_detection",
            CommandTopic::PlugIn => "start_plug_in",
            CommandTopic::PlugOut => "start_unplug",
            CommandTopic::ResetApproach => "reset_plug_in",
            CommandTopic::CollectData => "collect_data",
            CommandTopic::Unknown(topic) => topic,
        }
    }

    /// 是否在安全急停期间仍允许执行
    ///
    /// 只有复位接近和拔出两个恢复命令可以绕过急停锁存。
    pub fn bypasses_safety_stop(&self) -> bool {
        matches!(self, CommandTopic::ResetApproach | CommandTopic::PlugOut)
    }
}

/// 通知主题
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTopic {
    ContainerDown,
    SafetyDetection,
    Unknown(String),
}

impl NotificationTopic {
    /// 解析线上主题
    pub fn parse(topic: &str) -> Self {
        match topic {
            "container_down" => NotificationTopic::ContainerDown,
            "safety_detection" => NotificationTopic::SafetyDetection,
            other => NotificationTopic::Unknown(other.to_string()),
        }
    }

    /// 线上主题
    pub fn as_str(&self) -> &str {
        match self {
            NotificationTopic::ContainerDown => "container_down",
            NotificationTopic::SafetyDetection => "safety_detection",
            NotificationTopic::Unknown(topic) => topic,
        }
    }
}

// ==================== 结果码 ====================

/// 视觉检测结果码
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum DetectionResult {
    Fail = 0,
    Success = 1,
    Unreliable = 2,
}

/// 安全事件阶段码
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SafetyPhase {
    /// 检测到异物（触发急停）
    ForeignObjectDetected = 0,
    /// 安全监测开始
    Start = 1,
    /// 安全监测结束
    End = 2,
}

// ==================== 命令 ====================

/// 插座检测结果
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// 检测成功，携带单位标签与位姿
    ///
    /// 单位保留为原始字符串，由规划层的单位转换负责拒绝未知单位。
    Located { unit: String, pose: Pose },
    /// 未检测到插座
    NotFound,
    /// 检测结果不可靠
    Unreliable,
}

/// 已解码的命令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    MoveHome,
    SocketDetected(Detection),
    PlugIn,
    PlugOut,
    ResetApproach { target: Option<usize> },
    CollectData,
    Unknown(String),
}

impl Command {
    /// 按主题解码 payload
    ///
    /// # Errors
    /// - `ProtocolError::MissingField`: 成功检测缺少 `unit` / `coords`，或缺少 `result`
    /// - `ProtocolError::UnknownResultCode`: 结果码越界
    /// - `ProtocolError::InvalidPose` / `InvalidField`: 字段格式错误
    pub fn decode(topic: &CommandTopic, payload: &Map<String, Value>) -> Result<Self, ProtocolError> {
        let command = match topic {
            CommandTopic::MoveHome => Command::MoveHome,
            CommandTopic::SocketDetection => Command::SocketDetected(decode_detection(payload)?),
            CommandTopic::PlugIn => Command::PlugIn,
            CommandTopic::PlugOut => Command::PlugOut,
            CommandTopic::ResetApproach => Command::ResetApproach {
                target: decode_target(payload)?,
            },
            CommandTopic::CollectData => Command::CollectData,
            CommandTopic::Unknown(topic) => Command::Unknown(topic.clone()),
        };
        Ok(command)
    }
}

fn decode_detection(payload: &Map<String, Value>) -> Result<Detection, ProtocolError> {
    let code = integer(payload, field::RESULT)?.ok_or(ProtocolError::MissingField(field::RESULT))?;
    let result = result_code::<DetectionResult>(field::RESULT, code)?;

    match result {
        DetectionResult::Success => {
            let unit = payload
                .get(field::UNIT)
                .ok_or(ProtocolError::MissingField(field::UNIT))?;
            let unit = unit.as_str().ok_or_else(|| ProtocolError::InvalidField {
                field: field::UNIT,
                reason: format!("expected a string, got {unit}"),
            })?;
            let coords = payload
                .get(field::COORDS)
                .ok_or(ProtocolError::MissingField(field::COORDS))?;
            Ok(Detection::Located {
                unit: unit.to_string(),
                pose: Pose::from_json(coords)?,
            })
        },
        DetectionResult::Fail => Ok(Detection::NotFound),
        DetectionResult::Unreliable => Ok(Detection::Unreliable),
    }
}

fn decode_target(payload: &Map<String, Value>) -> Result<Option<usize>, ProtocolError> {
    match payload.get(field::TARGET) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| ProtocolError::InvalidField {
                field: field::TARGET,
                reason: format!("expected a non-negative integer, got {value}"),
            }),
    }
}

// ==================== 通知 ====================

/// 安全事件
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyEvent {
    /// 事件阶段；payload 缺少 `result` 时为 `None`
    pub phase: Option<SafetyPhase>,
    pub message: String,
}

/// 已解码的通知
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    ContainerDown { message: String },
    Safety(SafetyEvent),
    Unknown(String),
}

impl Notification {
    /// 按主题解码 payload
    ///
    /// # Errors
    /// - `ProtocolError::UnknownResultCode`: 安全阶段码越界
    pub fn decode(
        topic: &NotificationTopic,
        payload: &Map<String, Value>,
    ) -> Result<Self, ProtocolError> {
        let notification = match topic {
            NotificationTopic::ContainerDown => Notification::ContainerDown {
                message: message_text(payload),
            },
            NotificationTopic::SafetyDetection => {
                let phase = match integer(payload, field::RESULT)? {
                    Some(code) => Some(result_code::<SafetyPhase>(field::RESULT, code)?),
                    None => None,
                };
                Notification::Safety(SafetyEvent {
                    phase,
                    message: message_text(payload),
                })
            },
            NotificationTopic::Unknown(topic) => Notification::Unknown(topic.clone()),
        };
        Ok(notification)
    }
}

// ==================== 工具函数 ====================

fn integer(payload: &Map<String, Value>, name: &'static str) -> Result<Option<i64>, ProtocolError> {
    match payload.get(name) {
        None => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| ProtocolError::InvalidField {
            field: name,
            reason: format!("expected an integer, got {value}"),
        }),
    }
}

fn result_code<T>(name: &'static str, code: i64) -> Result<T, ProtocolError>
where
    T: TryFromPrimitive<Primitive = u8>,
{
    u8::try_from(code)
        .ok()
        .and_then(|raw| T::try_from_primitive(raw).ok())
        .ok_or(ProtocolError::UnknownResultCode { field: name, code })
}

fn message_text(payload: &Map<String, Value>) -> String {
    match payload.get(field::MESSAGE) {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => Value::Object(payload.clone()).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_command_topic_roundtrip() {
        for topic in [
            "move_home",
            "socket_detection",
            "start_plug_in",
            "start_unplug",
            "reset_plug_in",
            "collect_data",
        ] {
            assert_eq!(CommandTopic::parse(topic).as_str(), topic);
        }
        assert_eq!(
            CommandTopic::parse("dance"),
            CommandTopic::Unknown("dance".to_string())
        );
    }

    #[test]
    fn test_safety_bypass() {
        assert!(CommandTopic::ResetApproach.bypasses_safety_stop());
        assert!(CommandTopic::PlugOut.bypasses_safety_stop());
        assert!(!CommandTopic::PlugIn.bypasses_safety_stop());
        assert!(!CommandTopic::MoveHome.bypasses_safety_stop());
    }

    #[test]
    fn test_decode_successful_detection() {
        let data = payload(json!({"result": 1, "unit": "m/rad", "coords": [0.1, 0, 0, 0, 0, 0]}));
        let command = Command::decode(&CommandTopic::SocketDetection, &data).unwrap();
        assert_eq!(
            command,
            Command::SocketDetected(Detection::Located {
                unit: "m/rad".to_string(),
                pose: Pose::translation(0.1, 0.0, 0.0),
            })
        );
    }

    #[test]
    fn test_decode_detection_missing_fields() {
        let data = payload(json!({"result": 1, "coords": [1, 0, 0, 0, 0, 0]}));
        assert_eq!(
            Command::decode(&CommandTopic::SocketDetection, &data).unwrap_err(),
            ProtocolError::MissingField("unit")
        );

        let data = payload(json!({"result": 1, "unit": "mm/deg"}));
        assert_eq!(
            Command::decode(&CommandTopic::SocketDetection, &data).unwrap_err(),
            ProtocolError::MissingField("coords")
        );

        let data = payload(json!({}));
        assert_eq!(
            Command::decode(&CommandTopic::SocketDetection, &data).unwrap_err(),
            ProtocolError::MissingField("result")
        );
    }

    #[test]
    fn test_decode_failed_detection_needs_no_pose() {
        let data = payload(json!({"result": 0}));
        assert_eq!(
            Command::decode(&CommandTopic::SocketDetection, &data).unwrap(),
            Command::SocketDetected(Detection::NotFound)
        );
        let data = payload(json!({"result": 2}));
        assert_eq!(
            Command::decode(&CommandTopic::SocketDetection, &data).unwrap(),
            Command::SocketDetected(Detection::Unreliable)
        );
    }

    #[test]
    fn test_decode_unknown_result_code() {
        let data = payload(json!({"result": 7}));
        assert_eq!(
            Command::decode(&CommandTopic::SocketDetection, &data).unwrap_err(),
            ProtocolError::UnknownResultCode {
                field: "result",
                code: 7
            }
        );
    }

    #[test]
    fn test_decode_reset_target() {
        let data = payload(json!({"target": 1}));
        assert_eq!(
            Command::decode(&CommandTopic::ResetApproach, &data).unwrap(),
            Command::ResetApproach { target: Some(1) }
        );
        assert_eq!(
            Command::decode(&CommandTopic::ResetApproach, &Map::new()).unwrap(),
            Command::ResetApproach { target: None }
        );
        let data = payload(json!({"target": -1}));
        assert!(Command::decode(&CommandTopic::ResetApproach, &data).is_err());
    }

    #[test]
    fn test_decode_safety_notification() {
        let data = payload(json!({"result": 0, "message": "person"}));
        let notification = Notification::decode(&NotificationTopic::SafetyDetection, &data).unwrap();
        assert_eq!(
            notification,
            Notification::Safety(SafetyEvent {
                phase: Some(SafetyPhase::ForeignObjectDetected),
                message: "person".to_string(),
            })
        );

        let data = payload(json!({"message": "no result"}));
        let notification = Notification::decode(&NotificationTopic::SafetyDetection, &data).unwrap();
        assert!(matches!(
            notification,
            Notification::Safety(SafetyEvent { phase: None, .. })
        ));
    }

    #[test]
    fn test_decode_container_down() {
        let data = payload(json!({"message": "vision container not running"}));
        assert_eq!(
            Notification::decode(&NotificationTopic::ContainerDown, &data).unwrap(),
            Notification::ContainerDown {
                message: "vision container not running".to_string()
            }
        );
    }

    #[test]
    fn test_result_code_primitives() {
        assert_eq!(u8::from(DetectionResult::Unreliable), 2);
        assert_eq!(SafetyPhase::try_from(1u8).unwrap(), SafetyPhase::Start);
        assert!(SafetyPhase::try_from(9u8).is_err());
    }
}
