//! 视觉桥接
//!
//! 运行视觉检测命令，把它的文本输出归一化为一条信封：
//!
//! | 输出包含 | 信封 |
//! |---|---|
//! | `success` | `cmd socket_detection {result: 1, unit: "m/rad", coords}` |
//! | `No socket detected` | `cmd socket_detection {result: 0}` |
//! | `unreliable` | `cmd socket_detection {result: 2}` |
//! | `not running` | `msg container_down {message}` |
//! | 其他 | `msg unknown_response {message}` |
//!
//! 按表中顺序匹配，先命中者生效。

use dock_protocol::message::field;
use dock_protocol::{DetectionResult, Envelope, PoseUnit};
use serde_json::{Map, Value, json};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// 默认视觉检测命令
pub const DEFAULT_VISION_CMD: &str =
    "docker exec vision-vision-1 bash -c 'rocsys-vision-client DETECT_SOCKET_FAST'";

const POSE_MARKER: &str = "Pose: ";

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Failed to run vision command `{cmd}`: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Vision reported success without a pose line")]
    MissingPose,

    #[error("Invalid pose from vision: {0}")]
    InvalidPose(String),
}

/// 运行视觉命令，返回合并后的 stdout + stderr
///
/// 非零退出码不是错误：视觉客户端失败时的输出同样需要归一化。
pub fn capture(cmd: &str) -> Result<String, VisionError> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .output()
        .map_err(|source| VisionError::Spawn {
            cmd: cmd.to_string(),
            source,
        })?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    debug!("Vision exited with {}: {}", output.status, text.trim());
    Ok(text.trim().to_string())
}

/// 把视觉输出归一化为信封
pub fn normalize(output: &str) -> Result<Envelope, VisionError> {
    if output.contains("success") {
        let coords = extract_coords(output)?;
        let mut payload = Map::new();
        payload.insert(field::RESULT.into(), json!(u8::from(DetectionResult::Success)));
        payload.insert(field::UNIT.into(), json!(PoseUnit::MeterRadian.as_str()));
        payload.insert(field::COORDS.into(), json!(coords));
        return Ok(Envelope::command("socket_detection", payload));
    }

    if output.contains("No socket detected") || output.contains("unreliable") {
        let result = if output.contains("No socket detected") {
            DetectionResult::Fail
        } else {
            DetectionResult::Unreliable
        };
        let mut payload = Map::new();
        payload.insert(field::RESULT.into(), json!(u8::from(result)));
        return Ok(Envelope::command("socket_detection", payload));
    }

    let topic = if output.contains("not running") {
        "container_down"
    } else {
        "unknown_response"
    };
    let mut payload = Map::new();
    payload.insert(field::MESSAGE.into(), Value::String(output.to_string()));
    Ok(Envelope::notification(topic, payload))
}

/// 解析 `Pose: [x, y, z, rx, ry, rz]` 行（也接受圆括号）
fn extract_coords(output: &str) -> Result<[f64; 6], VisionError> {
    let (_, rest) = output.split_once(POSE_MARKER).ok_or(VisionError::MissingPose)?;
    let line = rest.lines().next().unwrap_or_default().trim();
    let normalized = line.replace('(', "[").replace(')', "]");

    let values: Vec<f64> = serde_json::from_str(&normalized)
        .map_err(|e| VisionError::InvalidPose(format!("{line}: {e}")))?;
    <[f64; 6]>::try_from(values.as_slice())
        .map_err(|_| VisionError::InvalidPose(format!("expected 6 values, got {}", values.len())))
}
