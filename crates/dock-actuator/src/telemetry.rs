//! 遥测解析
//!
//! 执行器在每条原语执行完毕后回复一行文本，形如：
//!
//! ```text
//! ([412.5, -3.0, 288.1, 0.0, 180.0, 0.0], 2)
//! ```
//!
//! 第一个 6 元素列表是工具位姿（mm/deg），其后可选第二个 6 元素列表为力/力矩。
//! 末尾的整数是执行器的解空间编号，这里不使用。

use crate::ActuatorError;
use dock_protocol::Pose;

/// 一条遥测
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    /// 工具位姿（mm/deg）
    pub pose: Pose,
    /// 力/力矩（N / N·m），执行器未上报时为 `None`
    pub wrench: Option<[f64; 6]>,
}

impl Telemetry {
    pub fn new(pose: Pose) -> Self {
        Self { pose, wrench: None }
    }

    /// 解析执行器回复文本
    pub fn parse(text: &str) -> Result<Self, ActuatorError> {
        let lists = innermost_lists(text);
        let mut iter = lists.into_iter();

        let pose = iter
            .next()
            .ok_or_else(|| ActuatorError::InvalidTelemetry(format!("no pose list in '{}'", text.trim())))
            .and_then(|list| parse_six(list, text))?;

        let wrench = match iter.next() {
            Some(list) => Some(parse_six(list, text)?),
            None => None,
        };

        Ok(Self {
            pose: Pose(pose),
            wrench,
        })
    }
}

/// 返回 `buf` 中第一个完整顶层分组的结束位置（不含）
///
/// 分组以 `(` 或 `[` 开始，括号配平即结束。用于在流上切分遥测帧。
pub fn frame_end(buf: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut opened = false;
    for (i, &b) in buf.iter().enumerate() {
        match b {
            b'(' | b'[' => {
                depth += 1;
                opened = true;
            },
            b')' | b']' if opened => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            },
            _ => {},
        }
    }
    None
}

/// 不包含嵌套 `[` 的方括号列表内容
fn innermost_lists(text: &str) -> Vec<&str> {
    let mut lists = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match c {
            '[' => start = Some(i + 1),
            ']' => {
                if let Some(s) = start.take() {
                    lists.push(&text[s..i]);
                }
            },
            _ => {},
        }
    }
    lists
}

fn parse_six(list: &str, text: &str) -> Result<[f64; 6], ActuatorError> {
    let mut values = [0.0; 6];
    let mut count = 0;
    for item in list.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if count == 6 {
            return Err(ActuatorError::InvalidTelemetry(format!(
                "expected 6 values in '{}'",
                text.trim()
            )));
        }
        values[count] = item.parse::<f64>().map_err(|_| {
            ActuatorError::InvalidTelemetry(format!("'{}' is not a number in '{}'", item, text.trim()))
        })?;
        count += 1;
    }
    if count != 6 {
        return Err(ActuatorError::InvalidTelemetry(format!(
            "expected 6 values, got {} in '{}'",
            count,
            text.trim()
        )));
    }
    Ok(values)
}
