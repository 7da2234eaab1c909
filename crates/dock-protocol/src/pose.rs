//! 六自由度位姿
//!
//! 位姿为有序六元组 `(x, y, z, rx, ry, rz)`。线上存在两种单位制：
//!
//! - `m/rad`：米 + 弧度（视觉子系统的输出）
//! - `mm/deg`：毫米 + 角度（执行器原生单位，内部计算统一使用）
//!
//! 全零位姿表示"未检测到"，由规划层拒绝。

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::ops::{Add, AddAssign, Index};

/// 六自由度位姿（内部统一为 mm/deg）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pose(pub [f64; 6]);

impl Pose {
    /// 全零位姿
    pub const ZERO: Self = Pose([0.0; 6]);

    /// 创建新的位姿
    pub const fn new(x: f64, y: f64, z: f64, rx: f64, ry: f64, rz: f64) -> Self {
        Pose([x, y, z, rx, ry, rz])
    }

    /// 仅平移分量的位姿（姿态为零）
    pub const fn translation(x: f64, y: f64, z: f64) -> Self {
        Pose([x, y, z, 0.0, 0.0, 0.0])
    }

    /// 是否为全零位姿（"未检测到"）
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }

    /// 获取原始数组
    #[inline]
    pub fn as_array(&self) -> &[f64; 6] {
        &self.0
    }

    /// 从 JSON 数组解析位姿
    ///
    /// 数组长度必须为 6，且每个元素都是数字。
    pub fn from_json(value: &Value) -> Result<Self, ProtocolError> {
        let items = value.as_array().ok_or_else(|| ProtocolError::InvalidField {
            field: "coords",
            reason: format!("expected an array of 6 numbers, got {value}"),
        })?;
        if items.len() != 6 {
            return Err(ProtocolError::InvalidPose { len: items.len() });
        }

        let mut pose = [0.0; 6];
        for (slot, item) in pose.iter_mut().zip(items) {
            *slot = item.as_f64().ok_or_else(|| ProtocolError::InvalidField {
                field: "coords",
                reason: format!("non-numeric component {item}"),
            })?;
        }
        Ok(Pose(pose))
    }
}

impl From<[f64; 6]> for Pose {
    fn from(values: [f64; 6]) -> Self {
        Pose(values)
    }
}

impl Index<usize> for Pose {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

// 分量相加（用于叠加相机/安全偏移）
impl Add for Pose {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let mut out = self.0;
        for (a, b) in out.iter_mut().zip(rhs.0) {
            *a += b;
        }
        Pose(out)
    }
}

impl AddAssign for Pose {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z, rx, ry, rz] = self.0;
        write!(
            f,
            "[{:.3}, {:.3}, {:.3}, {:.3}, {:.3}, {:.3}]",
            x, y, z, rx, ry, rz
        )
    }
}

/// 位姿单位制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoseUnit {
    /// 米 + 弧度
    #[serde(rename = "m/rad")]
    MeterRadian,
    /// 毫米 + 角度（原生）
    #[serde(rename = "mm/deg")]
    MillimeterDegree,
}

impl PoseUnit {
    /// 线上标签
    pub const fn as_str(self) -> &'static str {
        match self {
            PoseUnit::MeterRadian => "m/rad",
            PoseUnit::MillimeterDegree => "mm/deg",
        }
    }

    /// 解析线上标签
    ///
    /// # Errors
    /// - `ProtocolError::UnsupportedUnit`: 未知单位
    pub fn parse(tag: &str) -> Result<Self, ProtocolError> {
        match tag {
            "m/rad" => Ok(PoseUnit::MeterRadian),
            "mm/deg" => Ok(PoseUnit::MillimeterDegree),
            other => Err(ProtocolError::UnsupportedUnit(other.to_string())),
        }
    }
}

impl fmt::Display for PoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
