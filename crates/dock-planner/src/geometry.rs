//! 位姿几何工具
//!
//! 单位换算与"接近 home"判定。内部计算统一使用 mm/deg。

use dock_protocol::{Pose, PoseUnit, ProtocolError};

/// 默认 home 容差（相对误差）
pub const DEFAULT_HOME_TOLERANCE: f64 = 0.005;

/// 把带单位标签的位姿换算为 mm/deg
///
/// - `m/rad`: 前三轴 ×1000，后三轴弧度转角度
/// - `mm/deg`: 原样返回
///
/// # Errors
/// - `ProtocolError::UnsupportedUnit`: 未知单位标签
pub fn convert_unit(unit: &str, pose: Pose) -> Result<Pose, ProtocolError> {
    match PoseUnit::parse(unit)? {
        PoseUnit::MillimeterDegree => Ok(pose),
        PoseUnit::MeterRadian => {
            let [x, y, z, rx, ry, rz] = pose.0;
            Ok(Pose([
                x * 1000.0,
                y * 1000.0,
                z * 1000.0,
                rx.to_degrees(),
                ry.to_degrees(),
                rz.to_degrees(),
            ]))
        },
    }
}

/// 逐轴判断 `current` 是否落在 `reference` 的相对容差带内
///
/// 每个轴要求 `|c| ≤ (1+ε)·|h|` 且 `|c| ≥ max(0, 1−ε)·|h|`。
/// 下界截断到 0，使 `within(a, a, ε)` 对任意 `ε ≥ 0` 成立。
pub fn within(current: &Pose, reference: &Pose, tolerance: f64) -> bool {
    let upper = 1.0 + tolerance;
    let lower = (1.0 - tolerance).max(0.0);
    current
        .as_array()
        .iter()
        .zip(reference.as_array())
        .all(|(c, h)| {
            let (c, h) = (c.abs(), h.abs());
            c <= upper * h && c >= lower * h
        })
}
