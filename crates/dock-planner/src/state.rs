//! 机器人状态
//!
//! 启动时由配置构造一次，此后只由 [`crate::MotionPlanner`] 修改。

use dock_protocol::Pose;
use serde::{Deserialize, Serialize};

/// 插入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlugInMethod {
    /// 周期振荡插入
    #[default]
    Wiggle,
    /// 柔顺控制插入
    ForceControl,
}

/// 机器人状态
#[derive(Debug, Clone, PartialEq)]
pub struct RobotState {
    /// 最近一次遥测的位姿
    pub current_pose: Pose,
    /// home 位姿；首次标定回零后用遥测位姿替换
    pub home_pose: Pose,
    /// 各目标的前置插座位姿
    pub front_socket_poses: Vec<Pose>,
    /// 当前选中的目标索引
    pub selected_target: usize,
    /// 安全急停锁存
    pub safety_stop_active: bool,
    pub is_first_home_move: bool,
    /// 精定位是否信任视觉检测结果
    pub accurate_detection: bool,
    pub plug_in_method: PlugInMethod,
    /// 数据采集转发标志（一次性）
    pub collect_data: bool,
}

impl RobotState {
    /// 以配置的 home 位姿构造，`current_pose` 初始等于 `home_pose`
    pub fn new(home_pose: Pose) -> Self {
        Self {
            current_pose: home_pose,
            home_pose,
            front_socket_poses: Vec::new(),
            selected_target: 0,
            safety_stop_active: false,
            is_first_home_move: true,
            accurate_detection: true,
            plug_in_method: PlugInMethod::default(),
            collect_data: false,
        }
    }

    pub fn with_front_socket_poses(mut self, poses: Vec<Pose>) -> Self {
        self.front_socket_poses = poses;
        self
    }

    pub fn with_accurate_detection(mut self, enabled: bool) -> Self {
        self.accurate_detection = enabled;
        self
    }

    pub fn with_plug_in_method(mut self, method: PlugInMethod) -> Self {
        self.plug_in_method = method;
        self
    }

    /// 当前选中目标的前置插座位姿
    pub fn front_socket_pose(&self) -> Option<Pose> {
        self.front_socket_poses.get(self.selected_target).copied()
    }
}
