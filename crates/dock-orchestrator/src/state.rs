//! 状态机状态与状态快照

use arc_swap::ArcSwap;
use dock_planner::RobotState;
use dock_protocol::Pose;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// 对接状态机状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    #[default]
    Idle,
    /// 粗定位中，等待补拍结果
    Approaching,
    /// 精定位完成或已插入
    Docking,
    /// 安全急停锁存
    SafetyHalted,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::Approaching => "approaching",
            OrchestratorState::Docking => "docking",
            OrchestratorState::SafetyHalted => "safety_halted",
        };
        f.write_str(name)
    }
}

/// 状态快照（每处理完一个信封发布一次）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: OrchestratorState,
    pub safety_stop_active: bool,
    pub current_pose: Pose,
    pub home_pose: Pose,
    pub selected_target: usize,
    pub front_socket_pose: Option<Pose>,
    /// 已处理的信封数
    pub handled: u64,
}

impl StatusSnapshot {
    pub(crate) fn capture(state: OrchestratorState, robot: &RobotState, handled: u64) -> Self {
        Self {
            state,
            safety_stop_active: robot.safety_stop_active,
            current_pose: robot.current_pose,
            home_pose: robot.home_pose,
            selected_target: robot.selected_target,
            front_socket_pose: robot.front_socket_pose(),
            handled,
        }
    }
}

/// 状态快照的只读句柄
///
/// 可跨线程克隆；读取无锁（`ArcSwap::load`）。
#[derive(Debug, Clone)]
pub struct StatusHandle {
    inner: Arc<ArcSwap<StatusSnapshot>>,
}

impl StatusHandle {
    pub(crate) fn new(initial: StatusSnapshot) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    pub(crate) fn store(&self, snapshot: StatusSnapshot) {
        self.inner.store(Arc::new(snapshot));
    }

    /// 最新快照
    pub fn load(&self) -> Arc<StatusSnapshot> {
        self.inner.load_full()
    }
}
