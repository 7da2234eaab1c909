//! 对接状态机
//!
//! 状态：`Idle` → `Approaching` → `Docking` → `Idle`，任意状态下检测到异物
//! 进入 `SafetyHalted`，只能通过 `start_unplug` 或 `reset_plug_in` 恢复。

use crate::OrchestratorError;
use crate::state::{OrchestratorState, StatusHandle, StatusSnapshot};
use dock_actuator::ActuatorTransport;
use dock_planner::{ApproachOutcome, MotionPlanner};
use dock_protocol::{
    Channel, Command, CommandTopic, Detection, DetectionResult, Notification, NotificationTopic,
    Publisher, SafetyPhase, notice,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 急停期间拒绝命令时的广播原因
pub const REFUSED_DUE_TO_SAFETY_STOP: &str = "refused due to safety stop";

/// 对接状态机
pub struct Orchestrator<T: ActuatorTransport = Box<dyn ActuatorTransport>> {
    planner: MotionPlanner<T>,
    publisher: Arc<dyn Publisher>,
    state: OrchestratorState,
    handled: u64,
    status: StatusHandle,
}

impl<T: ActuatorTransport> Orchestrator<T> {
    pub fn new(planner: MotionPlanner<T>, publisher: Arc<dyn Publisher>) -> Self {
        let state = OrchestratorState::default();
        let status = StatusHandle::new(StatusSnapshot::capture(state, planner.state(), 0));
        Self {
            planner,
            publisher,
            state,
            handled: 0,
            status,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn planner(&self) -> &MotionPlanner<T> {
        &self.planner
    }

    /// 状态快照句柄（可交给其他线程）
    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    // ==================== 命令 ====================

    /// 处理一条命令
    ///
    /// 错误不会向上传播：记录日志并以 `{"error": ...}` 广播，状态不变。
    pub fn handle_command(&mut self, topic: &CommandTopic, payload: &Map<String, Value>) {
        debug!("Command '{}' in state {}", topic.as_str(), self.state);

        if !topic.bypasses_safety_stop() && self.planner.state().safety_stop_active {
            warn!("Command '{}' {}", topic.as_str(), REFUSED_DUE_TO_SAFETY_STOP);
            self.publisher.publish(
                Channel::Broadcast,
                json!({
                    "refused": topic.as_str(),
                    "reason": REFUSED_DUE_TO_SAFETY_STOP,
                }),
            );
        } else {
            let result = Command::decode(topic, payload)
                .map_err(OrchestratorError::from)
                .and_then(|command| self.execute(command));
            self.settle(result);
        }
        self.publish_status();
    }

    fn execute(&mut self, command: Command) -> Result<Option<OrchestratorState>, OrchestratorError> {
        let next = match command {
            Command::MoveHome => {
                let calibration = self.planner.state().is_first_home_move;
                self.planner.home(calibration)?;
                Some(OrchestratorState::Idle)
            },
            Command::SocketDetected(Detection::Located { unit, pose }) => {
                match self.planner.approach(&unit, pose)? {
                    ApproachOutcome::RetakeImage => Some(OrchestratorState::Approaching),
                    ApproachOutcome::InPosition => Some(OrchestratorState::Docking),
                    ApproachOutcome::Held => None,
                }
            },
            Command::SocketDetected(Detection::NotFound) => {
                self.planner.reposition(DetectionResult::Fail);
                None
            },
            Command::SocketDetected(Detection::Unreliable) => {
                self.planner.reposition(DetectionResult::Unreliable);
                None
            },
            Command::ResetApproach { target } => {
                // 先校验目标，越界时不产生任何运动
                if let Some(index) = target {
                    self.planner.select_target(index)?;
                }
                self.planner.home(false)?;
                self.publisher
                    .notify(Channel::Broadcast, notice::BEGIN_DETECTION);
                self.publisher.notify(Channel::VisionInput, notice::TAKE_IMAGE);
                Some(OrchestratorState::Approaching)
            },
            Command::PlugIn => {
                self.planner.insert()?;
                Some(OrchestratorState::Docking)
            },
            Command::PlugOut => {
                self.planner.extract()?;
                Some(OrchestratorState::Idle)
            },
            Command::CollectData => {
                let pose = self.planner.collect_data()?;
                info!("Data collection probe at {}", pose);
                None
            },
            Command::Unknown(topic) => {
                warn!("Unknown command topic: {}", topic);
                None
            },
        };
        Ok(next)
    }

    // ==================== 通知 ====================

    /// 处理一条通知
    pub fn handle_notification(&mut self, topic: &NotificationTopic, payload: &Map<String, Value>) {
        let result = Notification::decode(topic, payload)
            .map_err(OrchestratorError::from)
            .and_then(|notification| self.observe(notification));
        self.settle(result);
        self.publish_status();
    }

    fn observe(
        &mut self,
        notification: Notification,
    ) -> Result<Option<OrchestratorState>, OrchestratorError> {
        match notification {
            Notification::ContainerDown { message } => {
                warn!("Vision container down: {}", message);
                Ok(None)
            },
            Notification::Safety(event) => match event.phase {
                None => {
                    warn!("Safety event without result: {}", event.message);
                    Ok(None)
                },
                Some(SafetyPhase::Start) => {
                    info!("Safety monitoring started: {}", event.message);
                    self.publisher.notify(Channel::Safety, notice::SAFETY_ACK);
                    Ok(None)
                },
                Some(SafetyPhase::End) => {
                    info!("Safety monitoring ended: {}", event.message);
                    Ok(None)
                },
                Some(SafetyPhase::ForeignObjectDetected) => {
                    error!("Foreign object detected: {}", event.message);
                    self.planner.stop()?;
                    Ok(Some(OrchestratorState::SafetyHalted))
                },
            },
            Notification::Unknown(topic) => {
                warn!("Unknown notification topic: {}", topic);
                Ok(None)
            },
        }
    }

    // ==================== 内部 ====================

    /// 应用处理结果：成功时推进状态，失败时广播错误
    fn settle(&mut self, result: Result<Option<OrchestratorState>, OrchestratorError>) {
        match result {
            Ok(Some(next)) => {
                if next != self.state {
                    info!("State {} -> {}", self.state, next);
                }
                self.state = next;
            },
            Ok(None) => {},
            Err(e) => {
                error!("Handling failed in state {}: {}", self.state, e);
                self.report(&e);
            },
        }

        // 急停锁存优先于其他状态（即使急停原语本身下发失败）
        if self.planner.state().safety_stop_active && self.state != OrchestratorState::SafetyHalted {
            info!("State {} -> {}", self.state, OrchestratorState::SafetyHalted);
            self.state = OrchestratorState::SafetyHalted;
        }
    }

    /// 以 `{"error": ...}` 广播错误
    pub fn report(&self, err: &OrchestratorError) {
        self.publisher
            .publish(Channel::Broadcast, json!({ "error": err.to_string() }));
    }

    fn publish_status(&mut self) {
        self.handled += 1;
        self.status.store(StatusSnapshot::capture(
            self.state,
            self.planner.state(),
            self.handled,
        ));
    }
}
