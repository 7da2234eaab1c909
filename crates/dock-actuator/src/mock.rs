//! Mock 执行器
//!
//! 不连接硬件，按原语更新一个模拟位姿并记录所有已发送原语。
//! `MockActuator` 可克隆，克隆体共享同一份状态，测试可以在把一份交给
//! 规划器后继续用另一份断言。

use crate::{ActuatorError, ActuatorTransport, MotionPrimitive, Telemetry};
use dock_protocol::Pose;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// 注入的故障
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Timeout,
    ConnectionClosed,
    InvalidTelemetry,
}

impl MockFailure {
    fn into_error(self) -> ActuatorError {
        match self {
            MockFailure::Timeout => ActuatorError::Timeout(crate::DEFAULT_IDLE_TIMEOUT),
            MockFailure::ConnectionClosed => ActuatorError::ConnectionClosed,
            MockFailure::InvalidTelemetry => ActuatorError::InvalidTelemetry("mock".to_string()),
        }
    }
}

#[derive(Debug)]
struct MockState {
    sent: Vec<MotionPrimitive>,
    pose: Pose,
    learned_home: Pose,
    wrench: Option<[f64; 6]>,
    failures: VecDeque<MockFailure>,
}

/// Mock 执行器
#[derive(Debug, Clone)]
pub struct MockActuator {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockActuator {
    fn default() -> Self {
        Self::new(Pose::ZERO)
    }
}

impl MockActuator {
    /// `learned_home` 是执行器示教的 home 位姿，同时作为初始位姿
    pub fn new(learned_home: Pose) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                sent: Vec::new(),
                pose: learned_home,
                learned_home,
                wrench: None,
                failures: VecDeque::new(),
            })),
        }
    }

    /// 让接下来的一次 `send` 失败
    pub fn fail_next(&self, failure: MockFailure) {
        self.state.lock().failures.push_back(failure);
    }

    /// 之后的遥测都带上力/力矩
    pub fn set_wrench(&self, wrench: [f64; 6]) {
        self.state.lock().wrench = Some(wrench);
    }

    /// 已发送的原语
    pub fn sent(&self) -> Vec<MotionPrimitive> {
        self.state.lock().sent.clone()
    }

    /// 已发送原语的线上文本
    pub fn scripts(&self) -> Vec<String> {
        self.state.lock().sent.iter().map(MotionPrimitive::encode).collect()
    }

    /// 当前模拟位姿
    pub fn pose(&self) -> Pose {
        self.state.lock().pose
    }

    pub fn clear(&self) {
        self.state.lock().sent.clear();
    }
}

impl ActuatorTransport for MockActuator {
    fn send(&mut self, primitive: &MotionPrimitive) -> Result<Telemetry, ActuatorError> {
        let mut state = self.state.lock();
        state.sent.push(primitive.clone());

        if let Some(failure) = state.failures.pop_front() {
            return Err(failure.into_error());
        }

        match primitive {
            MotionPrimitive::MoveAbsolute(m) => state.pose = m.target,
            // 相对运动按基座坐标系近似叠加
            MotionPrimitive::MoveRelative(m) => state.pose += m.target,
            MotionPrimitive::HomeLearned => state.pose = state.learned_home,
            _ => {},
        }

        Ok(Telemetry {
            pose: state.pose,
            wrench: state.wrench,
        })
    }

    fn peer(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinearMove;

    #[test]
    fn test_mock_tracks_pose() {
        let home = Pose::new(400.0, 0.0, 300.0, 0.0, 180.0, 0.0);
        let mut mock = MockActuator::new(home);
        let observer = mock.clone();

        let t = mock
            .send(&MotionPrimitive::MoveRelative(LinearMove::new(
                Pose::translation(10.0, 0.0, -5.0),
                100.0,
                100.0,
            )))
            .unwrap();
        assert_eq!(t.pose, Pose::new(410.0, 0.0, 295.0, 0.0, 180.0, 0.0));

        let t = mock.send(&MotionPrimitive::HomeLearned).unwrap();
        assert_eq!(t.pose, home);

        assert_eq!(observer.sent().len(), 2);
        assert_eq!(observer.scripts()[1], "move_home(DR_HOME_TARGET_USER)");
    }

    #[test]
    fn test_mock_injected_failure_is_recorded_once() {
        let mut mock = MockActuator::default();
        mock.fail_next(MockFailure::Timeout);

        assert!(mock.send(&MotionPrimitive::HardStop).unwrap_err().is_timeout());
        assert!(mock.send(&MotionPrimitive::HardStop).is_ok());
        assert_eq!(mock.sent().len(), 2);
    }
}
