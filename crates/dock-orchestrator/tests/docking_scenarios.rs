//! 端到端对接场景
//!
//! 从入站 JSON 到执行器原语，使用 MockActuator 与 RecordingPublisher。

use dock_actuator::MockActuator;
use dock_orchestrator::{EnvelopeRouter, Orchestrator, OrchestratorState, StatusHandle};
use dock_planner::{MotionConfig, MotionPlanner, RobotState};
use dock_protocol::mock::RecordingPublisher;
use dock_protocol::{Channel, Pose, notice};
use serde_json::json;
use std::sync::Arc;

const HOME: Pose = Pose::new(400.0, 0.0, 300.0, 0.0, 180.0, 0.0);

struct Harness {
    router: EnvelopeRouter<MockActuator>,
    actuator: MockActuator,
    publisher: Arc<RecordingPublisher>,
    status: StatusHandle,
}

fn harness(motion: MotionConfig) -> Harness {
    let actuator = MockActuator::new(HOME);
    let publisher = Arc::new(RecordingPublisher::new());
    let planner = MotionPlanner::new(
        actuator.clone(),
        publisher.clone(),
        RobotState::new(HOME),
        motion,
    );
    let orchestrator = Orchestrator::new(planner, publisher.clone());
    let status = orchestrator.status_handle();
    Harness {
        router: EnvelopeRouter::new(orchestrator),
        actuator,
        publisher,
        status,
    }
}

fn zero_camera_offset() -> MotionConfig {
    MotionConfig {
        camera_offset: Pose::ZERO,
        ..MotionConfig::default()
    }
}

#[test]
fn coarse_approach_from_home_retakes_image() {
    let mut h = harness(zero_camera_offset());

    h.router
        .route(&json!({
            "message_type": "cmd",
            "content": "socket_detection",
            "data": {"result": 1, "unit": "m/rad", "coords": [0.1, 0, 0, 0, 0, 0]}
        }))
        .unwrap();

    let sent = h.actuator.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].is_relative());
    let linear = sent[0].linear().unwrap();
    assert!((linear.target[0] - (100.0 - 250.0)).abs() < 1e-9);

    assert!(h.publisher.contains_text(Channel::VisionInput, notice::RETAKE_IMAGE));
    assert_eq!(h.status.load().state, OrchestratorState::Approaching);
}

#[test]
fn foreign_object_halts_and_blocks_plug_in() {
    let mut h = harness(MotionConfig::default());

    h.router
        .route(&json!({
            "message_type": "msg",
            "content": "safety_detection",
            "data": {"result": 0, "message": "person"}
        }))
        .unwrap();

    assert_eq!(h.actuator.scripts(), vec!["stop(DR_SSTOP)".to_string()]);
    let status = h.status.load();
    assert!(status.safety_stop_active);
    assert_eq!(status.state, OrchestratorState::SafetyHalted);
    assert!(h.publisher.contains_text(Channel::Broadcast, notice::SAFETY_STOP));

    h.router
        .route(&json!({"message_type": "cmd", "content": "start_plug_in", "data": {}}))
        .unwrap();
    assert_eq!(h.actuator.sent().len(), 1);
    assert!(
        h.publisher
            .on(Channel::Broadcast)
            .iter()
            .any(|p| p["refused"] == "start_plug_in")
    );

    // reset_plug_in 越过急停并清除锁存
    h.router
        .route(&json!({"message_type": "cmd", "content": "reset_plug_in", "data": {}}))
        .unwrap();
    let status = h.status.load();
    assert!(!status.safety_stop_active);
    assert_eq!(status.state, OrchestratorState::Approaching);
}

#[test]
fn full_docking_cycle() {
    let mut h = harness(MotionConfig::default());

    let steps = [
        json!({"message_type": "cmd", "content": "move_home", "data": {}}),
        json!({"message_type": "cmd", "content": "reset_plug_in", "data": {}}),
        json!({"message_type": "cmd", "content": "socket_detection",
               "data": {"result": 1, "unit": "m/rad", "coords": [0.35, 0.01, 0.02, 0, 0, 0]}}),
        json!({"message_type": "cmd", "content": "socket_detection",
               "data": {"result": 1, "unit": "m/rad", "coords": [0.2, 0.0, -0.01, 0, 0, 0]}}),
        json!({"message_type": "cmd", "content": "start_plug_in", "data": {}}),
    ];
    for step in &steps {
        h.router.route(step).unwrap();
    }

    assert_eq!(h.status.load().state, OrchestratorState::Docking);
    let vision: Vec<_> = h
        .publisher
        .on(Channel::VisionInput)
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    assert_eq!(
        vision,
        vec![
            notice::TAKE_IMAGE,
            notice::RETAKE_IMAGE,
            notice::IN_POSITION,
            notice::INSERTION_COMPLETE,
        ]
    );

    h.router
        .route(&json!({"message_type": "cmd", "content": "start_unplug", "data": {}}))
        .unwrap();
    let status = h.status.load();
    assert_eq!(status.state, OrchestratorState::Idle);
    assert_eq!(status.current_pose, HOME);
    assert!(h.publisher.contains_text(Channel::VisionInput, notice::EXTRACTION_COMPLETE));
}

#[test]
fn empty_detection_is_reported_without_motion() {
    let mut h = harness(MotionConfig::default());

    h.router
        .route(&json!({
            "kind": "cmd",
            "topic": "socket_detection",
            "payload": {"result": 1, "unit": "mm/deg", "coords": [0, 0, 0, 0, 0, 0]}
        }))
        .unwrap();

    assert!(h.actuator.sent().is_empty());
    let errors = h.publisher.on(Channel::Broadcast);
    assert_eq!(errors.len(), 1);
    assert!(errors[0]["error"].as_str().unwrap().contains("empty"));
    assert_eq!(h.status.load().state, OrchestratorState::Idle);
}
