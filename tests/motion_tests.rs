mod common;

use std::time::Duration;

use common::{biped, RecordingTransport};
use robot_controller::{
    ConfigStore, EntityKind, Limb, LinkSettings, MotionEngine, Pose, RangeField, RobotError, TransportError, Units,
};

#[tokio::test]
async fn apply_pose_sends_speed_then_position() {
    let limbs = vec![Limb::new("leg1", 3, 100)];
    let poses = vec![Pose::new("stand", [("leg1", 90)])];
    let store = ConfigStore::load(limbs, poses, vec![]).unwrap();
    let mut engine = MotionEngine::new(RecordingTransport::default(), store);

    engine.apply_pose("stand").await.unwrap();

    assert_eq!(
        engine.transport().frames(),
        vec![vec![0xff, 0x01, 0x03, 0x64, 0x00], vec![0xff, 0x02, 0x03, 0xdc, 0x05]]
    );
}

#[tokio::test]
async fn speed_is_reasserted_for_every_limb() {
    let mut engine = MotionEngine::new(RecordingTransport::default(), biped());

    engine.apply_pose("sit").await.unwrap();

    let frames = engine.transport().frames();
    assert_eq!(frames.len(), 4);
    let mut pairs: Vec<_> = frames.chunks(2).map(|pair| pair.to_vec()).collect();
    pairs.sort();
    assert_eq!(
        pairs,
        vec![
            vec![vec![0xff, 0x01, 0x03, 0x64, 0x00], vec![0xff, 0x02, 0x03, 0xe8, 0x03]],
            vec![vec![0xff, 0x01, 0x04, 0x14, 0x00], vec![0xff, 0x02, 0x04, 0xd0, 0x07]],
        ]
    );
}

#[tokio::test]
async fn unknown_names_are_not_found() {
    let mut engine = MotionEngine::new(RecordingTransport::default(), biped());

    let err = engine.move_limb("tail", 90).await.unwrap_err();
    assert!(matches!(err, RobotError::NotFound { kind: EntityKind::Limb, .. }));

    let err = engine.apply_pose("jump").await.unwrap_err();
    assert!(matches!(err, RobotError::NotFound { kind: EntityKind::Pose, ref name } if name == "jump"));

    assert!(engine.transport().writes.is_empty());
}

#[tokio::test]
async fn out_of_range_angle_sends_nothing_for_that_limb() {
    let mut engine = MotionEngine::new(RecordingTransport::default(), biped());

    let err = engine.move_limb("leg1", 181).await.unwrap_err();
    assert!(matches!(err, RobotError::OutOfRange { field: RangeField::Angle, value: 181, .. }));
    assert!(engine.transport().writes.is_empty());
}

#[tokio::test]
async fn neutralize_applies_configured_pose() {
    let mut engine = MotionEngine::new(RecordingTransport::default(), biped());
    engine.neutralize().await.unwrap();
    assert_eq!(engine.transport().frames().len(), 4);

    let store = ConfigStore::load(vec![Limb::new("leg1", 3, 100)], vec![], vec![]).unwrap();
    let mut bare = MotionEngine::new(RecordingTransport::default(), store);
    let err = bare.neutralize().await.unwrap_err();
    assert!(matches!(err, RobotError::NotFound { kind: EntityKind::Pose, ref name } if name == "neutral"));
}

#[tokio::test]
async fn pulse_units_pass_targets_through() {
    let limbs = vec![Limb::new("jaw", 0, 255)];
    let poses = vec![Pose::new("open", [("jaw", 1000)])];
    let store = ConfigStore::load_with_units(Units::Pulse, limbs, poses, vec![]).unwrap();
    let mut engine = MotionEngine::new(RecordingTransport::default(), store);

    engine.apply_pose("open").await.unwrap();

    assert_eq!(
        engine.transport().frames(),
        vec![vec![0xff, 0x01, 0x00, 0xff, 0x00], vec![0xff, 0x02, 0x00, 0xe8, 0x03]]
    );
    let err = engine.move_limb("jaw", 90).await.unwrap_err();
    assert!(matches!(err, RobotError::OutOfRange { field: RangeField::Pulse, .. }));
}

#[tokio::test]
async fn heartbeat_outcomes() {
    let transport = RecordingTransport::with_responses([
        vec![0xff, 0xf0, 0x12, 0x00, 0x00],
        vec![0xff, 0xf0, 0x12, 0x00, 0x01],
        vec![],
    ]);
    let mut engine = MotionEngine::new(transport, biped());

    engine.heartbeat().await.unwrap();
    assert!(matches!(engine.heartbeat().await, Err(RobotError::Protocol { .. })));
    assert!(matches!(engine.heartbeat().await, Err(RobotError::Timeout)));

    let frames = engine.transport().frames();
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f == &[0xff, 0x00, 0x12, 0x00, 0x00]));
}

#[test]
fn heartbeat_timeout_follows_link_settings() {
    let engine = MotionEngine::new(RecordingTransport::default(), biped());
    assert_eq!(engine.heartbeat_timeout(), LinkSettings::default().heartbeat_timeout());

    let engine = engine.with_heartbeat_timeout(Duration::from_millis(250));
    assert_eq!(engine.heartbeat_timeout(), Duration::from_millis(250));
}

#[tokio::test]
async fn board_level_commands() {
    let mut engine = MotionEngine::new(RecordingTransport::default(), biped());

    engine.emergency_stop().await.unwrap();
    engine.emergency_recovery().await.unwrap();
    engine.execute_action_group(3).await.unwrap();
    let err = engine.execute_action_group(17).await.unwrap_err();
    assert!(matches!(err, RobotError::OutOfRange { field: RangeField::ActionGroup, .. }));

    let frames = engine.transport().frames();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].len(), 61);
    assert_eq!(frames[0][3], 0x01);
    assert_eq!(frames[1][3], 0x00);
    assert_eq!(frames[2], vec![0xff, 0x09, 0x00, 0x03, 0x00]);
}

#[tokio::test]
async fn transport_failures_propagate() {
    let mut engine = MotionEngine::new(RecordingTransport::failing_after(1), biped());

    let err = engine.apply_pose("stand").await.unwrap_err();
    assert!(matches!(err, RobotError::Transport(TransportError::DeviceError(_))));
    assert_eq!(engine.transport().frames().len(), 1);
}

#[tokio::test]
async fn reload_swaps_reference_data() {
    let mut engine = MotionEngine::new(RecordingTransport::default(), biped());
    assert!(engine.apply_pose("wave").await.is_err());

    let limbs = vec![Limb::new("arm", 9, 50)];
    let poses = vec![Pose::new("wave", [("arm", 30)])];
    engine.reload(ConfigStore::load(limbs, poses, vec![]).unwrap());

    engine.apply_pose("wave").await.unwrap();
    assert!(engine.apply_pose("stand").await.is_err());
    assert_eq!(engine.transport().frames()[0], vec![0xff, 0x01, 0x09, 0x32, 0x00]);
}
