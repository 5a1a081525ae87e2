mod common;

use std::time::Duration;

use common::{biped, RecordingTransport};
use robot_controller::{AnimationPlayer, EntityKind, MotionEngine, PlayerState, RangeField, RobotError};
use tokio::time::Instant;

fn player(transport: RecordingTransport) -> AnimationPlayer<RecordingTransport> {
    AnimationPlayer::new(MotionEngine::new(transport, biped()))
}

#[tokio::test(start_paused = true)]
async fn play_holds_each_pose_in_order() {
    let mut player = player(RecordingTransport::default());
    let started = Instant::now();

    player.play("squat").await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(player.state(), PlayerState::Idle);

    let writes = &player.engine().transport().writes;
    // stand: 2 frames, sit: 4 frames
    assert_eq!(writes.len(), 6);
    assert_eq!(writes[1].1, vec![0xff, 0x02, 0x03, 0xdc, 0x05]);
    let hold = writes[2].0 - writes[1].0;
    assert!(hold >= Duration::from_millis(100), "held stand for {hold:?}");
}

#[tokio::test(start_paused = true)]
async fn unknown_animation_stays_idle() {
    let mut player = player(RecordingTransport::default());

    let err = player.play("moonwalk").await.unwrap_err();

    assert!(matches!(err, RobotError::NotFound { kind: EntityKind::Animation, .. }));
    assert_eq!(player.state(), PlayerState::Idle);
    assert!(player.engine().transport().writes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn failing_step_aborts_without_rollback() {
    let mut player = player(RecordingTransport::default());

    let err = player.play("stumble").await.unwrap_err();

    assert!(matches!(err, RobotError::OutOfRange { field: RangeField::Angle, value: 200, .. }));
    assert_eq!(player.state(), PlayerState::Aborted { step: 1 });
    // only "stand" reached the board; "sit" was never sent
    assert_eq!(player.engine().transport().frames().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn transport_error_mid_sequence_aborts() {
    let mut player = player(RecordingTransport::failing_after(3));

    let err = player.play("squat").await.unwrap_err();

    assert!(matches!(err, RobotError::Transport(_)));
    assert_eq!(player.state(), PlayerState::Aborted { step: 1 });
}

#[tokio::test(start_paused = true)]
async fn stop_signal_cancels_before_next_step() {
    let mut player = player(RecordingTransport::default());
    let stop = player.stop_signal();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.stop();
    });

    let err = player.play("squat").await.unwrap_err();

    assert!(matches!(err, RobotError::Cancelled));
    assert_eq!(player.state(), PlayerState::Aborted { step: 1 });
    assert_eq!(player.engine().transport().frames().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_during_final_hold_cancels_the_next_playback() {
    let mut player = player(RecordingTransport::default());
    let stop = player.stop_signal();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        stop.stop();
    });

    // the stop lands during the "sit" hold, after the last step began
    player.play("squat").await.unwrap();
    assert_eq!(player.engine().transport().frames().len(), 6);
    assert!(player.stop_signal().is_stopped());

    let err = player.play("squat").await.unwrap_err();
    assert!(matches!(err, RobotError::Cancelled));
    assert_eq!(player.state(), PlayerState::Aborted { step: 0 });
    assert_eq!(player.engine().transport().frames().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn reset_re_arms_a_stopped_player() {
    let mut player = player(RecordingTransport::default());
    let stop = player.stop_signal();
    stop.stop();

    assert!(matches!(player.play("squat").await, Err(RobotError::Cancelled)));
    assert!(player.engine().transport().writes.is_empty());

    stop.reset();
    player.play("squat").await.unwrap();
    assert_eq!(player.state(), PlayerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn new_playback_clears_aborted_state() {
    let mut player = player(RecordingTransport::default());
    assert!(player.play("stumble").await.is_err());
    assert_eq!(player.state(), PlayerState::Aborted { step: 1 });

    let err = player.play("moonwalk").await.unwrap_err();

    assert!(matches!(err, RobotError::NotFound { kind: EntityKind::Animation, .. }));
    assert_eq!(player.state(), PlayerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn empty_animation_completes_immediately() {
    let mut player = player(RecordingTransport::default());
    let started = Instant::now();

    player.play("still").await.unwrap();

    assert_eq!(started.elapsed(), Duration::ZERO);
    assert!(player.engine().transport().writes.is_empty());
}
