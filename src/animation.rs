use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Span};

use crate::{
    error::{Result, RobotError},
    motion::MotionEngine,
    transport::Transport,
};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PlayerState {
    Idle,
    Playing { step: usize },
    /// The last playback failed at `step`; the robot holds the pose before it.
    Aborted { step: usize },
}

/// Shared flag asking the player to stop before its next step.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Re-arms the signal; a stop stays raised until this is called.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Plays named animations one step at a time.
pub struct AnimationPlayer<T: Transport> {
    engine: MotionEngine<T>,
    state: PlayerState,
    stop: StopSignal,
    span: Span,
}

impl<T: Transport> AnimationPlayer<T> {
    pub fn new(engine: MotionEngine<T>) -> Self {
        AnimationPlayer {
            engine,
            state: PlayerState::Idle,
            stop: StopSignal::default(),
            span: info_span!("animation_player"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn engine(&self) -> &MotionEngine<T> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut MotionEngine<T> {
        &mut self.engine
    }

    pub fn into_engine(self) -> MotionEngine<T> {
        self.engine
    }

    /// Runs every step of `name`, holding after each pose.
    ///
    /// A failing step aborts the playback and returns its error; poses already
    /// applied are not undone. The stop signal is checked before each step and
    /// is left raised, so a stop sent during the final hold cancels the next
    /// playback until the caller resets it.
    pub async fn play(&mut self, name: &str) -> Result<()> {
        self.state = PlayerState::Idle;
        let store = Arc::clone(self.engine.store());
        let animation = store.animation(name)?;

        info!(parent: &self.span, animation = name, steps = animation.steps.len(), "playing");
        for (step, entry) in animation.steps.iter().enumerate() {
            self.state = PlayerState::Playing { step };

            if self.stop.is_stopped() {
                return Err(self.abort(step, RobotError::Cancelled));
            }
            if let Err(e) = self.engine.apply_pose(&entry.pose).await {
                return Err(self.abort(step, e));
            }

            debug!(parent: &self.span, step, pose = %entry.pose, hold_ms = entry.hold.as_millis() as u64, "holding");
            tokio::time::sleep(entry.hold).await;
        }

        self.state = PlayerState::Idle;
        info!(parent: &self.span, animation = name, "finished");
        Ok(())
    }

    fn abort(&mut self, step: usize, error: RobotError) -> RobotError {
        warn!(parent: &self.span, step, "playback aborted: {}", error);
        self.state = PlayerState::Aborted { step };
        error
    }
}
