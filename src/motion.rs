use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Span};

use crate::{
    codec::{self, Frame},
    config::{ConfigStore, LinkSettings},
    constants::{HEARTBEAT_ACK, NEUTRAL_POSE},
    error::Result,
    transport::Transport,
};

/// Turns limb and pose names into frames on an owned transport.
pub struct MotionEngine<T: Transport> {
    transport: T,
    store: Arc<ConfigStore>,
    heartbeat_timeout: Duration,
    span: Span,
}

impl<T: Transport> MotionEngine<T> {
    pub fn new(transport: T, store: impl Into<Arc<ConfigStore>>) -> Self {
        MotionEngine {
            transport,
            store: store.into(),
            heartbeat_timeout: LinkSettings::default().heartbeat_timeout(),
            span: info_span!("motion_engine"),
        }
    }

    /// Events from this engine are recorded under `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Replaces the reference data; the store was validated when it was built.
    pub fn reload(&mut self, store: impl Into<Arc<ConfigStore>>) {
        self.store = store.into();
        info!(parent: &self.span, "configuration reloaded");
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    async fn send(&mut self, frame: Frame) -> Result<()> {
        debug!(parent: &self.span, opcode = %frame.opcode(), bytes = ?frame.as_bytes(), "send");
        self.transport.write(&frame).await?;
        Ok(())
    }

    /// Re-asserts the limb's speed, then commands the target.
    pub async fn move_limb(&mut self, limb_name: &str, angle: i32) -> Result<()> {
        let limb = self.store.limb(limb_name)?;
        let speed = codec::encode_speed(limb.motor_pin, limb.default_speed)?;
        let position = codec::encode_target(self.store.units(), limb.motor_pin, angle)?;

        self.send(speed).await?;
        self.send(position).await
    }

    pub async fn apply_pose(&mut self, pose_name: &str) -> Result<()> {
        let store = Arc::clone(&self.store);
        let pose = store.pose(pose_name)?;
        debug!(parent: &self.span, pose = pose_name, "applying pose");

        for (limb, &angle) in &pose.targets {
            self.move_limb(limb, angle).await?;
        }
        Ok(())
    }

    /// Applies the configured `neutral` pose.
    pub async fn neutralize(&mut self) -> Result<()> {
        self.apply_pose(NEUTRAL_POSE).await
    }

    /// Sends a heartbeat and waits a bounded time for the acknowledgement.
    pub async fn heartbeat(&mut self) -> Result<()> {
        self.send(codec::encode_heartbeat()).await?;
        let response = self
            .transport
            .read(HEARTBEAT_ACK.len(), self.heartbeat_timeout)
            .await?;

        let result = codec::decode_heartbeat(&response);
        if let Err(e) = &result {
            warn!(parent: &self.span, "heartbeat failed: {}", e);
        }
        result
    }

    pub async fn emergency_stop(&mut self) -> Result<()> {
        warn!(parent: &self.span, "emergency stop");
        self.send(codec::encode_emergency_stop()).await
    }

    pub async fn emergency_recovery(&mut self) -> Result<()> {
        info!(parent: &self.span, "emergency recovery");
        self.send(codec::encode_emergency_recovery()).await
    }

    pub async fn execute_action_group(&mut self, group: i32) -> Result<()> {
        let frame = codec::encode_execute_action_group(group)?;
        self.send(frame).await
    }
}
