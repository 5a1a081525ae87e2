#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use robot_controller::{
    Animation, ConfigStore, DeviceDescriptor, Limb, Pose, Transport, TransportError,
};
use tokio::time::Instant;

/// In-memory board that records every frame written to it.
#[derive(Default)]
pub struct RecordingTransport {
    pub open: bool,
    pub writes: Vec<(Instant, Vec<u8>)>,
    pub responses: VecDeque<Vec<u8>>,
    pub fail_after: Option<usize>,
}

impl RecordingTransport {
    pub fn with_responses<I: IntoIterator<Item = Vec<u8>>>(responses: I) -> Self {
        RecordingTransport {
            responses: responses.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Accepts `writes` frames, then fails every write after that.
    pub fn failing_after(writes: usize) -> Self {
        RecordingTransport {
            fail_after: Some(writes),
            ..Default::default()
        }
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.writes.iter().map(|(_, bytes)| bytes.clone()).collect()
    }
}

impl Transport for RecordingTransport {
    async fn open(&mut self) -> Result<(), TransportError> {
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) {
        self.open = false;
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.fail_after.is_some_and(|limit| self.writes.len() >= limit) {
            return Err(TransportError::DeviceError("link dropped".into()));
        }
        self.writes.push((Instant::now(), bytes.to_vec()));
        Ok(())
    }

    async fn read(&mut self, max_bytes: usize, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let mut response = self.responses.pop_front().unwrap_or_default();
        response.truncate(max_bytes);
        Ok(response)
    }

    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, TransportError> {
        Ok(vec![])
    }
}

/// Two legs on different channels and speeds with stand/sit/neutral poses.
pub fn biped() -> ConfigStore {
    let limbs = vec![Limb::new("leg1", 3, 100), Limb::new("leg2", 4, 20)];
    let poses = vec![
        Pose::new("stand", [("leg1", 90)]),
        Pose::new("sit", [("leg1", 45), ("leg2", 135)]),
        Pose::new("neutral", [("leg1", 90), ("leg2", 90)]),
        Pose::new("overreach", [("leg2", 200)]),
    ];
    let animations = vec![
        Animation::new("squat", [("stand", 100), ("sit", 200)]),
        Animation::new("stumble", [("stand", 50), ("overreach", 50), ("sit", 50)]),
        Animation::new("still", Vec::<(String, u64)>::new()),
    ];
    ConfigStore::load(limbs, poses, animations).unwrap()
}
