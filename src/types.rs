use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// How pose targets and limb angles are expressed.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Hash, EnumIter, EnumString, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Units {
    /// 0 to 180 degrees, mapped linearly onto the 500..2500 pulse range.
    #[default]
    Degrees,
    /// Raw pulse width, 500 to 2500.
    Pulse,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Limb {
    pub name: String,
    pub motor_pin: i32,
    pub default_speed: i32,
}

impl Limb {
    pub fn new(name: impl Into<String>, motor_pin: i32, default_speed: i32) -> Self {
        Limb {
            name: name.into(),
            motor_pin,
            default_speed,
        }
    }
}

/// Named snapshot of targets for a subset of limbs.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Pose {
    pub name: String,
    pub targets: BTreeMap<String, i32>,
}

impl Pose {
    pub fn new<I, S>(name: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        Pose {
            name: name.into(),
            targets: targets.into_iter().map(|(limb, value)| (limb.into(), value)).collect(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AnimationStep {
    pub pose: String,
    pub hold: Duration,
}

impl AnimationStep {
    pub fn new(pose: impl Into<String>, hold_ms: u64) -> Self {
        AnimationStep {
            pose: pose.into(),
            hold: Duration::from_millis(hold_ms),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Animation {
    pub name: String,
    pub steps: Vec<AnimationStep>,
}

impl Animation {
    pub fn new<I, S>(name: impl Into<String>, steps: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        Animation {
            name: name.into(),
            steps: steps
                .into_iter()
                .map(|(pose, hold_ms)| AnimationStep::new(pose, hold_ms))
                .collect(),
        }
    }

    /// Sum of all holds, the minimum wall time a full playback takes.
    pub fn total_hold(&self) -> Duration {
        self.steps.iter().map(|step| step.hold).sum()
    }
}
