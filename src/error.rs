use strum_macros::Display;
use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
    Limb,
    Pose,
    Animation,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum RangeField {
    #[strum(serialize = "channel")]
    Channel,
    #[strum(serialize = "angle")]
    Angle,
    #[strum(serialize = "pulse")]
    Pulse,
    #[strum(serialize = "speed")]
    Speed,
    #[strum(serialize = "action group")]
    ActionGroup,
}

/// Problems found while loading limb, pose and animation definitions.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ValidationError {
    #[error("motor pin {pin} on limb {limb} is not in range (0-15)")]
    PinOutOfRange { limb: String, pin: i32 },
    #[error("default speed {speed} on limb {limb} is not in range (1-255)")]
    SpeedOutOfRange { limb: String, speed: i32 },
    #[error("pose {pose} references unknown limb {limb}")]
    UnknownLimb { pose: String, limb: String },
    #[error("animation {animation} references unknown pose {pose}")]
    UnknownPose { animation: String, pose: String },
    #[error("duplicate {kind} name {name}")]
    Duplicate { kind: EntityKind, name: String },
}

#[derive(Debug, Error)]
pub enum RobotError {
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),
    #[error("{kind} {name} not found")]
    NotFound { kind: EntityKind, name: String },
    #[error("{field} {value} out of range ({min}-{max})")]
    OutOfRange {
        field: RangeField,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("read timed out")]
    Timeout,
    #[error("unexpected response: {bytes:02x?}")]
    Protocol { bytes: Vec<u8> },
    #[error("playback cancelled")]
    Cancelled,
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl RobotError {
    pub(crate) fn not_found(kind: EntityKind, name: &str) -> Self {
        RobotError::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    /// Checks `value` against an inclusive range without clamping it.
    pub(crate) fn check_range(field: RangeField, value: i32, min: i32, max: i32) -> Result<(), Self> {
        if (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(RobotError::OutOfRange {
                field,
                value: value.into(),
                min: min.into(),
                max: max.into(),
            })
        }
    }
}

pub type Result<T, E = RobotError> = std::result::Result<T, E>;
