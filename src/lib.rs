mod constants;
mod types;

pub mod animation;
pub mod bluetooth;
pub mod codec;
pub mod config;
pub mod error;
pub mod motion;
pub mod serial;
pub mod transport;

pub use animation::{AnimationPlayer, PlayerState, StopSignal};
pub use bluetooth::BluetoothTransport;
pub use codec::{Frame, Opcode};
pub use config::{BluetoothSettings, ConfigFile, ConfigStore, LinkSettings};
pub use error::{EntityKind, RangeField, Result, RobotError, ValidationError};
pub use motion::MotionEngine;
pub use serial::SerialTransport;
pub use transport::{DeviceDescriptor, DeviceKind, Transport, TransportError};
pub use types::{Animation, AnimationStep, Limb, Pose, Units};

// Re-export commonly used items
pub use constants::{
    NEUTRAL_POSE, PRODUCT_ID, UART_RX_CHAR_UUID, UART_SERVICE_UUID, UART_TX_CHAR_UUID, VENDOR_ID,
};
