use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("No device found")]
    NoDeviceFound,
    #[error("Transport is not open")]
    NotOpen,
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),
    #[error("Device error: {0}")]
    DeviceError(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DeviceKind {
    Usb {
        vendor_id: u16,
        product_id: u16,
        serial_number: Option<String>,
    },
    Bluetooth {
        local_name: Option<String>,
    },
}

/// A board found during discovery; `id` is what the transport opens.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceDescriptor {
    pub id: String,
    pub kind: DeviceKind,
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DeviceKind::Usb {
                vendor_id,
                product_id,
                serial_number,
            } => {
                write!(f, "{} (usb {:04x}:{:04x}", self.id, vendor_id, product_id)?;
                if let Some(serial) = serial_number {
                    write!(f, ", serial {}", serial)?;
                }
                write!(f, ")")
            }
            DeviceKind::Bluetooth { local_name } => {
                write!(f, "{} (ble {})", self.id, local_name.as_deref().unwrap_or("unnamed"))
            }
        }
    }
}

/// Exclusive byte channel to the servo board.
///
/// Frames are written whole; `read` returns whatever arrived before the
/// timeout, which is empty when nothing did.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn open(&mut self) -> Result<(), TransportError>;

    async fn close(&mut self);

    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    async fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, TransportError>;
}
