use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serialport::{SerialPort, SerialPortType};
use tracing::{debug, info};

use crate::{
    config::LinkSettings,
    constants::{PRODUCT_ID, VENDOR_ID},
    transport::{DeviceDescriptor, DeviceKind, Transport, TransportError},
};

type Port = Arc<Mutex<Box<dyn SerialPort>>>;

/// USB serial link to the board (9600 8N1 by default).
pub struct SerialTransport {
    settings: LinkSettings,
    port: Option<Port>,
}

impl SerialTransport {
    pub fn new(settings: LinkSettings) -> Self {
        SerialTransport { settings, port: None }
    }

    /// True when at least one board is plugged in.
    pub fn is_connected() -> bool {
        Self::scan().map(|devices| !devices.is_empty()).unwrap_or(false)
    }

    fn scan() -> Result<Vec<DeviceDescriptor>, TransportError> {
        let mut devices: Vec<DeviceDescriptor> = serialport::available_ports()?
            .into_iter()
            .filter_map(|port| match port.port_type {
                SerialPortType::UsbPort(usb) if usb.vid == VENDOR_ID && usb.pid == PRODUCT_ID => {
                    Some(DeviceDescriptor {
                        id: port.port_name,
                        kind: DeviceKind::Usb {
                            vendor_id: usb.vid,
                            product_id: usb.pid,
                            serial_number: usb.serial_number,
                        },
                    })
                }
                _ => None,
            })
            .collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(devices)
    }

    fn resolve_port_name(&self) -> Result<String, TransportError> {
        if let Some(port) = &self.settings.port {
            return Ok(port.clone());
        }

        Self::scan()?
            .into_iter()
            .find(|device| match (&self.settings.serial_number, &device.kind) {
                (None, _) => true,
                (Some(wanted), DeviceKind::Usb { serial_number, .. }) => {
                    serial_number.as_deref() == Some(wanted.as_str())
                }
                _ => false,
            })
            .map(|device| device.id)
            .ok_or(TransportError::NoDeviceFound)
    }

    fn port(&self) -> Result<Port, TransportError> {
        self.port.as_ref().map(Arc::clone).ok_or(TransportError::NotOpen)
    }
}

impl Transport for SerialTransport {
    async fn open(&mut self) -> Result<(), TransportError> {
        let name = self.resolve_port_name()?;
        let baud_rate = self.settings.baud_rate;
        let timeout = self.settings.read_timeout();

        let port_name = name.clone();
        let port = tokio::task::spawn_blocking(move || {
            serialport::new(port_name, baud_rate)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .timeout(timeout)
                .open()
        })
        .await??;

        info!(port = %name, baud_rate, "Connected via serial");
        self.port = Some(Arc::new(Mutex::new(port)));
        Ok(())
    }

    async fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Serial port closed");
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let port = self.port()?;
        let data = bytes.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut port = port.lock();
            port.write_all(&data)?;
            port.flush()
        })
        .await??;
        Ok(())
    }

    async fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let port = self.port()?;
        let idle_timeout = self.settings.read_timeout();
        tokio::task::spawn_blocking(move || {
            let mut port = port.lock();
            read_with_deadline(&mut *port, max_bytes, timeout, idle_timeout)
        })
        .await?
    }

    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, TransportError> {
        tokio::task::spawn_blocking(Self::scan).await?
    }
}

/// What the deadline read needs from a port.
trait TimedRead: Read {
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), TransportError>;
}

impl TimedRead for Box<dyn SerialPort> {
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        Ok(self.set_timeout(timeout)?)
    }
}

/// Reads up to `max_bytes` until `timeout` elapses, then puts the port back
/// on `idle_timeout` whether or not the read succeeded.
fn read_with_deadline<P: TimedRead + ?Sized>(
    port: &mut P,
    max_bytes: usize,
    timeout: Duration,
    idle_timeout: Duration,
) -> Result<Vec<u8>, TransportError> {
    let result = fill_until_deadline(port, max_bytes, timeout);
    port.set_read_timeout(idle_timeout)?;
    result
}

fn fill_until_deadline<P: TimedRead + ?Sized>(
    port: &mut P,
    max_bytes: usize,
    timeout: Duration,
) -> Result<Vec<u8>, TransportError> {
    let deadline = Instant::now() + timeout;
    let mut buf = vec![0u8; max_bytes];
    let mut filled = 0;

    while filled < max_bytes {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        port.set_read_timeout(remaining)?;
        match port.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::TimedOut => break,
            Err(e) => return Err(e.into()),
        }
    }

    buf.truncate(filled);
    Ok(buf)
}
