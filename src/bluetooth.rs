use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter,
    ValueNotification, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::{Stream, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{
    config::BluetoothSettings,
    transport::{DeviceDescriptor, DeviceKind, Transport, TransportError},
};

/// Stops a scan whatever its outcome; the scan's own error wins.
async fn finish_scan<T, S>(outcome: Result<T, TransportError>, stop: S) -> Result<T, TransportError>
where
    S: Future<Output = Result<(), btleplug::Error>>,
{
    let stopped = stop.await;
    let value = outcome?;
    stopped?;
    Ok(value)
}

type Notifications = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;

struct Link {
    device: Peripheral,
    write_char: Characteristic,
    write_type: WriteType,
    notifications: Notifications,
    pending: Vec<u8>,
}

/// UART-over-GATT link: one write characteristic, one notify characteristic.
pub struct BluetoothTransport {
    settings: BluetoothSettings,
    link: Option<Link>,
}

impl BluetoothTransport {
    pub fn new(settings: BluetoothSettings) -> Self {
        BluetoothTransport { settings, link: None }
    }

    async fn adapter() -> Result<Adapter, TransportError> {
        let manager = Manager::new().await?;
        manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::DeviceError("No Bluetooth adapter found".into()))
    }

    fn matches(&self, address: &str, local_name: Option<&str>) -> bool {
        match (&self.settings.address, &self.settings.local_name) {
            (Some(wanted), _) => wanted.eq_ignore_ascii_case(address),
            (None, Some(wanted)) => local_name == Some(wanted.as_str()),
            (None, None) => true,
        }
    }

    async fn find_device(&self, adapter: &Adapter) -> Result<Peripheral, TransportError> {
        adapter
            .start_scan(ScanFilter {
                services: vec![self.settings.service_uuid],
            })
            .await?;

        let found = self.await_device(adapter).await;
        finish_scan(found, adapter.stop_scan()).await?.ok_or(TransportError::NoDeviceFound)
    }

    async fn await_device(&self, adapter: &Adapter) -> Result<Option<Peripheral>, TransportError> {
        let mut events = adapter.events().await?;
        let scan_timeout = self.settings.scan_timeout();

        debug!(address = ?self.settings.address, "Scanning for servo board...");

        while let Ok(Some(event)) = tokio::time::timeout(scan_timeout, events.next()).await {
            if let CentralEvent::DeviceDiscovered(id) = event {
                let peripheral = adapter.peripheral(&id).await?;
                let local_name = peripheral.properties().await?.and_then(|p| p.local_name);
                if self.matches(&peripheral.address().to_string(), local_name.as_deref()) {
                    return Ok(Some(peripheral));
                }
            }
        }
        Ok(None)
    }

    fn characteristic(&self, device: &Peripheral, uuid: uuid::Uuid) -> Result<Characteristic, TransportError> {
        device
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid && c.service_uuid == self.settings.service_uuid)
            .ok_or_else(|| TransportError::DeviceError(format!("Characteristic {} not found", uuid)))
    }
}

impl Transport for BluetoothTransport {
    async fn open(&mut self) -> Result<(), TransportError> {
        let adapter = Self::adapter().await?;
        let device = self.find_device(&adapter).await?;
        device.connect().await?;
        device.discover_services().await?;

        let write_char = self.characteristic(&device, self.settings.write_uuid)?;
        let notify_char = self.characteristic(&device, self.settings.notify_uuid)?;
        if !notify_char.properties.contains(CharPropFlags::NOTIFY) {
            return Err(TransportError::DeviceError(format!(
                "Characteristic {} does not notify",
                notify_char.uuid
            )));
        }
        device.subscribe(&notify_char).await?;
        let notifications = device.notifications().await?;

        let write_type = if write_char.properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE) {
            WriteType::WithoutResponse
        } else {
            WriteType::WithResponse
        };

        info!(address = %device.address(), "Connected via Bluetooth");
        self.link = Some(Link {
            device,
            write_char,
            write_type,
            notifications,
            pending: Vec::new(),
        });
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(link) = self.link.take() {
            if let Err(e) = link.device.disconnect().await {
                debug!("Bluetooth disconnect failed: {}", e);
            }
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let link = self.link.as_mut().ok_or(TransportError::NotOpen)?;
        link.device.write(&link.write_char, bytes, link.write_type).await?;
        Ok(())
    }

    async fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let notify_uuid = self.settings.notify_uuid;
        let link = self.link.as_mut().ok_or(TransportError::NotOpen)?;
        let deadline = Instant::now() + timeout;

        while link.pending.len() < max_bytes {
            match tokio::time::timeout_at(deadline, link.notifications.next()).await {
                Ok(Some(notification)) if notification.uuid == notify_uuid => {
                    link.pending.extend_from_slice(&notification.value);
                }
                Ok(Some(_)) => continue,
                Ok(None) => return Err(TransportError::DeviceError("Notification stream ended".into())),
                Err(_) => break,
            }
        }

        // Bytes past `max_bytes` stay queued for the next read.
        let take = link.pending.len().min(max_bytes);
        Ok(link.pending.drain(..take).collect())
    }

    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, TransportError> {
        let adapter = Self::adapter().await?;
        adapter
            .start_scan(ScanFilter {
                services: vec![self.settings.service_uuid],
            })
            .await?;
        tokio::time::sleep(self.settings.scan_timeout()).await;
        adapter.stop_scan().await?;

        let mut devices = Vec::new();
        for peripheral in adapter.peripherals().await? {
            let properties = peripheral.properties().await?;
            let advertises_uart = properties
                .as_ref()
                .map(|p| p.services.contains(&self.settings.service_uuid))
                .unwrap_or(false);
            if advertises_uart {
                devices.push(DeviceDescriptor {
                    id: peripheral.address().to_string(),
                    kind: DeviceKind::Bluetooth {
                        local_name: properties.and_then(|p| p.local_name),
                    },
                });
            }
        }
        Ok(devices)
    }
}
