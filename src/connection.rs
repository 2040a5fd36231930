use btleplug::api::Peripheral as _;
use btleplug::{Error, Result};
use uuid::Uuid;

use crate::{Device, Service};

/// An open link to a [`Device`].
#[derive(Debug, Clone)]
pub struct Connection {
    device: Device,
    opened: bool,
}

impl Connection {
    pub(crate) fn new(device: Device, opened: bool) -> Self {
        Self { device, opened }
    }

    /// Whether the link was opened by [`Device::connect`] rather than
    /// being up already.
    pub fn opened_link(&self) -> bool {
        self.opened
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub async fn is_connected(&self) -> Result<bool> {
        self.device.peripheral.is_connected().await
    }

    /// Close the link
    #[inline]
    pub async fn disconnect(&self) -> Result<()> {
        self.device.peripheral.disconnect().await
    }

    /// Services exposed by the device
    pub async fn services(&self) -> Result<Vec<Service>> {
        let peripheral = &self.device.peripheral;

        if !peripheral.is_connected().await? {
            return Err(Error::NotConnected);
        }

        let mut services = peripheral.services();
        if services.is_empty() {
            log::debug!("Discovering services for {}", peripheral.address());
            peripheral.discover_services().await?;
            services = peripheral.services();
        }

        Ok(services
            .into_iter()
            .map(|service| Service {
                peripheral: peripheral.clone(),
                service,
            })
            .collect::<Vec<_>>())
    }

    /// Get service by UUID
    pub async fn service(&self, uuid: Uuid) -> Result<Option<Service>> {
        Ok(self
            .services()
            .await?
            .into_iter()
            .find(|service| service.uuid() == uuid))
    }
}
