use async_trait::async_trait;
use btleplug::Result;
use uuid::Uuid;

use crate::host::{DeviceHost, DiscoveryOptions};
use crate::{Characteristic, Connection, Device, ScanConfig, Scanner, Service};

/// [`DeviceHost`] backed by the system Bluetooth stack.
#[derive(Default)]
pub struct PlatformHost {
    scanner: Scanner,
}

impl PlatformHost {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            scanner: Scanner::new(config),
        }
    }
}

#[async_trait]
impl DeviceHost for PlatformHost {
    type Device = Device;
    type Connection = Connection;
    type Service = Service;
    type Characteristic = Characteristic;

    async fn discover(&self, options: &DiscoveryOptions) -> Result<Device> {
        self.scanner.first_device(options).await
    }

    async fn connect(&self, device: &Device) -> Result<Connection> {
        device.connect().await
    }

    async fn service(&self, connection: &Connection, uuid: Uuid) -> Result<Option<Service>> {
        connection.service(uuid).await
    }

    async fn characteristic(
        &self,
        service: &Service,
        uuid: Uuid,
    ) -> Result<Option<Characteristic>> {
        Ok(service.characteristic(uuid))
    }

    async fn read(&self, characteristic: &Characteristic) -> Result<Vec<u8>> {
        characteristic.read().await
    }

    fn opened_link(&self, connection: &Connection) -> bool {
        connection.opened_link()
    }

    async fn disconnect(&self, connection: &Connection) -> Result<()> {
        connection.disconnect().await
    }
}
