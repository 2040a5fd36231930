use btleplug::api::{CharPropFlags, Characteristic as BtleCharacteristic, Peripheral as _};
use btleplug::platform::Peripheral;
use btleplug::{Error, Result};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Characteristic {
    pub(crate) peripheral: Peripheral,
    pub(crate) characteristic: BtleCharacteristic,
}

impl Characteristic {
    pub fn uuid(&self) -> Uuid {
        self.characteristic.uuid
    }

    /// UUID of the service this characteristic belongs to
    pub fn service_uuid(&self) -> Uuid {
        self.characteristic.service_uuid
    }

    pub fn is_readable(&self) -> bool {
        self.characteristic.properties.contains(CharPropFlags::READ)
    }

    /// Read the current value. Fails without touching the device if the
    /// characteristic does not support reads.
    pub async fn read(&self) -> Result<Vec<u8>> {
        if !self.is_readable() {
            return Err(Error::NotSupported(format!(
                "characteristic {} is not readable",
                self.uuid()
            )));
        }

        self.peripheral.read(&self.characteristic).await
    }
}
