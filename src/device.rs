use std::fmt;
use std::sync::Arc;

use btleplug::{
    api::{BDAddr, Peripheral as _},
    platform::Peripheral,
    Result,
};

use crate::scanner::Session;
use crate::Connection;

/// A device selected by a scan. Not connected until [`Device::connect`] is called.
#[derive(Clone)]
pub struct Device {
    pub(self) _session: Arc<Session>,
    pub(crate) peripheral: Peripheral,
}

impl Device {
    pub(crate) fn new(session: Arc<Session>, peripheral: Peripheral) -> Self {
        Self {
            _session: session,
            peripheral,
        }
    }

    #[inline]
    pub fn address(&self) -> BDAddr {
        self.peripheral.address()
    }

    /// Signal strength
    #[inline]
    pub async fn rssi(&self) -> Option<i16> {
        self.peripheral
            .properties()
            .await
            .ok()
            .flatten()
            .and_then(|props| props.rssi)
    }

    /// Local name of the device
    #[inline]
    pub async fn local_name(&self) -> Option<String> {
        self.peripheral
            .properties()
            .await
            .ok()
            .flatten()
            .and_then(|props| props.local_name)
    }

    /// Open a link to the device
    pub async fn connect(&self) -> Result<Connection> {
        let opened = !self.peripheral.is_connected().await?;
        if opened {
            log::debug!("Connecting to device {}", self.address());
            self.peripheral.connect().await?;
        }

        Ok(Connection::new(self.clone(), opened))
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("peripheral", &self.peripheral)
            .finish()
    }
}
