use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use btleplug::api::{BDAddr, Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use btleplug::{Error, Result};
use futures::{Stream, StreamExt};
use tokio::time::timeout;

use crate::host::DiscoveryOptions;
use crate::Device;

const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

type EventStream = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

pub struct ScanConfig {
    /// Index of the Bluetooth adapter to use. The first found adapter is used by default.
    adapter_index: usize,
    /// Filters the found devices based on device address.
    address_filter: Option<Box<dyn Fn(BDAddr) -> bool + Send + Sync>>,
    /// Filters the found devices based on local name.
    name_filter: Option<Box<dyn Fn(&str) -> bool + Send + Sync>>,
    /// The scan fails when no device was selected within this duration.
    timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            address_filter: None,
            name_filter: None,
            timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

impl ScanConfig {
    /// Index of bluetooth adapter to use
    pub fn adapter_index(mut self, index: usize) -> Self {
        self.adapter_index = index;
        self
    }

    /// Filter scanned devices based on the device address
    pub fn filter_by_address(
        mut self,
        func: impl Fn(BDAddr) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.address_filter = Some(Box::new(func));
        self
    }

    /// Filter scanned devices based on the device name
    pub fn filter_by_name(mut self, func: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.name_filter = Some(Box::new(func));
        self
    }

    /// Give up the scan after given duration
    pub fn stop_after_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Require that the scanned devices have a name
    pub fn require_name(self) -> Self {
        if self.name_filter.is_none() {
            self.filter_by_name(|name| !name.is_empty())
        } else {
            self
        }
    }
}

pub(crate) struct Session {
    pub(crate) _manager: Manager,
    pub(crate) adapter: Adapter,
}

impl Session {
    async fn open(adapter_index: usize) -> Result<Self> {
        let manager = Manager::new().await?;
        let mut adapters = manager.adapters().await?;

        if adapter_index >= adapters.len() {
            return Err(Error::DeviceNotFound);
        }

        let adapter = adapters.swap_remove(adapter_index);

        log::trace!("Using adapter: {:?}", adapter);

        Ok(Self {
            _manager: manager,
            adapter,
        })
    }
}

/// Selects a single nearby device per scan.
#[derive(Default)]
pub struct Scanner {
    config: ScanConfig,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scan until the first device accepted by `options` and the configured
    /// filters shows up. The scan is stopped before returning.
    pub async fn first_device(&self, options: &DiscoveryOptions) -> Result<Device> {
        let session = Arc::new(Session::open(self.config.adapter_index).await?);
        let mut events = session.adapter.events().await?;

        let filter = ScanFilter {
            services: options.required_services().to_vec(),
        };

        log::info!("Starting the scan");
        session.adapter.start_scan(filter).await?;

        let found = timeout(
            self.config.timeout,
            self.wait_for_device(&session, options, &mut events),
        )
        .await
        .unwrap_or(Err(Error::TimedOut(self.config.timeout)));

        if let Err(e) = session.adapter.stop_scan().await {
            log::debug!("Could not stop the scan: {:?}", e);
        }

        let peripheral = found?;
        log::info!("Found device: {:?}", peripheral);

        Ok(Device::new(session, peripheral))
    }

    async fn wait_for_device(
        &self,
        session: &Session,
        options: &DiscoveryOptions,
        events: &mut EventStream,
    ) -> Result<Peripheral> {
        // The adapter may already know about devices from an earlier scan.
        for peripheral in session.adapter.peripherals().await? {
            if self.accepts(&peripheral, options).await {
                return Ok(peripheral);
            }
        }

        while let Some(event) = events.next().await {
            let peripheral_id = match event {
                CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                _ => continue,
            };

            if let Ok(peripheral) = session.adapter.peripheral(&peripheral_id).await {
                log::trace!("Device discovered: {:?}", peripheral);

                if self.accepts(&peripheral, options).await {
                    return Ok(peripheral);
                }
            }
        }

        Err(Error::DeviceNotFound)
    }

    /// Checks the filters that do not require a connection to the device.
    /// A device whose name is not known yet is rejected for now; it comes
    /// back as an update once the name has been advertised.
    async fn accepts(&self, peripheral: &Peripheral, options: &DiscoveryOptions) -> bool {
        if let Some(filter_by_addr) = self.config.address_filter.as_ref() {
            if !filter_by_addr(peripheral.address()) {
                return false;
            }
        }

        let required = options.required_services();
        if self.config.name_filter.is_none() && required.is_empty() {
            return true;
        }

        let props = match peripheral.properties().await {
            Ok(Some(props)) => props,
            _ => return false,
        };

        if let Some(filter_by_name) = self.config.name_filter.as_ref() {
            match props.local_name.as_deref() {
                Some(name) if filter_by_name(name) => {}
                _ => return false,
            }
        }

        required.iter().all(|uuid| props.services.contains(uuid))
    }
}
