//! In-memory [`DeviceHost`] for exercising the fetch pipeline without radio hardware.
//!
//! Devices advertise every service they expose. Each host call is recorded so the
//! order of operations can be inspected afterwards.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::{Error, Result};
use uuid::Uuid;

use crate::host::{DeviceHost, DiscoveryOptions};

const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// A host operation as observed by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Discover,
    Connect(String),
    Service(Uuid),
    Characteristic(Uuid),
    Read(Uuid),
    Disconnect(String),
}

#[derive(Debug, Clone)]
pub struct SimulatedCharacteristic {
    uuid: Uuid,
    value: Vec<u8>,
    fail_reads: bool,
}

#[derive(Debug, Clone)]
pub struct SimulatedService {
    uuid: Uuid,
    characteristics: Vec<SimulatedCharacteristic>,
}

impl SimulatedService {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            characteristics: Vec::new(),
        }
    }

    /// Expose a readable characteristic with the given current value
    pub fn with_characteristic(mut self, uuid: Uuid, value: impl Into<Vec<u8>>) -> Self {
        self.characteristics.push(SimulatedCharacteristic {
            uuid,
            value: value.into(),
            fail_reads: false,
        });
        self
    }

    /// Expose a characteristic whose reads time out
    pub fn with_unreadable_characteristic(mut self, uuid: Uuid) -> Self {
        self.characteristics.push(SimulatedCharacteristic {
            uuid,
            value: Vec::new(),
            fail_reads: true,
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    name: String,
    services: Vec<SimulatedService>,
    refuse_connections: bool,
    fail_lookups: bool,
    already_connected: bool,
}

impl SimulatedDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            services: Vec::new(),
            refuse_connections: false,
            fail_lookups: false,
            already_connected: false,
        }
    }

    pub fn with_service(mut self, service: SimulatedService) -> Self {
        self.services.push(service);
        self
    }

    /// Every connection attempt is refused
    pub fn refuse_connections(mut self) -> Self {
        self.refuse_connections = true;
        self
    }

    /// Service and characteristic lookups fail instead of answering
    pub fn fail_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    /// The device already has a link opened by someone else. Connecting
    /// reuses it instead of opening a new one.
    pub fn already_connected(mut self) -> Self {
        self.already_connected = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn advertises(&self, uuid: &Uuid) -> bool {
        self.services.iter().any(|service| service.uuid == *uuid)
    }

    fn service(&self, uuid: Uuid) -> Option<&SimulatedService> {
        self.services.iter().find(|service| service.uuid == uuid)
    }
}

#[derive(Debug, Clone)]
pub struct DeviceRef {
    index: usize,
    name: String,
}

#[derive(Debug, Clone)]
pub struct ConnectionRef {
    index: usize,
    name: String,
    opened: bool,
}

#[derive(Debug, Clone)]
pub struct ServiceRef {
    index: usize,
    uuid: Uuid,
}

#[derive(Debug, Clone)]
pub struct CharacteristicRef {
    index: usize,
    service: Uuid,
    uuid: Uuid,
}

#[derive(Default)]
struct State {
    devices: Vec<SimulatedDevice>,
    decline_discovery: bool,
    calls: Vec<HostCall>,
    /// Open links per device index
    open: HashMap<usize, usize>,
}

impl State {
    fn is_open(&self, index: usize) -> bool {
        self.open.get(&index).copied().unwrap_or(0) > 0
    }

    fn characteristic_mut(
        &mut self,
        index: usize,
        service: Uuid,
        uuid: Uuid,
    ) -> Option<&mut SimulatedCharacteristic> {
        self.devices
            .get_mut(index)?
            .services
            .iter_mut()
            .find(|s| s.uuid == service)?
            .characteristics
            .iter_mut()
            .find(|c| c.uuid == uuid)
    }
}

#[derive(Default)]
pub struct SimulatedHost {
    state: Mutex<State>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(self, device: SimulatedDevice) -> Self {
        {
            let mut state = self.state();
            if device.already_connected {
                let index = state.devices.len();
                state.open.insert(index, 1);
            }
            state.devices.push(device);
        }
        self
    }

    /// Discovery is declined as if the user dismissed the device chooser
    pub fn decline_discovery(self) -> Self {
        self.state().decline_discovery = true;
        self
    }

    /// Replace the current value of a characteristic. Returns false if the
    /// device, service or characteristic does not exist.
    pub fn set_value(
        &self,
        device: &str,
        service: Uuid,
        characteristic: Uuid,
        value: impl Into<Vec<u8>>,
    ) -> bool {
        let mut state = self.state();
        let index = match state.devices.iter().position(|d| d.name == device) {
            Some(index) => index,
            None => return false,
        };

        match state.characteristic_mut(index, service, characteristic) {
            Some(c) => {
                c.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Host calls in the order they were made.
    pub fn calls(&self) -> Vec<HostCall> {
        self.state().calls.clone()
    }

    /// Number of links that were opened and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.state().open.values().sum()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DeviceHost for SimulatedHost {
    type Device = DeviceRef;
    type Connection = ConnectionRef;
    type Service = ServiceRef;
    type Characteristic = CharacteristicRef;

    async fn discover(&self, options: &DiscoveryOptions) -> Result<DeviceRef> {
        let mut state = self.state();
        state.calls.push(HostCall::Discover);

        if state.decline_discovery {
            return Err(Error::Other("user cancelled the device chooser".into()));
        }

        let required = options.required_services();
        state
            .devices
            .iter()
            .enumerate()
            .find(|(_, device)| required.iter().all(|uuid| device.advertises(uuid)))
            .map(|(index, device)| DeviceRef {
                index,
                name: device.name.clone(),
            })
            .ok_or(Error::DeviceNotFound)
    }

    async fn connect(&self, device: &DeviceRef) -> Result<ConnectionRef> {
        let mut state = self.state();
        state.calls.push(HostCall::Connect(device.name.clone()));

        let (refused, already_connected) = state
            .devices
            .get(device.index)
            .map_or((true, false), |d| (d.refuse_connections, d.already_connected));
        if refused {
            return Err(Error::Other(
                format!("connection to {} refused", device.name).into(),
            ));
        }

        if !already_connected {
            *state.open.entry(device.index).or_insert(0) += 1;
        }

        Ok(ConnectionRef {
            index: device.index,
            name: device.name.clone(),
            opened: !already_connected,
        })
    }

    async fn service(&self, connection: &ConnectionRef, uuid: Uuid) -> Result<Option<ServiceRef>> {
        let mut state = self.state();
        state.calls.push(HostCall::Service(uuid));

        if !state.is_open(connection.index) {
            return Err(Error::NotConnected);
        }

        let device = state
            .devices
            .get(connection.index)
            .ok_or(Error::DeviceNotFound)?;
        if device.fail_lookups {
            return Err(Error::Other("GATT operation failed".into()));
        }

        Ok(device.service(uuid).map(|_| ServiceRef {
            index: connection.index,
            uuid,
        }))
    }

    async fn characteristic(
        &self,
        service: &ServiceRef,
        uuid: Uuid,
    ) -> Result<Option<CharacteristicRef>> {
        let mut state = self.state();
        state.calls.push(HostCall::Characteristic(uuid));

        if !state.is_open(service.index) {
            return Err(Error::NotConnected);
        }

        let device = state
            .devices
            .get(service.index)
            .ok_or(Error::DeviceNotFound)?;
        if device.fail_lookups {
            return Err(Error::Other("GATT operation failed".into()));
        }

        let exists = device
            .service(service.uuid)
            .map_or(false, |s| s.characteristics.iter().any(|c| c.uuid == uuid));

        Ok(exists.then(|| CharacteristicRef {
            index: service.index,
            service: service.uuid,
            uuid,
        }))
    }

    async fn read(&self, characteristic: &CharacteristicRef) -> Result<Vec<u8>> {
        let mut state = self.state();
        state.calls.push(HostCall::Read(characteristic.uuid));

        if !state.is_open(characteristic.index) {
            return Err(Error::NotConnected);
        }

        match state.characteristic_mut(
            characteristic.index,
            characteristic.service,
            characteristic.uuid,
        ) {
            Some(c) if c.fail_reads => Err(Error::TimedOut(READ_TIMEOUT)),
            Some(c) => Ok(c.value.clone()),
            None => Err(Error::DeviceNotFound),
        }
    }

    fn opened_link(&self, connection: &ConnectionRef) -> bool {
        connection.opened
    }

    async fn disconnect(&self, connection: &ConnectionRef) -> Result<()> {
        let mut state = self.state();
        state.calls.push(HostCall::Disconnect(connection.name.clone()));

        match state.open.get_mut(&connection.index) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(())
            }
            _ => Err(Error::NotConnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{characteristics::BATTERY_LEVEL, services::BATTERY};

    fn battery_host() -> SimulatedHost {
        SimulatedHost::new().with_device(
            SimulatedDevice::new("sensor").with_service(
                SimulatedService::new(BATTERY).with_characteristic(BATTERY_LEVEL, [0x64]),
            ),
        )
    }

    #[tokio::test]
    async fn reads_require_an_open_link() {
        let host = battery_host();
        let device = host.discover(&DiscoveryOptions::accept_all()).await.unwrap();
        let connection = host.connect(&device).await.unwrap();
        let service = host.service(&connection, BATTERY).await.unwrap().unwrap();
        let characteristic = host
            .characteristic(&service, BATTERY_LEVEL)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(host.read(&characteristic).await.unwrap(), vec![0x64]);

        host.disconnect(&connection).await.unwrap();
        assert_eq!(host.open_connections(), 0);
        assert!(matches!(
            host.read(&characteristic).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn filtered_discovery_skips_devices_without_the_service() {
        let host = SimulatedHost::new()
            .with_device(SimulatedDevice::new("plain"))
            .with_device(
                SimulatedDevice::new("sensor").with_service(SimulatedService::new(BATTERY)),
            );

        let any = host.discover(&DiscoveryOptions::accept_all()).await.unwrap();
        assert_eq!(any.name, "plain");

        let filtered = host
            .discover(&DiscoveryOptions::accept_all().filter_by_service(BATTERY))
            .await
            .unwrap();
        assert_eq!(filtered.name, "sensor");
    }

    #[tokio::test]
    async fn set_value_changes_subsequent_reads() {
        let host = battery_host();
        assert!(host.set_value("sensor", BATTERY, BATTERY_LEVEL, [0x32]));
        assert!(!host.set_value("missing", BATTERY, BATTERY_LEVEL, [0x32]));

        let device = host.discover(&DiscoveryOptions::accept_all()).await.unwrap();
        let connection = host.connect(&device).await.unwrap();
        let service = host.service(&connection, BATTERY).await.unwrap().unwrap();
        let characteristic = host
            .characteristic(&service, BATTERY_LEVEL)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(host.read(&characteristic).await.unwrap(), vec![0x32]);
    }

    #[tokio::test]
    async fn lookups_on_unknown_devices_fail() {
        let host = battery_host();
        host.state().open.insert(7, 1);
        let connection = ConnectionRef {
            index: 7,
            name: "ghost".to_string(),
            opened: true,
        };

        assert!(matches!(
            host.service(&connection, BATTERY).await,
            Err(Error::DeviceNotFound)
        ));

        let service = ServiceRef {
            index: 7,
            uuid: BATTERY,
        };
        assert!(matches!(
            host.characteristic(&service, BATTERY_LEVEL).await,
            Err(Error::DeviceNotFound)
        ));
    }

    #[tokio::test]
    async fn disconnecting_twice_is_an_error() {
        let host = battery_host();
        let device = host.discover(&DiscoveryOptions::accept_all()).await.unwrap();
        let connection = host.connect(&device).await.unwrap();

        host.disconnect(&connection).await.unwrap();
        assert!(host.disconnect(&connection).await.is_err());
    }
}
