use uuid::Uuid;

use crate::error::FetchError;
use crate::host::{DeviceHost, DiscoveryOptions};

/// What happens to the link once a fetch is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPolicy {
    /// Disconnect on every exit path, including failures. A link that was
    /// already up before the fetch is left alone.
    #[default]
    Release,
    /// Leave the link open after the fetch returns.
    KeepOpen,
}

/// A single characteristic to read and how to find the device exposing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    service: Uuid,
    characteristic: Uuid,
    discovery: DiscoveryOptions,
}

impl FetchRequest {
    /// Accept any device and declare `service` as an optional service.
    pub fn new(service: Uuid, characteristic: Uuid) -> Self {
        Self {
            service,
            characteristic,
            discovery: DiscoveryOptions::accept_all().with_optional_service(service),
        }
    }

    /// Only select devices that advertise the requested service
    pub fn require_service(mut self) -> Self {
        self.discovery = self.discovery.filter_by_service(self.service);
        self
    }

    pub fn service(&self) -> Uuid {
        self.service
    }

    pub fn characteristic(&self) -> Uuid {
        self.characteristic
    }

    pub fn discovery(&self) -> &DiscoveryOptions {
        &self.discovery
    }
}

/// Reads one characteristic value from a freshly discovered device.
///
/// Every call runs the full pipeline: discover, connect, look up the service and
/// the characteristic, then read. Nothing is cached between calls.
pub struct DeviceValueFetcher<H> {
    host: H,
    policy: ConnectionPolicy,
}

impl<H: DeviceHost> DeviceValueFetcher<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            policy: ConnectionPolicy::default(),
        }
    }

    pub fn connection_policy(mut self, policy: ConnectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Read the value, or `None` if any step failed. The failure is logged.
    pub async fn fetch_device_value(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Option<Vec<u8>> {
        self.fetch_or_log(&FetchRequest::new(service, characteristic))
            .await
    }

    /// Same as [`fetch_device_value`](Self::fetch_device_value) for a prepared request.
    pub async fn fetch_or_log(&self, request: &FetchRequest) -> Option<Vec<u8>> {
        match self.fetch(request).await {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("Bluetooth error: {}", e);
                None
            }
        }
    }

    /// Read the value, reporting which step failed.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<Vec<u8>, FetchError> {
        let device = self
            .host
            .discover(request.discovery())
            .await
            .map_err(FetchError::Discovery)?;

        let connection = self
            .host
            .connect(&device)
            .await
            .map_err(FetchError::Connection)?;

        log::debug!("Connected, looking up service {}", request.service());

        let result = self.read_value(&connection, request).await;

        let release = self.policy == ConnectionPolicy::Release;
        if release && self.host.opened_link(&connection) {
            if let Err(e) = self.host.disconnect(&connection).await {
                log::debug!("Could not disconnect: {:?}", e);
            }
        }

        result
    }

    async fn read_value(
        &self,
        connection: &H::Connection,
        request: &FetchRequest,
    ) -> Result<Vec<u8>, FetchError> {
        let service = self
            .host
            .service(connection, request.service())
            .await
            .map_err(|e| FetchError::MissingService {
                uuid: request.service(),
                source: Some(e),
            })?
            .ok_or_else(|| FetchError::MissingService {
                uuid: request.service(),
                source: None,
            })?;

        let characteristic = self
            .host
            .characteristic(&service, request.characteristic())
            .await
            .map_err(|e| FetchError::MissingCharacteristic {
                uuid: request.characteristic(),
                source: Some(e),
            })?
            .ok_or_else(|| FetchError::MissingCharacteristic {
                uuid: request.characteristic(),
                source: None,
            })?;

        let raw = self
            .host
            .read(&characteristic)
            .await
            .map_err(|source| FetchError::Read {
                uuid: request.characteristic(),
                source,
            })?;

        log::trace!("Read {} bytes from {}", raw.len(), request.characteristic());

        Ok(raw.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::characteristics::BATTERY_LEVEL;
    use crate::common::services::{BATTERY, HEART_RATE};
    use crate::error::FailureKind;
    use crate::simulator::{HostCall, SimulatedDevice, SimulatedHost, SimulatedService};

    fn sensor() -> SimulatedDevice {
        SimulatedDevice::new("sensor").with_service(
            SimulatedService::new(BATTERY)
                .with_characteristic(BATTERY_LEVEL, vec![0x64, 0x00, 0xff]),
        )
    }

    #[tokio::test]
    async fn copies_every_byte_in_order() {
        let fetcher = DeviceValueFetcher::new(SimulatedHost::new().with_device(sensor()));

        let value = fetcher
            .fetch(&FetchRequest::new(BATTERY, BATTERY_LEVEL))
            .await
            .unwrap();

        assert_eq!(value, vec![0x64, 0x00, 0xff]);
    }

    #[tokio::test]
    async fn releases_the_connection_on_success_and_failure() {
        let fetcher = DeviceValueFetcher::new(
            SimulatedHost::new()
                .with_device(sensor().with_service(SimulatedService::new(HEART_RATE))),
        );

        fetcher.fetch_device_value(BATTERY, BATTERY_LEVEL).await.unwrap();
        assert_eq!(fetcher.host().open_connections(), 0);

        let err = fetcher
            .fetch(&FetchRequest::new(HEART_RATE, BATTERY_LEVEL))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::MissingCharacteristic);
        assert_eq!(fetcher.host().open_connections(), 0);
    }

    #[tokio::test]
    async fn keep_open_leaves_the_link_up() {
        let fetcher = DeviceValueFetcher::new(SimulatedHost::new().with_device(sensor()))
            .connection_policy(ConnectionPolicy::KeepOpen);

        fetcher.fetch_device_value(BATTERY, BATTERY_LEVEL).await.unwrap();
        fetcher.fetch_device_value(BATTERY, BATTERY_LEVEL).await.unwrap();

        assert_eq!(fetcher.host().open_connections(), 2);
        assert!(!fetcher
            .host()
            .calls()
            .iter()
            .any(|call| matches!(call, HostCall::Disconnect(_))));
    }

    #[tokio::test]
    async fn existing_link_is_not_torn_down() {
        let fetcher = DeviceValueFetcher::new(
            SimulatedHost::new().with_device(sensor().already_connected()),
        );

        let value = fetcher
            .fetch(&FetchRequest::new(BATTERY, BATTERY_LEVEL))
            .await
            .unwrap();

        assert_eq!(value, vec![0x64, 0x00, 0xff]);
        assert_eq!(fetcher.host().open_connections(), 1);
        assert!(!fetcher
            .host()
            .calls()
            .iter()
            .any(|call| matches!(call, HostCall::Disconnect(_))));
    }

    #[tokio::test]
    async fn no_disconnect_when_connection_was_never_made() {
        let fetcher = DeviceValueFetcher::new(
            SimulatedHost::new().with_device(sensor().refuse_connections()),
        );

        let err = fetcher
            .fetch(&FetchRequest::new(BATTERY, BATTERY_LEVEL))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Connection);
        assert_eq!(
            fetcher.host().calls(),
            vec![HostCall::Discover, HostCall::Connect("sensor".to_string())]
        );
    }

    #[tokio::test]
    async fn lookup_errors_keep_their_source() {
        let fetcher =
            DeviceValueFetcher::new(SimulatedHost::new().with_device(sensor().fail_lookups()));

        match fetcher.fetch(&FetchRequest::new(BATTERY, BATTERY_LEVEL)).await {
            Err(FetchError::MissingService { uuid, source }) => {
                assert_eq!(uuid, BATTERY);
                assert!(source.is_some());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn required_service_is_checked_during_discovery() {
        let fetcher = DeviceValueFetcher::new(
            SimulatedHost::new()
                .with_device(SimulatedDevice::new("plain"))
                .with_device(sensor()),
        );

        let broad = fetcher
            .fetch(&FetchRequest::new(BATTERY, BATTERY_LEVEL))
            .await
            .unwrap_err();
        assert_eq!(broad.kind(), FailureKind::MissingService);

        let value = fetcher
            .fetch(&FetchRequest::new(BATTERY, BATTERY_LEVEL).require_service())
            .await
            .unwrap();
        assert_eq!(value, vec![0x64, 0x00, 0xff]);
    }
}
