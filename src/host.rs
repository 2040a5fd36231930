//! The device-access layer the fetcher runs against.

use async_trait::async_trait;
use btleplug::Result;
use uuid::Uuid;

/// How a host should pick the device to connect to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Accept any nearby device regardless of what it advertises.
    pub accept_all: bool,
    /// Services a device must advertise. Ignored when `accept_all` is set.
    pub filters: Vec<Uuid>,
    /// Services the caller wants access to without requiring them up front.
    pub optional_services: Vec<Uuid>,
}

impl DiscoveryOptions {
    /// Accept the first device found.
    pub fn accept_all() -> Self {
        Self {
            accept_all: true,
            ..Default::default()
        }
    }

    /// Declare a service the caller may use once connected
    pub fn with_optional_service(mut self, uuid: Uuid) -> Self {
        if !self.optional_services.contains(&uuid) {
            self.optional_services.push(uuid);
        }
        self
    }

    /// Only accept devices advertising the given service
    pub fn filter_by_service(mut self, uuid: Uuid) -> Self {
        self.accept_all = false;
        if !self.filters.contains(&uuid) {
            self.filters.push(uuid);
        }
        self
    }

    /// Services the device has to advertise to be selected.
    pub fn required_services(&self) -> &[Uuid] {
        if self.accept_all {
            &[]
        } else {
            &self.filters
        }
    }
}

/// Asynchronous capability set of a device-access layer.
///
/// Lookups return `Ok(None)` when the peripheral does not expose the identifier
/// and `Err` when the lookup itself could not be carried out.
#[async_trait]
pub trait DeviceHost: Send + Sync {
    type Device: Send + Sync;
    type Connection: Send + Sync;
    type Service: Send + Sync;
    type Characteristic: Send + Sync;

    async fn discover(&self, options: &DiscoveryOptions) -> Result<Self::Device>;

    async fn connect(&self, device: &Self::Device) -> Result<Self::Connection>;

    async fn service(
        &self,
        connection: &Self::Connection,
        uuid: Uuid,
    ) -> Result<Option<Self::Service>>;

    async fn characteristic(
        &self,
        service: &Self::Service,
        uuid: Uuid,
    ) -> Result<Option<Self::Characteristic>>;

    async fn read(&self, characteristic: &Self::Characteristic) -> Result<Vec<u8>>;

    /// Whether `connect` opened this link, as opposed to reusing one that was
    /// already up. Only links opened here are closed again after a fetch.
    fn opened_link(&self, _connection: &Self::Connection) -> bool {
        true
    }

    async fn disconnect(&self, connection: &Self::Connection) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::services::{BATTERY, HEART_RATE};

    #[test]
    fn accept_all_ignores_filters() {
        let options = DiscoveryOptions::accept_all().with_optional_service(BATTERY);
        assert!(options.required_services().is_empty());
        assert_eq!(options.optional_services, vec![BATTERY]);
    }

    #[test]
    fn filtering_disables_accept_all() {
        let options = DiscoveryOptions::accept_all()
            .filter_by_service(HEART_RATE)
            .filter_by_service(HEART_RATE);
        assert!(!options.accept_all);
        assert_eq!(options.required_services(), &[HEART_RATE]);
    }
}
