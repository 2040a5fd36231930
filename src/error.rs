use btleplug::Error;
use thiserror::Error;
use uuid::Uuid;

/// The stage of the fetch pipeline that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No device was available, or the selection was declined.
    Discovery,
    /// The selected device refused the connection or was unreachable.
    Connection,
    /// The device does not expose the requested service.
    MissingService,
    /// The service does not expose the requested characteristic.
    MissingCharacteristic,
    /// Reading the characteristic value failed.
    Read,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("device discovery failed: {0}")]
    Discovery(#[source] Error),

    #[error("connection failed: {0}")]
    Connection(#[source] Error),

    #[error("service {uuid} not available{}", detail(.source))]
    MissingService {
        uuid: Uuid,
        #[source]
        source: Option<Error>,
    },

    #[error("characteristic {uuid} not available{}", detail(.source))]
    MissingCharacteristic {
        uuid: Uuid,
        #[source]
        source: Option<Error>,
    },

    #[error("reading characteristic {uuid} failed: {source}")]
    Read {
        uuid: Uuid,
        #[source]
        source: Error,
    },
}

/// Host error appended to a lookup failure, empty when the id was simply absent.
fn detail(source: &Option<Error>) -> String {
    source
        .as_ref()
        .map(|e| format!(": {}", e))
        .unwrap_or_default()
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Discovery(_) => FailureKind::Discovery,
            FetchError::Connection(_) => FailureKind::Connection,
            FetchError::MissingService { .. } => FailureKind::MissingService,
            FetchError::MissingCharacteristic { .. } => FailureKind::MissingCharacteristic,
            FetchError::Read { .. } => FailureKind::Read,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{characteristics::BATTERY_LEVEL, services::BATTERY};
    use std::error::Error as _;

    #[test]
    fn display_names_the_failed_identifier() {
        let err = FetchError::MissingService {
            uuid: BATTERY,
            source: None,
        };
        assert_eq!(
            err.to_string(),
            "service 0000180f-0000-1000-8000-00805f9b34fb not available"
        );
        assert!(err.source().is_none());

        let err = FetchError::Read {
            uuid: BATTERY_LEVEL,
            source: Error::NotConnected,
        };
        assert!(err
            .to_string()
            .starts_with("reading characteristic 00002a19-0000-1000-8000-00805f9b34fb failed"));
        assert!(err.source().is_some());
    }

    #[test]
    fn lookup_errors_show_the_host_error() {
        let err = FetchError::MissingCharacteristic {
            uuid: BATTERY_LEVEL,
            source: Some(Error::Other("GATT operation failed".into())),
        };
        let message = err.to_string();
        assert!(message
            .starts_with("characteristic 00002a19-0000-1000-8000-00805f9b34fb not available: "));
        assert!(message.contains("GATT operation failed"));
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            FetchError::Discovery(Error::DeviceNotFound).kind(),
            FailureKind::Discovery
        );
        assert_eq!(
            FetchError::Connection(Error::NotConnected).kind(),
            FailureKind::Connection
        );
        assert_eq!(
            FetchError::MissingCharacteristic {
                uuid: BATTERY_LEVEL,
                source: Some(Error::NotConnected),
            }
            .kind(),
            FailureKind::MissingCharacteristic
        );
    }
}
