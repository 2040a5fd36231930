//! This example reads a characteristic from the first BLE device found.
//! Service and characteristic default to the battery level and can be given
//! as command line arguments, either as GATT names or UUIDs.

use blefetch::common::{characteristic_uuid, service_uuid};
use blefetch::{DeviceValueFetcher, FetchRequest, PlatformHost, ScanConfig};
use std::time::Duration;

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let service = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "battery_service".to_string());
    let characteristic = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "battery_level".to_string());

    let service = service_uuid(&service).expect("Unknown service");
    let characteristic = characteristic_uuid(&characteristic).expect("Unknown characteristic");

    let config = ScanConfig::default().stop_after_timeout(Duration::from_secs(15));
    let fetcher = DeviceValueFetcher::new(PlatformHost::new(config));

    match fetcher
        .fetch(&FetchRequest::new(service, characteristic))
        .await
    {
        Ok(value) => println!("Value: {:?}", value),
        Err(e) => println!("Failed ({:?}): {}", e.kind(), e),
    }
}
