//! Read a single characteristic value from a nearby BLE device.
//!
//! Each fetch discovers a device, connects to it, looks up a service and one of
//! its characteristics, reads the current value and releases the connection.
//! [`DeviceValueFetcher::fetch`] reports which step failed through [`FetchError`],
//! while [`DeviceValueFetcher::fetch_device_value`] logs the failure and returns `None`.
//!
//! ## Usage
//!
//! Here is an example on how to read the battery level of the first device found:
//!
//! ```rust,no_run
//! use blefetch::common::{characteristics::BATTERY_LEVEL, services::BATTERY};
//! use blefetch::{DeviceValueFetcher, PlatformHost, ScanConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     pretty_env_logger::init();
//!
//!     let fetcher = DeviceValueFetcher::new(PlatformHost::new(ScanConfig::default()));
//!
//!     match fetcher.fetch_device_value(BATTERY, BATTERY_LEVEL).await {
//!         Some(value) => println!("Battery level: {:?}", value),
//!         None => println!("No battery level available"),
//!     }
//! }
//!```
//!
//! The pipeline runs against any [`DeviceHost`]. [`PlatformHost`] talks to the
//! system Bluetooth stack, [`simulator::SimulatedHost`] keeps everything in memory.

#![warn(clippy::all, future_incompatible, nonstandard_style, rust_2018_idioms)]

pub use btleplug::{api::BDAddr, Error, Result};

pub use characteristic::Characteristic;
pub use connection::Connection;
pub use device::Device;
pub use error::{FailureKind, FetchError};
pub use fetcher::{ConnectionPolicy, DeviceValueFetcher, FetchRequest};
pub use host::{DeviceHost, DiscoveryOptions};
pub use platform::PlatformHost;
pub use scanner::{ScanConfig, Scanner};
pub use service::Service;

mod characteristic;
mod connection;
mod device;
mod error;
mod fetcher;
mod host;
mod platform;
mod scanner;
mod service;

pub mod common;
pub mod simulator;
