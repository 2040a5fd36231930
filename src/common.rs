//! Well-known GATT identifiers and name resolution.

use btleplug::api::bleuuid::uuid_from_u16;
use uuid::Uuid;

pub mod services {
    use btleplug::api::bleuuid::uuid_from_u16;
    use uuid::Uuid;

    pub const GENERIC_ACCESS: Uuid = uuid_from_u16(0x1800);
    pub const DEVICE_INFORMATION: Uuid = uuid_from_u16(0x180A);
    pub const HEART_RATE: Uuid = uuid_from_u16(0x180D);
    pub const BATTERY: Uuid = uuid_from_u16(0x180F);
    pub const ENVIRONMENTAL_SENSING: Uuid = uuid_from_u16(0x181A);
}

pub mod characteristics {
    use btleplug::api::bleuuid::uuid_from_u16;
    use uuid::Uuid;

    pub const DEVICE_NAME: Uuid = uuid_from_u16(0x2A00);
    pub const BATTERY_LEVEL: Uuid = uuid_from_u16(0x2A19);
    pub const MODEL_NUMBER_STRING: Uuid = uuid_from_u16(0x2A24);
    pub const FIRMWARE_REVISION_STRING: Uuid = uuid_from_u16(0x2A26);
    pub const MANUFACTURER_NAME_STRING: Uuid = uuid_from_u16(0x2A29);
    pub const HEART_RATE_MEASUREMENT: Uuid = uuid_from_u16(0x2A37);
    pub const TEMPERATURE: Uuid = uuid_from_u16(0x2A6E);
    pub const HUMIDITY: Uuid = uuid_from_u16(0x2A6F);
}

const SERVICE_NAMES: &[(&str, Uuid)] = &[
    ("generic_access", services::GENERIC_ACCESS),
    ("device_information", services::DEVICE_INFORMATION),
    ("heart_rate", services::HEART_RATE),
    ("battery_service", services::BATTERY),
    ("environmental_sensing", services::ENVIRONMENTAL_SENSING),
];

const CHARACTERISTIC_NAMES: &[(&str, Uuid)] = &[
    ("gap.device_name", characteristics::DEVICE_NAME),
    ("battery_level", characteristics::BATTERY_LEVEL),
    ("model_number_string", characteristics::MODEL_NUMBER_STRING),
    ("firmware_revision_string", characteristics::FIRMWARE_REVISION_STRING),
    ("manufacturer_name_string", characteristics::MANUFACTURER_NAME_STRING),
    ("heart_rate_measurement", characteristics::HEART_RATE_MEASUREMENT),
    ("temperature", characteristics::TEMPERATURE),
    ("humidity", characteristics::HUMIDITY),
];

/// Resolve a service given as a GATT name (`battery_service`), a full UUID
/// or a 16-bit alias (`0x180f`).
pub fn service_uuid(id: &str) -> Option<Uuid> {
    resolve(SERVICE_NAMES, id)
}

/// Resolve a characteristic given as a GATT name (`battery_level`), a full UUID
/// or a 16-bit alias (`0x2a19`).
pub fn characteristic_uuid(id: &str) -> Option<Uuid> {
    resolve(CHARACTERISTIC_NAMES, id)
}

fn resolve(names: &[(&str, Uuid)], id: &str) -> Option<Uuid> {
    let id = id.trim().to_ascii_lowercase();

    if let Some((_, uuid)) = names.iter().find(|(name, _)| *name == id) {
        return Some(*uuid);
    }

    let short = id.strip_prefix("0x").unwrap_or(&id);
    if short.len() == 4 {
        return u16::from_str_radix(short, 16).ok().map(uuid_from_u16);
    }

    Uuid::parse_str(&id).ok()
}
