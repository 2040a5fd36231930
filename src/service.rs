use crate::Characteristic;
use btleplug::api::Service as BtleService;
use btleplug::platform::Peripheral;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Service {
    pub(crate) peripheral: Peripheral,
    pub(crate) service: BtleService,
}

impl Service {
    pub fn characteristics(&self) -> Vec<Characteristic> {
        self.service
            .characteristics
            .iter()
            .map(|characteristic| Characteristic {
                peripheral: self.peripheral.clone(),
                characteristic: characteristic.clone(),
            })
            .collect::<Vec<_>>()
    }

    /// Get characteristic by UUID
    pub fn characteristic(&self, uuid: Uuid) -> Option<Characteristic> {
        self.characteristics()
            .into_iter()
            .find(|characteristic| characteristic.uuid() == uuid)
    }

    pub fn uuid(&self) -> Uuid {
        self.service.uuid
    }
}
