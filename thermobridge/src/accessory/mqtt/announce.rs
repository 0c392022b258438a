use super::topics::Topics;
use crate::accessory::{Bounds, CharacteristicKind, Pin, ThermostatAccessory};
use serde::Serialize;

/// Retained description of an accessory, published on its config topic.
#[derive(Serialize, Clone, Debug, Default)]
#[serde(rename_all = "snake_case")]
pub struct Announcement {
    pub name:               String,
    pub manufacturer:       String,
    pub model:              String,
    pub serial_number:      String,
    pub sw_version:         String,
    pub category:           String,
    pub setup_code:         String,
    pub availability_topic: String,
    pub characteristics:    Vec<CharacteristicDescriptor>,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub struct CharacteristicDescriptor {
    #[serde(rename = "type")]
    pub kind:          String,
    pub state_topic:   String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,
    #[serde(flatten)]
    pub bounds:        Option<Bounds>,
}

impl Announcement {
    pub fn new(id: &str, accessory: &ThermostatAccessory, setup_code: &Pin, topics: &Topics) -> Self {
        let characteristics = CharacteristicKind::ALL
            .iter()
            .map(|kind| CharacteristicDescriptor {
                kind:          kind.to_string(),
                state_topic:   topics.state(id, *kind),
                command_topic: topics.command(id, *kind),
                bounds:        accessory.bounds_of(*kind),
            })
            .collect();

        Announcement {
            name: accessory.info.name.clone(),
            manufacturer: accessory.info.manufacturer.clone(),
            model: accessory.info.model.clone(),
            serial_number: accessory.info.id.clone(),
            sw_version: crate_version!().into(),
            category: "thermostat".into(),
            setup_code: setup_code.to_string(),
            availability_topic: topics.availability().into(),
            characteristics,
        }
    }
}
