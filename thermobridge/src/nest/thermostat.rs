use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Thermostat record as reported by the Nest API.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Thermostat {
    pub device_id:             String,
    pub name:                  String,
    pub name_long:             String,
    pub ambient_temperature_c: f64,
    pub target_temperature_c:  f64,
    pub hvac_mode:             String,
    pub hvac_state:            String,
    pub humidity:              f64,
    pub is_online:             bool,
    pub can_heat:              bool,
    pub can_cool:              bool,
    pub temperature_scale:     String,
    pub software_version:      String,
    pub structure_id:          String,
}

/// The `devices` tree of the Nest data model. Only thermostats are bridged.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Devices {
    pub thermostats: HashMap<String, Thermostat>,
}

impl Devices {
    pub fn into_thermostats(self) -> Vec<Thermostat> {
        self.thermostats
            .into_iter()
            .map(|(id, mut t)| {
                if t.device_id.is_empty() {
                    t.device_id = id;
                }
                t
            })
            .collect()
    }
}
