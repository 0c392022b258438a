//! Accessory-side model: characteristics, the thermostat accessory and the
//! publisher contract that makes an accessory reachable on the network.

mod characteristic;
pub mod mqtt;
mod pin;

use crate::prelude::*;
use async_trait::async_trait;
pub use characteristic::*;
pub use pin::Pin;
use std::{fmt, str::FromStr};

/// Mode requested by a user of the accessory. Discriminants match the
/// HomeKit `TargetHeatingCoolingState` values.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum TargetMode {
    #[display(fmt = "off")]
    Off  = 0,
    #[display(fmt = "heat")]
    Heat = 1,
    #[display(fmt = "cool")]
    Cool = 2,
    #[display(fmt = "auto")]
    Auto = 3,
}

/// Mode the accessory reports as actually running. Discriminants match the
/// HomeKit `CurrentHeatingCoolingState` values.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum CurrentMode {
    #[display(fmt = "off")]
    Off  = 0,
    #[display(fmt = "heat")]
    Heat = 1,
    #[display(fmt = "cool")]
    Cool = 2,
}

impl CharacteristicValue for TargetMode {}
impl CharacteristicValue for CurrentMode {}

impl FromStr for TargetMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" | "0" => Ok(TargetMode::Off),
            "heat" | "1" => Ok(TargetMode::Heat),
            "cool" | "2" => Ok(TargetMode::Cool),
            "auto" | "3" => Ok(TargetMode::Auto),
            other => Err(anyhow!("'{}' is not a target mode", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AccessoryInfo {
    pub id:           String,
    pub name:         String,
    pub manufacturer: String,
    pub model:        String,
}

/// A thermostat accessory: display metadata plus four live characteristics.
#[derive(Clone)]
pub struct ThermostatAccessory {
    pub info:                Arc<AccessoryInfo>,
    pub current_temperature: Characteristic<f64>,
    pub target_temperature:  Characteristic<f64>,
    pub target_mode:         Characteristic<TargetMode>,
    pub current_mode:        Characteristic<CurrentMode>,
}

impl ThermostatAccessory {
    pub fn new(info: AccessoryInfo, temperature: f64, bounds: Bounds) -> Self {
        ThermostatAccessory {
            info:                Arc::new(info),
            current_temperature: Characteristic::bounded(
                CharacteristicKind::CurrentTemperature,
                temperature,
                bounds,
            ),
            target_temperature:  Characteristic::bounded(
                CharacteristicKind::TargetTemperature,
                temperature,
                bounds,
            ),
            target_mode:         Characteristic::new(
                CharacteristicKind::TargetHeatingCoolingState,
                TargetMode::Off,
            ),
            current_mode:        Characteristic::new(
                CharacteristicKind::CurrentHeatingCoolingState,
                CurrentMode::Off,
            ),
        }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn bounds_of(&self, kind: CharacteristicKind) -> Option<Bounds> {
        match kind {
            CharacteristicKind::CurrentTemperature => self.current_temperature.bounds(),
            CharacteristicKind::TargetTemperature => self.target_temperature.bounds(),
            CharacteristicKind::TargetHeatingCoolingState => self.target_mode.bounds(),
            CharacteristicKind::CurrentHeatingCoolingState => self.current_mode.bounds(),
        }
    }

    /// Applies a user request received from the accessory network.
    pub fn remote_update(&self, kind: CharacteristicKind, payload: &str) -> Result<()> {
        match kind {
            CharacteristicKind::TargetTemperature => {
                let value: f64 = payload
                    .trim()
                    .parse()
                    .with_context(|| format!("'{}' is not a temperature", payload))?;
                self.target_temperature.set_remote_value(value);
            }
            CharacteristicKind::TargetHeatingCoolingState => {
                self.target_mode.set_remote_value(payload.parse()?);
            }
            k => bail!("{} is read-only", k),
        }
        Ok(())
    }
}

impl fmt::Debug for ThermostatAccessory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThermostatAccessory")
            .field("info", &self.info)
            .field("current_temperature", &self.current_temperature)
            .field("target_temperature", &self.target_temperature)
            .field("target_mode", &self.target_mode)
            .field("current_mode", &self.current_mode)
            .finish()
    }
}

/// Makes accessories reachable on the accessory network.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Advertises the accessory and serves it. Only returns on failure.
    async fn start(&self, accessory: ThermostatAccessory) -> Result<()>;
}
