//! The bridge between the cloud device feed and the accessory network.

mod commands;
mod registry;
mod sync;
#[cfg(test)]
pub(crate) mod testing;

use crate::{
    nest::{ModeCommand, Thermostat},
    prelude::*,
};
use async_trait::async_trait;
pub use commands::Command;
pub use registry::*;
pub use sync::SyncLoop;

/// Source of thermostat snapshots. Each call yields the next batch; an error
/// ends consumption.
#[async_trait]
pub trait DeviceFeed: Send {
    async fn next_batch(&mut self) -> Result<Vec<Thermostat>>;
}

/// Cloud-side mutators of a thermostat.
#[async_trait]
pub trait ThermostatApi: Send + Sync {
    async fn set_target_temperature(&self, device_id: &str, celsius: f32) -> Result<()>;
    async fn set_hvac_mode(&self, device_id: &str, mode: ModeCommand) -> Result<()>;
}
