use super::*;
use crate::{accessory::TargetMode, translate};
use tokio::sync::mpsc;

/// A change requested by a user on the accessory side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    SetTargetTemp(f64),
    SetTargetMode(TargetMode),
}

/// Single entry point for the cloud mutators of one device. Commands run in
/// the order they were requested; failures are logged and dropped, the next
/// feed snapshot reflects the cloud's actual state.
pub(super) async fn dispatch(
    device_id: String,
    name: String,
    api: Arc<dyn ThermostatApi>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(command) = commands.recv().await {
        let result = match command {
            Command::SetTargetTemp(celsius) => {
                info!("Changed target temperature for {} to {}", name, celsius);
                api.set_target_temperature(&device_id, celsius as f32)
                    .await
            }
            Command::SetTargetMode(mode) => {
                let mode = translate::mode_command(mode);
                info!("Changed mode for {} to {}", name, mode);
                api.set_hvac_mode(&device_id, mode).await
            }
        };
        if let Err(e) = result {
            warn!("Nest did not accept {:?} for {}: {:?}", command, name, e);
        }
    }
    debug!("Command channel for {} closed", name);
}
