use super::*;
use crate::translate;

/// Consumes the device feed and mirrors every snapshot onto its accessory.
pub struct SyncLoop {
    registry: Arc<AccessoryRegistry>,
}

impl SyncLoop {
    pub fn new(registry: Arc<AccessoryRegistry>) -> Self {
        SyncLoop { registry }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &Arc<AccessoryRegistry> {
        &self.registry
    }

    /// Runs until the feed fails.
    pub async fn run<F: DeviceFeed>(&self, mut feed: F) -> Result<(), BridgeError> {
        loop {
            self.handle_batch(feed.next_batch().await)?;
        }
    }

    pub fn handle_batch(&self, batch: Result<Vec<Thermostat>>) -> Result<(), BridgeError> {
        let batch = batch.map_err(|e| {
            error!("Nest device feed failed: {:?}", e);
            BridgeError::feed(e)
        })?;
        trace!("Received {} thermostat snapshots", batch.len());
        for snapshot in &batch {
            self.apply(snapshot);
        }
        Ok(())
    }

    /// Writes one snapshot onto the accessory of its device. These are local
    /// writes, so nothing is echoed back to the cloud.
    pub fn apply(&self, snapshot: &Thermostat) -> Binding {
        if log_enabled!(log::Level::Debug) {
            match serde_json::to_string_pretty(snapshot) {
                Ok(json) => debug!("Thermostat update: {}", json),
                Err(e) => debug!("Could not render {:?}: {}", snapshot, e),
            }
        }

        let binding = self.registry.get_or_create(snapshot);
        let accessory = &binding.accessory;
        accessory
            .current_temperature
            .set_value(snapshot.ambient_temperature_c);
        accessory
            .target_temperature
            .set_value(snapshot.target_temperature_c);
        accessory
            .target_mode
            .set_value(translate::target_mode(&snapshot.hvac_mode));
        accessory
            .current_mode
            .set_value(translate::current_mode(&snapshot.hvac_state));
        binding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accessory::{CurrentMode, TargetMode},
        bridge::testing::*,
    };
    use std::time::Duration;

    fn sync_loop() -> (SyncLoop, Arc<RecordingApi>, Arc<CountingPublisher>) {
        let api = Arc::new(RecordingApi::default());
        let publisher = Arc::new(CountingPublisher::default());
        let (registry, _failures) = registry(api.clone(), publisher.clone());
        (SyncLoop::new(registry), api, publisher)
    }

    #[tokio::test]
    async fn first_sighting_creates_binding() {
        let (sync, _, publisher) = sync_loop();
        let b = sync.apply(&snapshot("dev1", 21.0, 22.5, "heat", "heating"));

        assert_eq!(21.0, b.accessory.current_temperature.value());
        assert_eq!(22.5, b.accessory.target_temperature.value());
        assert_eq!(TargetMode::Heat, b.accessory.target_mode.value());
        assert_eq!(CurrentMode::Heat, b.accessory.current_mode.value());
        assert_eq!("Thermostat dev1", b.accessory.name());
        assert_eq!("Nest", b.accessory.info.manufacturer);
        eventually(|| publisher.starts() == 1).await;
    }

    #[tokio::test]
    async fn later_snapshot_updates_existing_binding() {
        let (sync, _, _) = sync_loop();
        let first = sync.apply(&snapshot("dev1", 21.0, 22.5, "heat", "heating"));
        let second = sync.apply(&snapshot("dev1", 21.0, 22.5, "off", "off"));

        assert!(first.same(&second));
        assert_eq!(1, sync.registry().len());
        assert_eq!(TargetMode::Off, second.accessory.target_mode.value());
        assert_eq!(CurrentMode::Off, second.accessory.current_mode.value());
    }

    #[tokio::test]
    async fn unknown_values_use_defaults() {
        let (sync, _, _) = sync_loop();
        let b = sync.apply(&snapshot("dev1", 21.0, 22.5, "eco", "idle"));
        assert_eq!(TargetMode::Auto, b.accessory.target_mode.value());
        assert_eq!(CurrentMode::Off, b.accessory.current_mode.value());
    }

    #[tokio::test]
    async fn out_of_range_targets_are_clamped() {
        let (sync, _, _) = sync_loop();
        let b = sync.apply(&snapshot("dev1", 5.0, 35.0, "heat", "heating"));
        assert_eq!(9.0, b.accessory.current_temperature.value());
        assert_eq!(32.0, b.accessory.target_temperature.value());
    }

    #[tokio::test]
    async fn cloud_updates_are_not_echoed() {
        let (sync, api, _) = sync_loop();
        sync.apply(&snapshot("dev1", 21.0, 22.5, "heat", "heating"));
        sync.apply(&snapshot("dev1", 20.0, 18.0, "cool", "cooling"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn batch_with_several_devices() {
        let (sync, _, publisher) = sync_loop();
        sync.handle_batch(Ok(vec![
            snapshot("dev1", 21.0, 22.5, "heat", "heating"),
            snapshot("dev2", 24.0, 23.0, "cool", "cooling"),
        ]))
        .unwrap();
        assert_eq!(2, sync.registry().len());
        eventually(|| publisher.starts() == 2).await;
    }

    #[tokio::test]
    async fn feed_error_ends_the_loop() {
        let (sync, _, _) = sync_loop();
        let feed = ScriptedFeed::new(vec![
            Ok(vec![snapshot("dev1", 21.0, 22.5, "heat", "heating")]),
            Err(anyhow!("stream dropped")),
            Ok(vec![snapshot("dev2", 21.0, 22.5, "heat", "heating")]),
        ]);

        let err = sync.run(feed).await.unwrap_err();
        assert!(matches!(err, BridgeError::Feed(_)));
        assert_eq!(1, sync.registry().len());
        assert!(sync.registry().get("dev2").is_none());
    }
}
