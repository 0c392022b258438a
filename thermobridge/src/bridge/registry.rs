use super::*;
use crate::accessory::{AccessoryInfo, Bounds, Publisher, ThermostatAccessory};
use super::commands::dispatch;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use tokio::{sync::mpsc, task::JoinHandle};

/// Raised by a supervised publisher task that gave up.
#[derive(Debug)]
pub struct PublisherFailure {
    pub device_id: String,
    pub error:     Error,
}

impl From<PublisherFailure> for BridgeError {
    fn from(f: PublisherFailure) -> Self {
        BridgeError::publisher(&f.device_id, f.error)
    }
}

/// Pairing of one cloud device with its accessory and background tasks.
#[derive(Clone, Debug, Deref)]
pub struct Binding(Arc<BindingData>);

#[derive(Debug)]
pub struct BindingData {
    pub accessory: ThermostatAccessory,
    publisher:     JoinHandle<()>,
    dispatcher:    JoinHandle<()>,
}

#[cfg(test)]
impl Binding {
    /// Whether both handles refer to the same binding.
    pub fn same(&self, other: &Binding) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Drop for BindingData {
    fn drop(&mut self) {
        self.publisher.abort();
        self.dispatcher.abort();
    }
}

/// Builds accessories for newly seen devices and wires them up.
pub struct BindingFactory {
    settings:  Arc<AccessoryConfiguration>,
    publisher: Arc<dyn Publisher>,
    api:       Arc<dyn ThermostatApi>,
    failures:  mpsc::UnboundedSender<PublisherFailure>,
}

impl BindingFactory {
    pub fn new(
        settings: Arc<AccessoryConfiguration>,
        publisher: Arc<dyn Publisher>,
        api: Arc<dyn ThermostatApi>,
        failures: mpsc::UnboundedSender<PublisherFailure>,
    ) -> Self {
        BindingFactory {
            settings,
            publisher,
            api,
            failures,
        }
    }

    /// Creates the binding for a snapshot. Never awaits; background work is
    /// spawned on the current runtime.
    pub fn create(&self, snapshot: &Thermostat) -> Binding {
        let info = AccessoryInfo {
            id:           snapshot.device_id.clone(),
            name:         snapshot.name.clone(),
            manufacturer: self.settings.manufacturer.clone(),
            model:        self.settings.model.clone(),
        };
        let bounds = Bounds {
            min:  self.settings.min_temperature,
            max:  self.settings.max_temperature,
            step: self.settings.temperature_step,
        };
        let accessory = ThermostatAccessory::new(info, snapshot.ambient_temperature_c, bounds);

        let (commands, rx) = mpsc::unbounded_channel();
        let tx = commands.clone();
        accessory.target_temperature.on_remote_update(move |celsius| {
            let _ = tx.send(Command::SetTargetTemp(celsius));
        });
        accessory.target_mode.on_remote_update(move |mode| {
            let _ = commands.send(Command::SetTargetMode(mode));
        });

        let dispatcher = tokio::spawn(dispatch(
            snapshot.device_id.clone(),
            snapshot.name.clone(),
            self.api.clone(),
            rx,
        ));
        let publisher = tokio::spawn(supervise(
            self.publisher.clone(),
            accessory.clone(),
            self.failures.clone(),
        ));

        Binding(Arc::new(BindingData {
            accessory,
            publisher,
            dispatcher,
        }))
    }
}

async fn supervise(
    publisher: Arc<dyn Publisher>,
    accessory: ThermostatAccessory,
    failures: mpsc::UnboundedSender<PublisherFailure>,
) {
    let device_id = accessory.id().to_string();
    let name = accessory.name().to_string();
    match publisher.start(accessory).await {
        Ok(()) => warn!("Publisher for {} stopped", name),
        Err(error) => {
            error!("Publisher for {} failed: {:?}", name, error);
            let _ = failures.send(PublisherFailure { device_id, error });
        }
    }
}

/// Device id to binding map. Owns the factory so that the lookup, the
/// creation and the insert happen under one lock.
pub struct AccessoryRegistry {
    bindings: SyncMutex<HashMap<String, Binding>>,
    factory:  BindingFactory,
}

impl AccessoryRegistry {
    pub fn new(factory: BindingFactory) -> Self {
        AccessoryRegistry {
            bindings: Default::default(),
            factory,
        }
    }

    /// Returns the binding for the snapshot's device, creating it on first
    /// sighting.
    pub fn get_or_create(&self, snapshot: &Thermostat) -> Binding {
        let mut bindings = self.bindings.lock();
        if let Some(binding) = bindings.get(&snapshot.device_id) {
            return binding.clone();
        }
        info!("Creating new accessory for {}", snapshot.name);
        let binding = self.factory.create(snapshot);
        bindings.insert(snapshot.device_id.clone(), binding.clone());
        binding
    }

    #[cfg(test)]
    pub fn get(&self, device_id: &str) -> Option<Binding> {
        self.bindings.lock().get(device_id).cloned()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.bindings.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.bindings.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{accessory::TargetMode, bridge::testing::*, nest::ModeCommand};

    #[tokio::test]
    async fn second_sighting_reuses_binding() {
        let api = Arc::new(RecordingApi::default());
        let publisher = Arc::new(CountingPublisher::default());
        let (registry, _failures) = registry(api, publisher.clone());

        let first = registry.get_or_create(&snapshot("dev1", 21.0, 22.5, "heat", "heating"));
        let second = registry.get_or_create(&snapshot("dev1", 18.0, 19.0, "off", "off"));

        assert!(first.same(&second));
        assert_eq!(1, registry.len());
        assert_eq!(1, first.accessory.target_mode.remote_listeners());
        assert_eq!(1, first.accessory.target_temperature.remote_listeners());
        eventually(|| publisher.starts() == 1).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sightings_create_one_binding() {
        let api = Arc::new(RecordingApi::default());
        let publisher = Arc::new(CountingPublisher::default());
        let (registry, _failures) = registry(api, publisher.clone());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry.get_or_create(&snapshot("dev1", 21.0, 22.0, "heat", "idle"))
                })
            })
            .collect();
        let mut bindings = vec![];
        for task in tasks {
            bindings.push(task.await.unwrap());
        }

        assert!(bindings.iter().all(|b| b.same(&bindings[0])));
        assert_eq!(1, registry.len());
        eventually(|| publisher.starts() == 1).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(1, publisher.starts());
    }

    #[tokio::test]
    async fn user_mode_change_reaches_cloud() {
        let api = Arc::new(RecordingApi::default());
        let (registry, _failures) = registry(api.clone(), Arc::new(CountingPublisher::default()));
        let binding = registry.get_or_create(&snapshot("dev1", 21.0, 22.5, "heat", "heating"));
        let current = binding.accessory.current_mode.value();

        binding.accessory.target_mode.set_remote_value(TargetMode::Cool);

        eventually(|| !api.calls().is_empty()).await;
        assert_eq!(
            vec![ApiCall::HvacMode("dev1".into(), ModeCommand::Cool)],
            api.calls()
        );
        assert_eq!(current, binding.accessory.current_mode.value());
        assert_eq!(21.0, binding.accessory.current_temperature.value());
    }

    #[tokio::test]
    async fn user_temperature_change_reaches_cloud() {
        let api = Arc::new(RecordingApi::default());
        let (registry, _failures) = registry(api.clone(), Arc::new(CountingPublisher::default()));
        let binding = registry.get_or_create(&snapshot("dev1", 21.0, 22.5, "heat", "heating"));

        binding.accessory.target_temperature.set_remote_value(19.5);
        binding.accessory.target_temperature.set_remote_value(23.0);

        eventually(|| api.calls().len() == 2).await;
        assert_eq!(
            vec![
                ApiCall::TargetTemperature("dev1".into(), 19.5),
                ApiCall::TargetTemperature("dev1".into(), 23.0),
            ],
            api.calls()
        );
    }

    #[tokio::test]
    async fn publisher_failure_is_reported() {
        let (registry, mut failures) = registry(
            Arc::new(RecordingApi::default()),
            Arc::new(CountingPublisher::failing()),
        );
        registry.get_or_create(&snapshot("dev1", 21.0, 22.5, "heat", "heating"));

        let failure = failures.recv().await.unwrap();
        assert_eq!("dev1", failure.device_id);
        let err: BridgeError = failure.into();
        assert!(matches!(err, BridgeError::Publisher { .. }));
    }

    #[tokio::test]
    async fn unknown_device_has_no_binding() {
        let (registry, _failures) = registry(
            Arc::new(RecordingApi::default()),
            Arc::new(CountingPublisher::default()),
        );
        assert!(registry.is_empty());
        assert!(registry.get("dev1").is_none());
    }
}
