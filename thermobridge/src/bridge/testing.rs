//! Test doubles for the bridge's collaborators.

use super::*;
use crate::accessory::{Publisher, ThermostatAccessory};
use parking_lot::Mutex as SyncMutex;
use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use tokio::sync::mpsc;

#[derive(Clone, Debug, PartialEq)]
pub enum ApiCall {
    TargetTemperature(String, f32),
    HvacMode(String, ModeCommand),
}

#[derive(Default)]
pub struct RecordingApi {
    calls: SyncMutex<Vec<ApiCall>>,
    fail:  bool,
}

impl RecordingApi {
    pub fn failing() -> Self {
        RecordingApi {
            calls: Default::default(),
            fail:  true,
        }
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: ApiCall) -> Result<()> {
        self.calls.lock().push(call);
        if self.fail {
            bail!("rejected by test")
        }
        Ok(())
    }
}

#[async_trait]
impl ThermostatApi for RecordingApi {
    async fn set_target_temperature(&self, device_id: &str, celsius: f32) -> Result<()> {
        self.record(ApiCall::TargetTemperature(device_id.into(), celsius))
    }

    async fn set_hvac_mode(&self, device_id: &str, mode: ModeCommand) -> Result<()> {
        self.record(ApiCall::HvacMode(device_id.into(), mode))
    }
}

/// Counts starts; either fails immediately or serves forever.
#[derive(Default)]
pub struct CountingPublisher {
    starts: AtomicUsize,
    fail:   bool,
}

impl CountingPublisher {
    pub fn failing() -> Self {
        CountingPublisher {
            starts: Default::default(),
            fail:   true,
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Publisher for CountingPublisher {
    async fn start(&self, accessory: ThermostatAccessory) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("cannot advertise {}", accessory.id());
        }
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Feed that replays prepared batches, then fails.
#[derive(Default)]
pub struct ScriptedFeed {
    batches: VecDeque<Result<Vec<Thermostat>>>,
}

impl ScriptedFeed {
    pub fn new(batches: Vec<Result<Vec<Thermostat>>>) -> Self {
        ScriptedFeed {
            batches: batches.into(),
        }
    }
}

#[async_trait]
impl DeviceFeed for ScriptedFeed {
    async fn next_batch(&mut self) -> Result<Vec<Thermostat>> {
        self.batches
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("feed exhausted")))
    }
}

pub fn snapshot(id: &str, ambient: f64, target: f64, mode: &str, state: &str) -> Thermostat {
    Thermostat {
        device_id: id.into(),
        name: format!("Thermostat {}", id),
        ambient_temperature_c: ambient,
        target_temperature_c: target,
        hvac_mode: mode.into(),
        hvac_state: state.into(),
        ..Default::default()
    }
}

pub fn registry(
    api: Arc<dyn ThermostatApi>,
    publisher: Arc<dyn Publisher>,
) -> (Arc<AccessoryRegistry>, mpsc::UnboundedReceiver<PublisherFailure>) {
    let (failures, rx) = mpsc::unbounded_channel();
    let factory = BindingFactory::new(Default::default(), publisher, api, failures);
    (Arc::new(AccessoryRegistry::new(factory)), rx)
}

/// Waits until `condition` holds, panicking after two seconds.
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}
