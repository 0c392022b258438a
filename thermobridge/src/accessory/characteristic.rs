use parking_lot::RwLock;
use serde::Serialize;
use std::{fmt, sync::Arc};
use tokio::sync::watch;

type RemoteUpdateFn<T> = Box<dyn Fn(T) + Send + Sync>;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum CharacteristicKind {
    #[display(fmt = "current_temperature")]
    CurrentTemperature,
    #[display(fmt = "target_temperature")]
    TargetTemperature,
    #[display(fmt = "target_heating_cooling_state")]
    TargetHeatingCoolingState,
    #[display(fmt = "current_heating_cooling_state")]
    CurrentHeatingCoolingState,
}

impl CharacteristicKind {
    pub const ALL: [CharacteristicKind; 4] = [
        CharacteristicKind::CurrentTemperature,
        CharacteristicKind::TargetTemperature,
        CharacteristicKind::TargetHeatingCoolingState,
        CharacteristicKind::CurrentHeatingCoolingState,
    ];

    /// Whether users may change this characteristic through the accessory.
    pub fn writable(self) -> bool {
        matches!(
            self,
            CharacteristicKind::TargetTemperature | CharacteristicKind::TargetHeatingCoolingState
        )
    }

    pub fn from_topic(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.to_string() == s)
    }
}

/// Numeric limits advertised with a characteristic.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bounds {
    #[serde(rename = "min_value")]
    pub min:  f64,
    #[serde(rename = "max_value")]
    pub max:  f64,
    #[serde(rename = "min_step")]
    pub step: f64,
}

pub trait CharacteristicValue: Copy + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    fn constrain(self, _bounds: &Bounds) -> Self {
        self
    }
}

impl CharacteristicValue for f64 {
    fn constrain(self, bounds: &Bounds) -> Self {
        self.max(bounds.min).min(bounds.max)
    }
}

/// A single live value of an accessory.
///
/// Local writes (`set_value`) only notify subscribers. Writes that originate
/// from a user on the accessory network (`set_remote_value`) additionally run
/// the registered remote-update callbacks.
#[derive(Clone)]
pub struct Characteristic<T: CharacteristicValue>(Arc<CharacteristicData<T>>);

struct CharacteristicData<T> {
    kind:           CharacteristicKind,
    bounds:         Option<Bounds>,
    value:          watch::Sender<T>,
    remote_updates: RwLock<Vec<RemoteUpdateFn<T>>>,
}

impl<T: CharacteristicValue> Characteristic<T> {
    pub fn new(kind: CharacteristicKind, initial: T) -> Self {
        Self::build(kind, None, initial)
    }

    pub fn bounded(kind: CharacteristicKind, initial: T, bounds: Bounds) -> Self {
        Self::build(kind, Some(bounds), initial)
    }

    fn build(kind: CharacteristicKind, bounds: Option<Bounds>, initial: T) -> Self {
        let initial = match &bounds {
            Some(b) => initial.constrain(b),
            None => initial,
        };
        let (value, _) = watch::channel(initial);
        Characteristic(Arc::new(CharacteristicData {
            kind,
            bounds,
            value,
            remote_updates: Default::default(),
        }))
    }

    pub fn kind(&self) -> CharacteristicKind {
        self.0.kind
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.0.bounds
    }

    pub fn value(&self) -> T {
        *self.0.value.borrow()
    }

    /// Stores a new value. Returns whether the stored value changed.
    pub fn set_value(&self, value: T) -> bool {
        let value = match &self.0.bounds {
            Some(b) => value.constrain(b),
            None => value,
        };
        self.0.value.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Stores a value requested by a user and runs the remote-update callbacks.
    pub fn set_remote_value(&self, value: T) {
        self.set_value(value);
        let value = self.value();
        for callback in self.0.remote_updates.read().iter() {
            callback(value);
        }
    }

    pub fn on_remote_update<F>(&self, f: F)
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.0.remote_updates.write().push(Box::new(f));
    }

    #[cfg(test)]
    pub fn remote_listeners(&self) -> usize {
        self.0.remote_updates.read().len()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.0.value.subscribe()
    }
}

impl<T: CharacteristicValue> fmt::Debug for Characteristic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Characteristic")
            .field("kind", &self.0.kind)
            .field("value", &self.value())
            .finish()
    }
}
