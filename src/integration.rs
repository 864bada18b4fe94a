//! Entry setup and teardown. All configured entries share a single coordinator,
//! created with the first entry and shut down with the last one.

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;
use tokio::sync::Mutex;

use crate::{
    config::{CoordinatorConfig, DeviceConfig},
    data::{Coordinator, ListenerId, UpdateFailed},
    entity::{self, BinarySensor, Entity, Fan, Sensor},
};

/* === Definitions === */

type CoordinatorFactory = Box<dyn Fn(DeviceConfig) -> Coordinator + Send + Sync>;

pub struct Integration {
    factory: CoordinatorFactory,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    coordinator: Option<Arc<Coordinator>>,
    entries: HashMap<String, Vec<ListenerId>>,
}

/// Entities created for one entry.
#[derive(Clone, Debug)]
pub struct Entities {
    pub fan: Arc<Fan>,
    pub sensors: Vec<Arc<Sensor>>,
    pub binary_sensors: Vec<Arc<BinarySensor>>,
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Entry {0} is already set up")]
    AlreadyLoaded(String),

    #[error("Device not ready: {0}")]
    NotReady(#[from] UpdateFailed),
}

/* === Implementations === */

impl Integration {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::with_factory(move |device| Coordinator::from_config(device, &config))
    }

    /// Uses `factory` to build the shared coordinator from the first entry's config.
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(DeviceConfig) -> Coordinator + Send + Sync + 'static,
    {
        Integration {
            factory: Box::new(factory),
            state: Mutex::default(),
        }
    }

    pub async fn coordinator(&self) -> Option<Arc<Coordinator>> {
        self.state.lock().await.coordinator.clone()
    }

    pub async fn is_loaded(&self, entry_id: &str) -> bool {
        self.state.lock().await.entries.contains_key(entry_id)
    }

    /// Creates the entities for `entry_id`. The first entry also creates the
    /// coordinator, performs its first refresh and starts polling; a failed first
    /// refresh aborts the setup.
    pub async fn setup_entry(
        &self,
        entry_id: &str,
        device: DeviceConfig,
    ) -> Result<Entities, SetupError> {
        let mut state = self.state.lock().await;

        if state.entries.contains_key(entry_id) {
            return Err(SetupError::AlreadyLoaded(entry_id.to_owned()));
        }

        let coordinator = match state.coordinator.clone() {
            Some(coordinator) => coordinator,
            None => {
                let coordinator = Arc::new((self.factory)(device.clone()));

                coordinator.refresh().await?;
                coordinator.start();

                state.coordinator = Some(coordinator.clone());
                coordinator
            }
        };

        let entities = Entities::new(&coordinator, &device.name, entry_id);

        let listeners = entities
            .iter()
            .map(|e| entity::subscribe(&coordinator, &e))
            .collect();

        state.entries.insert(entry_id.to_owned(), listeners);
        tracing::info!("Set up entry {entry_id} ({})", device.name);

        Ok(entities)
    }

    /// Returns `false` if the entry was not loaded.
    pub async fn unload_entry(&self, entry_id: &str) -> bool {
        let mut state = self.state.lock().await;

        let Some(listeners) = state.entries.remove(entry_id) else {
            return false;
        };

        if let Some(coordinator) = &state.coordinator {
            for id in listeners {
                coordinator.remove_listener(id);
            }
        }

        if state.entries.is_empty() {
            if let Some(coordinator) = state.coordinator.take() {
                coordinator.shutdown();
            }
        }

        tracing::info!("Unloaded entry {entry_id}");
        true
    }
}

impl Entities {
    fn new(coordinator: &Arc<Coordinator>, name: &str, entry_id: &str) -> Self {
        Entities {
            fan: Arc::new(Fan::new(coordinator.clone(), name, entry_id)),
            sensors: Sensor::all(coordinator, name, entry_id)
                .into_iter()
                .map(Arc::new)
                .collect(),
            binary_sensors: BinarySensor::all(coordinator, name, entry_id)
                .into_iter()
                .map(Arc::new)
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Arc<dyn Entity>> + '_ {
        let fan = std::iter::once(self.fan.clone() as Arc<dyn Entity>);
        let sensors = self.sensors.iter().map(|s| s.clone() as Arc<dyn Entity>);
        let binary = self.binary_sensors.iter().map(|s| s.clone() as Arc<dyn Entity>);

        fan.chain(sensors).chain(binary)
    }
}
