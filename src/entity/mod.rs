//! Entities exposed for one configured device. Each entity observes the shared
//! coordinator and refreshes its own view of the state when notified.

use std::sync::Arc;

use crate::data::{Coordinator, ListenerId};

pub use self::{
    binary_sensor::{BinarySensor, BinarySensorKind},
    fan::{Fan, FanState},
    sensor::{Sensor, SensorKind},
};

pub mod binary_sensor;
pub mod fan;
pub mod sensor;

/* === Definitions === */

pub trait Entity: Send + Sync {
    fn name(&self) -> &str;

    /// `{entry_id}_{suffix}`, stable across restarts.
    fn unique_id(&self) -> &str;

    fn available(&self) -> bool;

    /// Invoked once per poll cycle, after the new snapshot has been published.
    fn handle_update(&self);
}

/// Fields shared by every entity.
#[derive(Debug)]
pub(crate) struct EntityBase {
    coordinator: Arc<Coordinator>,
    name: String,
    unique_id: String,
}

/* === Implementations === */

/// Registers the entity as a coordinator listener. The listener only holds a weak
/// reference, a dropped entity is skipped.
pub fn subscribe(coordinator: &Coordinator, entity: &Arc<dyn Entity>) -> ListenerId {
    let entity = Arc::downgrade(entity);

    coordinator.add_listener(move || {
        if let Some(entity) = entity.upgrade() {
            entity.handle_update();
        }
    })
}

impl EntityBase {
    pub(crate) fn new(coordinator: Arc<Coordinator>, name: String, entry_id: &str, suffix: &str) -> Self {
        EntityBase {
            coordinator,
            name,
            unique_id: format!("{entry_id}_{suffix}"),
        }
    }

    pub(crate) fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub(crate) fn available(&self) -> bool {
        self.coordinator.last_update_success()
    }
}
