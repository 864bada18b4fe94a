use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{
    data::{Coordinator, Snapshot},
    entity::{Entity, EntityBase},
};

/* === Definitions === */

#[derive(Copy, Clone, Debug, Display, EnumIter, Eq, Hash, PartialEq)]
pub enum BinarySensorKind {
    Power,
    #[strum(to_string = "Connected")]
    Connectivity,
}

#[derive(Debug)]
pub struct BinarySensor {
    base: EntityBase,
    kind: BinarySensorKind,
    on: AtomicBool,
}

/* === Implementations === */

impl BinarySensorKind {
    pub fn suffix(self) -> &'static str {
        match self {
            BinarySensorKind::Power => "power",
            BinarySensorKind::Connectivity => "connected",
        }
    }

    pub fn device_class(self) -> &'static str {
        match self {
            BinarySensorKind::Power => "power",
            BinarySensorKind::Connectivity => "connectivity",
        }
    }

    /// State before the first notification, a device is assumed connected.
    fn initial(self) -> bool {
        self == BinarySensorKind::Connectivity
    }

    pub fn read(self, snapshot: &Snapshot) -> bool {
        match self {
            BinarySensorKind::Power => snapshot.fan.power.is_on(),
            BinarySensorKind::Connectivity => snapshot.connection.connected,
        }
    }
}

impl BinarySensor {
    pub fn new(
        coordinator: Arc<Coordinator>,
        kind: BinarySensorKind,
        name: &str,
        entry_id: &str,
    ) -> Self {
        BinarySensor {
            base: EntityBase::new(coordinator, format!("{name} {kind}"), entry_id, kind.suffix()),
            kind,
            on: AtomicBool::new(kind.initial()),
        }
    }

    pub fn all(coordinator: &Arc<Coordinator>, name: &str, entry_id: &str) -> Vec<BinarySensor> {
        BinarySensorKind::iter()
            .map(|kind| BinarySensor::new(coordinator.clone(), kind, name, entry_id))
            .collect()
    }

    pub fn kind(&self) -> BinarySensorKind {
        self.kind
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Relaxed)
    }
}

impl Entity for BinarySensor {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn handle_update(&self) {
        if let Some(snapshot) = self.base.coordinator().data() {
            self.on.store(self.kind.read(&snapshot), Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entity::tests::{STATE, coordinator},
        hardware::blowcontrol::mock::{MockRunner, Reply},
    };

    #[tokio::test]
    async fn test_identity_and_initial_state() {
        let (coordinator, _) = coordinator(MockRunner::new());
        let [power, connected] = <[BinarySensor; 2]>::try_from(BinarySensor::all(&coordinator, "Bedroom", "abc123"))
            .unwrap();

        assert_eq!(power.name(), "Bedroom Power");
        assert_eq!(power.unique_id(), "abc123_power");
        assert!(!power.is_on());

        assert_eq!(connected.name(), "Bedroom Connected");
        assert_eq!(connected.unique_id(), "abc123_connected");
        assert_eq!(connected.kind().device_class(), "connectivity");
        assert!(connected.is_on());
    }

    #[tokio::test]
    async fn test_power_follows_snapshot() {
        let off = r#"{ "state": { "fpwr": ["ON", "OFF"] } }"#;
        let runner = MockRunner::new().reply(Reply::ok(STATE)).reply(Reply::ok(off));
        let (coordinator, _) = coordinator(runner);

        let power = BinarySensor::new(coordinator.clone(), BinarySensorKind::Power, "Bedroom", "abc123");

        coordinator.refresh().await.unwrap();
        power.handle_update();
        assert!(power.is_on());

        coordinator.refresh().await.unwrap();
        power.handle_update();
        assert!(!power.is_on());
    }

    #[tokio::test]
    async fn test_connectivity_follows_snapshot() {
        let (coordinator, _) = coordinator(MockRunner::new().reply(Reply::ok(STATE)));

        let connected =
            BinarySensor::new(coordinator.clone(), BinarySensorKind::Connectivity, "Bedroom", "abc123");

        let mut snapshot = Snapshot::synthetic();
        assert!(BinarySensorKind::Connectivity.read(&snapshot));

        snapshot.connection.connected = false;
        assert!(!BinarySensorKind::Connectivity.read(&snapshot));

        // Cleared locally so that only the snapshot can set it again
        connected.on.store(false, Ordering::Relaxed);
        connected.handle_update();
        assert!(!connected.is_on());

        coordinator.refresh().await.unwrap();
        connected.handle_update();

        assert!(coordinator.data().unwrap().connection.connected);
        assert!(connected.is_on());
    }
}
