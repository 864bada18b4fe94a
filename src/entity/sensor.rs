use std::sync::{Arc, Mutex, PoisonError};

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{
    data::{Coordinator, Snapshot},
    entity::{Entity, EntityBase},
};

/* === Definitions === */

#[derive(Copy, Clone, Debug, Display, EnumIter, Eq, Hash, PartialEq)]
pub enum SensorKind {
    Temperature,
    Humidity,
    #[strum(to_string = "Air Quality")]
    AirQuality,
    #[strum(to_string = "Fan Speed")]
    FanSpeed,
}

/// A numeric reading taken from the snapshot.
#[derive(Debug)]
pub struct Sensor {
    base: EntityBase,
    kind: SensorKind,
    value: Mutex<Option<f64>>,
}

/* === Implementations === */

impl SensorKind {
    pub fn suffix(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::AirQuality => "air_quality",
            SensorKind::FanSpeed => "fan_speed",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            SensorKind::Temperature => "°C",
            SensorKind::Humidity => "%",
            SensorKind::AirQuality => "µg/m³",
            SensorKind::FanSpeed => "RPM",
        }
    }

    pub fn device_class(self) -> Option<&'static str> {
        match self {
            SensorKind::Temperature => Some("temperature"),
            SensorKind::Humidity => Some("humidity"),
            SensorKind::AirQuality => Some("pm25"),
            SensorKind::FanSpeed => None,
        }
    }

    pub fn read(self, snapshot: &Snapshot) -> f64 {
        match self {
            SensorKind::Temperature => snapshot.environment.temperature,
            SensorKind::Humidity => snapshot.environment.humidity,
            SensorKind::AirQuality => snapshot.environment.air_quality,
            SensorKind::FanSpeed => f64::from(snapshot.fan.rpm),
        }
    }
}

impl Sensor {
    pub fn new(coordinator: Arc<Coordinator>, kind: SensorKind, name: &str, entry_id: &str) -> Self {
        Sensor {
            base: EntityBase::new(coordinator, format!("{name} {kind}"), entry_id, kind.suffix()),
            kind,
            value: Mutex::default(),
        }
    }

    /// One sensor of each kind.
    pub fn all(coordinator: &Arc<Coordinator>, name: &str, entry_id: &str) -> Vec<Sensor> {
        SensorKind::iter()
            .map(|kind| Sensor::new(coordinator.clone(), kind, name, entry_id))
            .collect()
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn unit(&self) -> &'static str {
        self.kind.unit()
    }

    /// `None` until the first poll notification.
    pub fn value(&self) -> Option<f64> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Entity for Sensor {
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
            *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(self.kind.read(&snapshot));
        }
    }
}
