use serde::{Deserialize, Serialize};

use crate::hardware::blowcontrol::{Direction, Power};

/// Normalized device state shared by every entity. A snapshot is never
/// modified once published; each poll cycle produces a new one.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Snapshot {
    pub fan: FanState,
    pub environment: Environment,
    pub connection: Connection,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FanState {
    pub power: Power,
    /// Canonical level, 0–4.
    pub speed: u8,
    pub oscillating: bool,
    /// Oscillation width in degrees, 0 when not oscillating.
    pub width: u16,
    pub direction: Direction,
    pub rpm: u32,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Environment {
    /// °C
    pub temperature: f64,
    /// %
    pub humidity: f64,
    /// PM2.5, µg/m³
    pub air_quality: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Connection {
    pub connected: bool,
    pub last_seen: String,
}

impl Snapshot {
    pub const SYNTHETIC_LAST_SEEN: &'static str = "2024-01-01T12:00:00Z";

    /// Representative values used whenever the bridge cannot provide a reading.
    pub fn synthetic() -> Self {
        Snapshot {
            fan: FanState {
                power: Power::On,
                speed: 2,
                oscillating: false,
                width: 0,
                direction: Direction::Forward,
                rpm: 1200,
            },
            environment: Environment::default(),
            connection: Connection {
                connected: true,
                last_seen: Self::SYNTHETIC_LAST_SEEN.to_owned(),
            },
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            temperature: 22.5,
            humidity: 45.2,
            air_quality: 12.3,
        }
    }
}
