use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    data::snapshot::{Connection, Environment, FanState, Snapshot},
    hardware::blowcontrol::{
        Direction, Power,
        defs::{RPM_PER_LEVEL, to_canonical},
    },
    misc::serde::{deserialise_or_default, deserialise_reading},
};

/* === Definitions === */

/// Output of `blowcontrol state --json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStatus {
    #[serde(deserialize_with = "deserialise_or_default")]
    state: RawState,
    #[serde(deserialize_with = "deserialise_or_default")]
    environmental: RawEnvironment,
}

/// Product state, most fields arrive as `[mode, value]` pairs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawState {
    #[serde(rename = "fpwr", deserialize_with = "deserialise_reading")]
    power: Option<String>,
    #[serde(rename = "fnsp", deserialize_with = "deserialise_reading")]
    speed: Option<String>,
    #[serde(rename = "oson", deserialize_with = "deserialise_reading")]
    oscillation: Option<String>,
    #[serde(rename = "osal", deserialize_with = "deserialise_reading")]
    lower_angle: Option<String>,
    #[serde(rename = "osau", deserialize_with = "deserialise_reading")]
    upper_angle: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEnvironment {
    #[serde(rename = "tact", deserialize_with = "deserialise_reading")]
    temperature: Option<String>,
    #[serde(rename = "hact", deserialize_with = "deserialise_reading")]
    humidity: Option<String>,
    #[serde(rename = "pm25", deserialize_with = "deserialise_reading")]
    air_quality: Option<String>,
}

/* === Implementations === */

/// Converts a parsed state document into a snapshot. Missing or malformed fields
/// fall back to their defaults, this never fails. Only objects are read, any
/// other top-level value yields the defaults.
pub fn normalize(document: &Value, seen: DateTime<Utc>) -> Snapshot {
    let raw = match document {
        Value::Object(_) => RawStatus::deserialize(document).unwrap_or_default(),
        _ => RawStatus::default(),
    };

    Snapshot {
        fan: raw.state.fan(),
        environment: raw.environmental.environment(),
        connection: Connection {
            connected: true,
            last_seen: seen.to_rfc3339_opts(SecondsFormat::Secs, true),
        },
    }
}

impl RawState {
    fn fan(&self) -> FanState {
        let power = match self.power.as_deref() {
            Some("ON") => Power::On,
            _ => Power::Off,
        };

        let speed = parse_integer(&self.speed).map_or(0, to_canonical);

        let lower = parse_integer(&self.lower_angle).unwrap_or(0);
        let upper = parse_integer(&self.upper_angle).unwrap_or(0);

        let oscillating = self.oscillation.as_deref() == Some("ON") && upper > lower;

        let width = if oscillating {
            u16::try_from(upper.saturating_sub(lower)).unwrap_or(u16::MAX)
        } else {
            0
        };

        FanState {
            power,
            speed,
            oscillating,
            width,
            direction: Direction::Forward,
            rpm: u32::from(speed) * RPM_PER_LEVEL,
        }
    }
}

impl RawEnvironment {
    fn environment(&self) -> Environment {
        let defaults = Environment::default();

        Environment {
            temperature: parse_float(&self.temperature).unwrap_or(defaults.temperature),
            humidity: parse_float(&self.humidity).unwrap_or(defaults.humidity),
            air_quality: parse_float(&self.air_quality).unwrap_or(defaults.air_quality),
        }
    }
}

fn parse_integer(reading: &Option<String>) -> Option<i64> {
    reading.as_deref()?.trim().parse().ok()
}

fn parse_float(reading: &Option<String>) -> Option<f64> {
    reading
        .as_deref()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
