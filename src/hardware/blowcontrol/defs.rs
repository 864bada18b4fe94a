use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/* === Definitions === */

/// One invocation of the bridge program, without the program name itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    State,
    Power(Power),
    /// Speed on the device's own 0–10 scale.
    Speed(u8),
    /// Oscillation width in degrees.
    Width(u16),
    /// Airflow direction in degrees.
    Direction(u16),
}

#[derive(
    Copy, Clone, Debug, Default, Deserialize, Display, EnumString, Eq, PartialEq, Serialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Power {
    On,
    #[default]
    Off,
}

#[derive(
    Copy, Clone, Debug, Default, Deserialize, Display, EnumString, Eq, PartialEq, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// Canonical level (0–4) to device level (0–10).
pub const SPEED_TABLE: [(u8, u8); 5] = [(0, 0), (1, 2), (2, 5), (3, 8), (4, 10)];

pub const MAX_LEVEL: u8 = 4;
pub const RPM_PER_LEVEL: u32 = 300;
pub const OSCILLATION_WIDTH: u16 = 180;

/* === Implementations === */

impl Command {
    pub fn args(&self) -> Vec<String> {
        match self {
            Command::State => vec!["state".to_owned(), "--json".to_owned()],
            Command::Power(power) => {
                let arg = if power.is_on() { "on" } else { "off" };
                vec!["power".to_owned(), arg.to_owned()]
            }
            Command::Speed(speed) => vec!["speed".to_owned(), speed.to_string()],
            Command::Width(width) => vec!["width".to_owned(), width.to_string()],
            Command::Direction(degrees) => vec!["direction".to_owned(), degrees.to_string()],
        }
    }

    pub fn oscillation(enabled: bool) -> Self {
        Command::Width(if enabled { OSCILLATION_WIDTH } else { 0 })
    }

    pub fn direction(direction: Direction) -> Self {
        Command::Direction(direction.degrees())
    }

    pub fn speed(level: u8) -> Self {
        Command::Speed(to_external(level))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args().join(" "))
    }
}

impl Power {
    pub fn is_on(self) -> bool {
        self == Power::On
    }
}

impl From<bool> for Power {
    fn from(on: bool) -> Self {
        if on { Power::On } else { Power::Off }
    }
}

impl Direction {
    pub fn degrees(self) -> u16 {
        match self {
            Direction::Forward => 180,
            Direction::Reverse => 0,
        }
    }
}

/* == Speed mapping == */

/// Maps a canonical level to the device scale. Levels outside 0–4 map to 0.
pub fn to_external(level: u8) -> u8 {
    SPEED_TABLE
        .iter()
        .find(|(canonical, _)| *canonical == level)
        .map_or(0, |(_, external)| *external)
}

/// Maps a device level back to the canonical scale. Values without an exact
/// table entry map to 0, there is no interpolation.
pub fn to_canonical(external: i64) -> u8 {
    SPEED_TABLE
        .iter()
        .find(|(_, value)| i64::from(*value) == external)
        .map_or(0, |(canonical, _)| *canonical)
}

pub fn level_to_percentage(level: u8) -> u8 {
    level.min(MAX_LEVEL) * (100 / MAX_LEVEL)
}

pub fn percentage_to_level(percentage: u8) -> u8 {
    let percentage = u32::from(percentage.min(100));
    let levels = u32::from(MAX_LEVEL);

    percentage.saturating_mul(levels).div_ceil(100) as u8
}

pub fn level_name(level: u8) -> &'static str {
    match level {
        0 => "Off",
        1 => "Low",
        2 => "Medium",
        3 => "High",
        4 => "Max",
        _ => "Unknown",
    }
}
