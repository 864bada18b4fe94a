//! Access to the fan through the `blowcontrol` bridge program, which speaks the
//! device's MQTT protocol on our behalf.

pub use self::{
    defs::{Command, Direction, Power},
    gate::{Availability, AvailabilityGate},
    protocol::{Cli, CommandOutput, CommandRunner, ExecError},
};

pub mod defs;
pub mod gate;
pub mod protocol;

#[cfg(test)]
pub mod mock;
