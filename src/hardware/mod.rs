pub mod blowcontrol;

pub use blowcontrol::{AvailabilityGate, Cli, CommandRunner};
