//! Device state: normalization of bridge readings and the polling coordinator
//! that publishes them.

pub use self::{
    coordinator::{CommandError, Coordinator, ListenerId, Outcome, Phase, Source, UpdateFailed},
    snapshot::Snapshot,
};

pub mod coordinator;
pub mod normalize;
pub mod snapshot;
