use strum::Display;
use tokio::sync::OnceCell;

use super::protocol::CommandRunner;

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum Availability {
    Unknown,
    Available,
    Unavailable,
}

/// Decides once whether the bridge can be used. The result is kept for the
/// lifetime of the gate and never re-probed.
#[derive(Debug, Default)]
pub struct AvailabilityGate {
    probed: OnceCell<bool>,
}

impl AvailabilityGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concurrent callers during the first probe all wait on that same probe.
    pub async fn is_available(&self, runner: &dyn CommandRunner) -> bool {
        *self
            .probed
            .get_or_init(|| async {
                let available = runner.probe().await;
                tracing::info!("BlowControl CLI available: {available}");
                available
            })
            .await
    }

    pub fn status(&self) -> Availability {
        match self.probed.get() {
            None => Availability::Unknown,
            Some(true) => Availability::Available,
            Some(false) => Availability::Unavailable,
        }
    }
}
