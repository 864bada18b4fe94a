use eyre::{Result, bail};

use crate::{
    config::Config,
    data::Coordinator,
    hardware::blowcontrol::{Availability, Direction},
};

#[derive(Copy, Clone, Debug)]
pub enum Action {
    Power(bool),
    Speed(u8),
    Oscillation(bool),
    Direction(Direction),
}

/// Sends a single command through a short-lived coordinator.
pub async fn send(path: &str, action: Action) -> Result<()> {
    let config = Config::load(path).await?;
    let coordinator = Coordinator::from_config(config.device, &config.coordinator);

    match action {
        Action::Power(on) => coordinator.set_power(on).await?,
        Action::Speed(level) => coordinator.set_speed(level).await?,
        Action::Oscillation(enabled) => coordinator.set_oscillation(enabled).await?,
        Action::Direction(direction) => coordinator.set_direction(direction).await?,
    }

    if coordinator.availability() == Availability::Unavailable {
        bail!("BlowControl CLI not available, {action:?} was not sent");
    }

    tracing::info!("{action:?} sent to {}", coordinator.name());
    Ok(())
}
