use std::sync::Arc;

use eyre::Result;
use tokio::{signal, sync::Notify};

use crate::{
    config::Config,
    entity::Entity,
    integration::{Entities, Integration},
};

const ENTRY_ID: &str = "cli";

pub async fn run(path: &str) -> Result<()> {
    let config = Config::load(path).await?;
    let integration = Integration::new(config.coordinator);

    let entities = integration.setup_entry(ENTRY_ID, config.device).await?;

    let Some(coordinator) = integration.coordinator().await else {
        return Ok(());
    };

    tracing::info!(
        "Watching {} every {:?}, press Ctrl+C to stop",
        coordinator.name(),
        coordinator.scan_interval()
    );

    // Registered after the entities, so they are up to date when this fires
    let updated = Arc::new(Notify::new());
    let listener = coordinator.add_listener({
        let updated = updated.clone();
        move || updated.notify_one()
    });

    loop {
        tokio::select! {
            _ = updated.notified() => print(&entities, coordinator.degraded()),
            _ = signal::ctrl_c() => break,
        }
    }

    coordinator.remove_listener(listener);
    integration.unload_entry(ENTRY_ID).await;
    Ok(())
}

fn print(entities: &Entities, degraded: bool) {
    let fan = entities.fan.state();

    let mut line = format!(
        "{}: {} {}% osc={} dir={}",
        entities.fan.name(),
        if fan.on { "on" } else { "off" },
        fan.percentage,
        fan.oscillating,
        fan.direction,
    );

    for sensor in &entities.sensors {
        if let Some(value) = sensor.value() {
            line += &format!(" | {} {value} {}", sensor.kind(), sensor.unit());
        }
    }

    for sensor in &entities.binary_sensors {
        line += &format!(" | {} {}", sensor.kind(), sensor.is_on());
    }

    if degraded {
        line += " (synthetic)";
    }

    println!("{line}");
}
