use eyre::Result;

use crate::{
    config::Config,
    data::{Coordinator, Outcome, Source},
};

pub async fn print(path: &str) -> Result<()> {
    let config = Config::load(path).await?;
    let coordinator = Coordinator::from_config(config.device, &config.coordinator);

    if let Outcome::Updated(Source::Synthetic(fallback)) = coordinator.refresh().await? {
        tracing::warn!("Showing synthetic data, the device could not be read ({fallback})");
    }

    if let Some(snapshot) = coordinator.data() {
        println!("{}", serde_json::to_string_pretty(&*snapshot)?);
    }

    Ok(())
}
