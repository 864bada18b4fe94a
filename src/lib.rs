use std::io;

use eyre::Result;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod config;
pub mod data;
pub mod entity;
pub mod hardware;
pub mod integration;
pub mod misc;

pub use cli::execute as cli;

const DEFAULT_LOG_FILTER: &str = "blowcontrol=info";

pub fn init() -> Result<()> {
    color_eyre::install()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    Ok(())
}
