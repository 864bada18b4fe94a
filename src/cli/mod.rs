use clap::{Parser, Subcommand};
use eyre::Result;

use crate::hardware::blowcontrol::{Direction, Power};

use self::control::Action;

mod config;
mod control;
mod state;
mod watch;

#[derive(Parser)]
#[command(version, about)]
pub struct CliOpts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the parsed configuration
    Config {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },

    /// Poll the device once and print the snapshot as JSON
    State {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },

    /// Keep polling and print every update until interrupted
    Watch {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },

    Power {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
        /// ON or OFF
        state: Power,
    },

    Speed {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
        /// Level from 0 (off) to 4 (max)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=4))]
        level: u8,
    },

    Oscillate {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
        /// ON or OFF
        state: Power,
    },

    Direction {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
        /// forward or reverse
        direction: Direction,
    },
}

#[tokio::main]
pub async fn execute(opts: CliOpts) -> Result<()> {
    match opts.command {
        Command::Config { config } => self::config::read_and_print(&config).await,
        Command::State { config } => self::state::print(&config).await,
        Command::Watch { config } => self::watch::run(&config).await,

        Command::Power { config, state } => {
            self::control::send(&config, Action::Power(state.is_on())).await
        }

        Command::Speed { config, level } => self::control::send(&config, Action::Speed(level)).await,

        Command::Oscillate { config, state } => {
            self::control::send(&config, Action::Oscillation(state.is_on())).await
        }

        Command::Direction { config, direction } => {
            self::control::send(&config, Action::Direction(direction)).await
        }
    }
}
