use clap::Parser;
use eyre::Result;

use blowcontrol::cli::CliOpts;

fn main() -> Result<()> {
    let opts = CliOpts::parse();

    blowcontrol::init()?;
    blowcontrol::cli(opts)
}
