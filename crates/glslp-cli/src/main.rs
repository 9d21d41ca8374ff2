//! main executable of `glslp`

use clap::Parser as _;
use glslp_cli::Cli;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    cli.command.run()
}
