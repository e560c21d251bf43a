mod args;
mod commands;

use anyhow::Result;
use args::{Cli, Command};
use clap::Parser;
use fincheck_logging::init_logging;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::resolve_config(&cli)?;

    init_logging(&config.logging)?;
    info!(
        rules = %config.rules.path.display(),
        strict = config.rules.strict,
        watch = config.rules.watch,
        "Starting fincheck"
    );

    match cli.command {
        Command::Check => print!("{}", commands::check(&config)?),
        Command::Eval { transaction } => println!("{}", commands::eval(&config, &transaction)?),
        Command::Stream => commands::stream(&config).await?,
        Command::Config => print!("{}", config.to_toml_string()?),
    }

    Ok(())
}
