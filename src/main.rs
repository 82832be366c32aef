mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use trashcan::config::Config;
use trashcan::observability;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    observability::init_tracing(&config.logging.filter);

    match cli.command {
        Commands::Serve => commands::serve(&config).await?,
        Commands::Archive(args) => commands::archive(&config, &args.path)?,
        Commands::Sweep(args) => commands::sweep(&config, args.days, args.json)?,
    }

    Ok(())
}
