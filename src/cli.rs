use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "trashcan")]
#[command(about = "Trash can file versioning for a synchronized folder", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $TRASHCAN_CONFIG or config/trashcan.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the background cleanout until interrupted
    Serve,
    /// Move a file into the versions directory
    Archive(ArchiveArgs),
    /// Run one cleanout pass immediately
    Sweep(SweepArgs),
}

#[derive(clap::Args, Debug)]
pub struct ArchiveArgs {
    /// Path relative to the folder root
    pub path: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct SweepArgs {
    /// Override the configured cleanoutDays
    #[arg(long)]
    pub days: Option<u32>,

    /// Print the sweep summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sweep_args() {
        let cli = Cli::try_parse_from(["trashcan", "sweep", "--days", "3", "--json"]).unwrap();
        match cli.command {
            Commands::Sweep(args) => {
                assert_eq!(args.days, Some(3));
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["trashcan", "archive", "a/b.txt", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Archive(ref args) if args.path == PathBuf::from("a/b.txt")));
    }
}
