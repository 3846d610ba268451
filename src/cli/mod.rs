//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "toxiscan",
    version,
    about = "Toxic-comment detection against a remote classifier",
    long_about = "Toxiscan runs the comment-detection pipeline outside the browser: scan a \
                  captured page snapshot for toxic comments, or bulk-submit a file of comments \
                  to the remote detection service."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/toxiscan/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a captured page snapshot and classify every comment on it
    Scan {
        /// Page snapshot JSON file (as recorded by the capture shim)
        file: PathBuf,

        /// Override the platform detected from the snapshot host
        #[arg(short, long)]
        platform: Option<String>,

        /// Print results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Bulk-submit a file of comments (one per line) for classification
    Batch {
        /// Input file, one comment per line
        file: PathBuf,

        /// Platform to attribute the comments to
        #[arg(short, long, default_value = "generic")]
        platform: String,

        /// Print results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_args() {
        let cli = Cli::try_parse_from(["toxiscan", "scan", "page.json", "--json"]).unwrap();
        match cli.command {
            Commands::Scan { file, json, .. } => {
                assert_eq!(file, PathBuf::from("page.json"));
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
