//! CLI module for ares-research
//!
//! Provides command-line interface parsing for the `ares-research` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use crate::utils::toml_config::Preset;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ares-research - multi-stage research with delegated workers
///
/// Clarifies the request, writes a research brief, delegates topics to
/// concurrent researchers and synthesizes a markdown report.
#[derive(Parser, Debug)]
#[command(
    name = "ares-research",
    version,
    about = "Multi-stage research orchestration with concurrent researchers",
    after_help = "EXAMPLES:\n    \
                  ares-research init                          # Write a starter research.toml\n    \
                  ares-research run \"state of solid-state batteries\"\n    \
                  ares-research run --preset quick --mock-search \"test query\"\n    \
                  ares-research config                        # Show the resolved configuration"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "research.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a query and print the report
    Run {
        /// The research request
        query: String,

        /// Override the research bounds with a preset
        #[arg(long, value_enum)]
        preset: Option<Preset>,

        /// Skip the clarification stage
        #[arg(long)]
        no_clarify: bool,

        /// Use the deterministic mock search provider
        #[arg(long)]
        mock_search: bool,

        /// Print the full run output as JSON
        #[arg(long)]
        json: bool,

        /// Also write the report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the resolved configuration
    Config,

    /// Write a starter research.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_flags() {
        let cli = Cli::try_parse_from([
            "ares-research",
            "run",
            "heat pumps in cold climates",
            "--preset",
            "quick",
            "--no-clarify",
            "--mock-search",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("research.toml"));
        match cli.command {
            Commands::Run {
                query,
                preset,
                no_clarify,
                mock_search,
                json,
                output,
            } => {
                assert_eq!(query, "heat pumps in cold climates");
                assert_eq!(preset, Some(Preset::Quick));
                assert!(no_clarify);
                assert!(mock_search);
                assert!(!json);
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_query() {
        assert!(Cli::try_parse_from(["ares-research", "run"]).is_err());
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["ares-research", "config", "--config", "other.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(matches!(cli.command, Commands::Config));
    }
}
