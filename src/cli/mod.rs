//! CLI module for SplitX
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::adapters::SplitterConfig;

pub mod args;
pub mod commands;

pub use args::{PlanArgs, SplitArgs};
pub use commands::CommandStatus;

/// SplitX video splitter
///
/// Splits a video into consecutive fixed-length segments, re-encoding each
/// one with FFmpeg.
#[derive(Parser, Debug)]
#[command(name = "splitx")]
#[command(about = "SplitX - Split a video into fixed-length segments")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit log records as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file (default: splitx.toml, then config/splitx.toml)
    #[arg(long, global = true, env = "SPLITX_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a video into re-encoded segments
    Split(SplitArgs),
    /// Show the segments a split would produce, without writing anything
    Plan(PlanArgs),
}

impl Cli {
    /// Apply command-line settings on top of file and environment configuration
    pub fn apply_overrides(&self, config: &mut SplitterConfig) {
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Commands::Split(args) = &self.command {
            args.apply_to(config);
        }
    }

    /// Whether the command prints its result as JSON on stdout
    pub fn json_output(&self) -> bool {
        match &self.command {
            Commands::Split(args) => args.json,
            Commands::Plan(args) => args.json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_split() {
        let cli = Cli::try_parse_from([
            "splitx",
            "--log-level",
            "debug",
            "split",
            "--input",
            "movie.mp4",
            "--minutes",
            "2.5",
            "--preset",
            "veryfast",
        ])
        .unwrap();

        let mut config = SplitterConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.preset, "veryfast");
        assert_eq!(config.video_codec, "libx264");

        match cli.command {
            Commands::Split(args) => {
                assert_eq!(args.input, Some(PathBuf::from("movie.mp4")));
                assert_eq!(args.minutes, 2.5);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_non_positive_minutes() {
        assert!(Cli::try_parse_from(["splitx", "split", "--minutes", "0"]).is_err());
        assert!(Cli::try_parse_from(["splitx", "plan", "--minutes", "-1"]).is_err());
        assert!(Cli::try_parse_from(["splitx", "plan", "--minutes", "abc"]).is_err());
    }

    #[test]
    fn test_rejects_sub_second_minutes() {
        assert!(Cli::try_parse_from(["splitx", "split", "--minutes", "1e-9"]).is_err());
        assert!(Cli::try_parse_from(["splitx", "plan", "--minutes", "0.01"]).is_err());
        let cli = Cli::try_parse_from(["splitx", "plan", "--minutes", "0.02"]).unwrap();
        assert!(matches!(cli.command, Commands::Plan(PlanArgs { minutes, .. }) if minutes == 0.02));
    }

    #[test]
    fn test_input_is_optional_at_parse_time() {
        let cli = Cli::try_parse_from(["splitx", "split", "--minutes", "1"]).unwrap();
        assert!(matches!(cli.command, Commands::Split(SplitArgs { input: None, .. })));
    }
}
