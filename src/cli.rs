//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::report::ReportMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// budget-stats - Budget proposal statistics service
///
/// Aggregates passed budget proposals into per-year statistics by
/// legislator or by government department, serves them over HTTP and
/// publishes them to object storage.
///
/// Examples:
///   budget-stats serve --listen 127.0.0.1:8000
///   budget-stats generate by-legislator --year 2025 --format markdown
///   budget-stats generate by-department --snapshot ./export.json
///   budget-stats publish by-department --timestamped
///   budget-stats init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for budget-stats.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// GraphQL API endpoint URL
    #[arg(
        long,
        value_name = "URL",
        env = "BUDGET_STATS_GRAPHQL_ENDPOINT",
        global = true
    )]
    pub endpoint: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP statistics server
    Serve {
        /// Address to listen on (overrides config)
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,
    },

    /// Compute statistics and write them to a file or stdout
    Generate {
        /// Report breakdown
        #[arg(value_enum)]
        mode: ReportMode,

        /// Restrict to one budget year
        #[arg(long, value_name = "YEAR")]
        year: Option<i32>,

        /// Output format (json, markdown)
        #[arg(long, default_value = "json", value_name = "FORMAT")]
        format: OutputFormat,

        /// Output file path (stdout when omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Read proposals, people and budget years from a JSON export instead of the API
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,
    },

    /// Compute statistics and publish them to the configured storage
    Publish {
        /// Report breakdown
        #[arg(value_enum)]
        mode: ReportMode,

        /// Restrict to one budget year
        #[arg(long, value_name = "YEAR")]
        year: Option<i32>,

        /// Write a timestamped object instead of overwriting `latest`
        #[arg(long)]
        timestamped: bool,

        /// Read proposals, people and budget years from a JSON export instead of the API
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,
    },

    /// Generate a default budget-stats.toml configuration file
    InitConfig,
}

/// Output format for generated reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// Markdown format
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref endpoint) = self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err("Endpoint URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(year) = self.year() {
            if year < 1 {
                return Err("Year must be a positive number".to_string());
            }
        }

        if let Some(snapshot) = self.snapshot() {
            if !snapshot.is_file() {
                return Err(format!("Snapshot file does not exist: {}", snapshot.display()));
            }
        }

        Ok(())
    }

    /// Year filter of the current subcommand, if any.
    pub fn year(&self) -> Option<i32> {
        match &self.command {
            Command::Generate { year, .. } | Command::Publish { year, .. } => *year,
            _ => None,
        }
    }

    /// Snapshot file of the current subcommand, if any.
    pub fn snapshot(&self) -> Option<&PathBuf> {
        match &self.command {
            Command::Generate { snapshot, .. } | Command::Publish { snapshot, .. } => {
                snapshot.as_ref()
            }
            _ => None,
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
