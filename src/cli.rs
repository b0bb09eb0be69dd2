//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// reviewdigest - per-instructor review digests with a local LLM
///
/// Fetch raw review records, aggregate them per course, and summarize
/// each instructor with an Ollama model. Every stage writes flat JSON.
///
/// Examples:
///   reviewdigest fetch --professor "Aric Grossman"
///   reviewdigest fetch --names names.csv
///   reviewdigest prepare --all
///   reviewdigest summarize --professor "Aric Grossman"
///   reviewdigest summarize --all --model llama3.2:latest
///   reviewdigest run --strict
///   reviewdigest init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .reviewdigest.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Root data directory (uses raw/, preprocessed/ and summaries/ inside it)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Ollama model used for summaries
    #[arg(short, long, global = true, env = "REVIEWDIGEST_MODEL")]
    pub model: Option<String>,

    /// Generation service base URL
    #[arg(long, global = true, value_name = "URL", env = "OLLAMA_URL")]
    pub service_url: Option<String>,

    /// Maximum tokens per generated summary
    #[arg(long, global = true, value_name = "TOKENS")]
    pub max_tokens: Option<usize>,

    /// Generation request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Pipeline stage to run.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch raw review records from the review source
    Fetch(FetchArgs),
    /// Turn raw records into aggregates (or legacy review lists)
    Prepare(PrepareArgs),
    /// Summarize preprocessed documents with the generation service
    Summarize(SummarizeArgs),
    /// Prepare every raw record, then summarize everything
    Run(RunArgs),
    /// Generate a default .reviewdigest.toml configuration file
    InitConfig,
}

/// Instructors to fetch.
#[derive(clap::Args, Debug, Clone)]
pub struct FetchArgs {
    /// Instructor full name (repeatable)
    #[arg(long = "professor", value_name = "NAME")]
    pub professors: Vec<String>,

    /// CSV name queue with first_name,last_name columns
    #[arg(long, value_name = "CSV", conflicts_with = "professors")]
    pub names: Option<PathBuf>,
}

/// One instructor or every file in the stage's input directory.
#[derive(clap::Args, Debug, Clone)]
pub struct Target {
    /// Instructor full name (e.g. "Aric Grossman")
    #[arg(long, value_name = "NAME", required_unless_present = "all", conflicts_with = "all")]
    pub professor: Option<String>,

    /// Process every file in the input directory
    #[arg(long)]
    pub all: bool,
}

/// Resolved target selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Single(String),
    All,
}

impl Target {
    pub fn selection(&self) -> Selection {
        match self.professor {
            Some(ref name) if !self.all => Selection::Single(name.clone()),
            _ => Selection::All,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub target: Target,

    /// Write the legacy {professor, reviews} shape instead of aggregates
    #[arg(long)]
    pub legacy: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SummarizeArgs {
    #[command(flatten)]
    pub target: Target,

    /// Exit with code 2 if any file could not be processed
    #[arg(long)]
    pub strict: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Write the legacy {professor, reviews} shape instead of aggregates
    #[arg(long)]
    pub legacy: bool,

    /// Exit with code 2 if any file could not be processed
    #[arg(long)]
    pub strict: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.service_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Service URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.max_tokens == Some(0) {
            return Err("Max tokens must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Command::Fetch(ref fetch) = self.command {
            if fetch.professors.is_empty() && fetch.names.is_none() {
                return Err("Fetch needs --professor <NAME> or --names <CSV>".to_string());
            }
            if let Some(ref names) = fetch.names {
                if !names.is_file() {
                    return Err(format!("Name queue not found: {}", names.display()));
                }
            }
        }

        Ok(())
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
