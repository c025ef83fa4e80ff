//! Command line argument parsing
//!
//! Subcommands:
//! - `analyze`: Analyze one solution file against a problem description
//! - `health`: Probe the configured primary provider
//! - `show-config`: Print the effective configuration (credentials omitted)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "solution-analyzer")]
#[command(author = "Solution Analyzer Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Analyze submitted solutions with AI backends, with retry and provider fallback")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze a solution against a problem description
    Analyze {
        /// Problem description (JSON, camelCase fields)
        #[arg(short = 'p', long = "problem")]
        problem: PathBuf,
        /// Submitted solution source file
        #[arg(short = 's', long = "solution")]
        solution: PathBuf,
        /// Reference documents to include as context (can be used multiple times)
        #[arg(short = 'd', long = "document", value_name = "FILE")]
        documents: Vec<PathBuf>,
        /// Technical parameters to score (JSON array)
        #[arg(long = "parameters", value_name = "FILE")]
        parameters: Option<PathBuf>,
        /// Configuration file path (TOML); environment is used otherwise
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
    /// Check whether the primary provider (or its fallback) is reachable
    Health {
        /// Configuration file path (TOML)
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
    /// Show the effective configuration
    ShowConfig {
        /// Configuration file path (TOML)
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Configuration override shared by every subcommand
    pub fn config_path(&self) -> Option<&PathBuf> {
        match &self.command {
            Commands::Analyze { config, .. }
            | Commands::Health { config }
            | Commands::ShowConfig { config } => config.as_ref(),
        }
    }
}
