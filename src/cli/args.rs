//! CLI argument definitions using clap
//!
//! Commands:
//! - aasregistry search --config <path> [--descriptors <path>]
//! - aasregistry list --config <path> [--descriptors <path>] [--limit n] [--cursor c]
//! - aasregistry explain

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Asset administration shell descriptor registry
#[derive(Parser, Debug)]
#[command(name = "aasregistry")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a search request read from stdin
    Search {
        /// Path to configuration file
        #[arg(long, default_value = "./aasregistry.json")]
        config: PathBuf,

        /// JSON array of shell descriptors to register first
        #[arg(long)]
        descriptors: Option<PathBuf>,
    },

    /// List shell descriptors one cursor page at a time
    List {
        /// Path to configuration file
        #[arg(long, default_value = "./aasregistry.json")]
        config: PathBuf,

        /// JSON array of shell descriptors to register first
        #[arg(long)]
        descriptors: Option<PathBuf>,

        /// Page size
        #[arg(long)]
        limit: Option<usize>,

        /// Cursor returned by the previous page
        #[arg(long)]
        cursor: Option<String>,

        /// Instance, Type or NotApplicable
        #[arg(long)]
        asset_kind: Option<String>,

        #[arg(long)]
        asset_type: Option<String>,
    },

    /// Print the compiled filter and aggregation pipeline of a search request
    Explain,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
