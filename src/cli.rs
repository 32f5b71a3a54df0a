//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Convert proxy configuration documents and subscription feeds.
///
/// Every conversion is cached under a stable id; serving an id returns the
/// cached result and refreshes it from its source in the background.
#[derive(Parser, Debug)]
#[command(name = "subconv")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/subconv/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Artifact database file (default: .subconv/subconv.db)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Fetch timeout for remote sources in seconds (1-3600)
    #[arg(long, global = true, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a structured document into a subscription feed
    Convert(ConvertArgs),

    /// Convert a subscription feed into a complete structured document
    #[command(name = "to-structured")]
    ToStructured(ConvertArgs),

    /// Print the cached feed for an artifact id
    #[command(name = "serve-feed")]
    ServeFeed {
        /// Artifact id
        id: String,
    },

    /// Print the cached document for an artifact id
    #[command(name = "serve-document")]
    ServeDocument {
        /// Artifact id (a trailing `.yaml` is accepted)
        id: String,
    },

    /// List stored artifacts
    List,

    /// Delete artifacts no fingerprint points to any more
    Prune,
}

/// Where a conversion reads its source from. Stdin is used when no flag is
/// given.
#[derive(ClapArgs, Debug)]
pub struct ConvertArgs {
    /// Remote source URL (http or https)
    #[arg(long, conflicts_with_all = ["text", "file"])]
    pub url: Option<String>,

    /// Inline source content
    #[arg(long, conflicts_with = "file")]
    pub text: Option<String>,

    /// Read source content from a file
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Print the converted payload instead of the artifact id
    #[arg(long)]
    pub print: bool,
}
