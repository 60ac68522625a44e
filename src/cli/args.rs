//! Command-line argument parsing for the media cache
//!
//! This module defines the CLI structure using clap derive macros: cache
//! initialization, object and thumbnail retrieval through the cache, cache
//! inspection and housekeeping, and a file-name parser check.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Media Cache - read-through disk cache for remote media files
#[derive(Parser, Debug)]
#[command(
    name = "media_cache",
    version,
    about = "Read-through disk cache for media files and thumbnails in a remote store",
    long_about = "Serves media files and thumbnails from a local disk cache, fetching and caching them from the remote store on a miss.
Concurrent processes can share one cache directory safely."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the cache directories for every media type and thumbnail size
    Init(InitArgs),

    /// Fetch a media file through the cache
    Get(GetArgs),

    /// Fetch a thumbnail through the cache
    Thumb(ThumbArgs),

    /// Cache inspection and housekeeping
    Cache(CacheArgs),

    /// Show how file names map to stable identifiers
    Parse(ParseArgs),
}

/// Arguments for the init command
#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Also write a default configuration file if none exists
    #[arg(long)]
    pub write_config: bool,
}

/// Arguments for the get command
#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    /// Path of the file in the remote store (e.g. "/Pictures/AB1/AB1-3 beach.jpg")
    #[arg(value_name = "REMOTE_PATH")]
    pub remote_path: String,

    /// Write the content to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for the thumb command
#[derive(Args, Debug, Clone)]
pub struct ThumbArgs {
    /// Path of the file in the remote store
    #[arg(value_name = "REMOTE_PATH")]
    pub remote_path: String,

    /// Registered thumbnail size label (e.g. "sm", "md", "lg")
    #[arg(short, long)]
    pub size: String,

    /// Write the thumbnail to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for cache management
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache management actions
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show per-directory usage
    Info,

    /// Remove temp files left behind by interrupted writers
    Sweep {
        /// Minimum age in seconds (defaults to the configured stale age)
        #[arg(long)]
        max_age_secs: Option<u64>,
    },
}

/// Arguments for the parse command
#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    /// File names to parse
    #[arg(required = true, value_name = "NAME")]
    pub names: Vec<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level requested on the command line, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}
