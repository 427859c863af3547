//! Command-line interface definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "reel", version, about = "Media ingestion, transcoder discovery and orphan reconciliation")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON), merged over the user configuration.
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level. `RUST_LOG` takes precedence when set.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve the ffmpeg and ffprobe binaries and check they run.
    Detect {
        /// Forget cached paths and search again.
        #[arg(long)]
        redetect: bool,
    },
    /// Probe both binaries and print a JSON health report.
    Health,
    /// Print the compression decisions for an upload.
    Policy {
        /// File size in bytes.
        size: u64,
        /// MIME type, e.g. `image/png`.
        mime: String,
        #[arg(long)]
        transparent: bool,
        #[arg(long)]
        animated: bool,
    },
    /// Find (and by default back up and delete) files the media index doesn't reference.
    Orphans {
        /// Only report what would be removed.
        #[arg(long)]
        dry_run: bool,
        /// Delete without copying to the backup directory first.
        #[arg(long)]
        no_backup: bool,
    },
}
