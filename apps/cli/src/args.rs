//! # CLI Argument Definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI structure parsing command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "sluice")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Validate and store untrusted uploads under a trusted root")]
pub(crate) struct Cli {
    /// Configuration file (toml, json or yaml). Defaults to `sluice.*` in the working
    /// directory when present; `SLUICE__*` environment variables override either.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub(crate) config: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Print the content signature detected from a file's bytes
    Sniff {
        file: PathBuf,
    },
    /// Check a file against the upload policy without storing it
    Validate {
        file: PathBuf,
        /// Content type the uploader declared
        #[arg(short = 't', long)]
        content_type: String,
        /// Override the configured size limit, in bytes
        #[arg(long, value_name = "BYTES")]
        max_size: Option<u64>,
        /// Override the allowed content types (repeatable)
        #[arg(long = "allow", value_name = "TYPE")]
        allow: Vec<String>,
    },
    /// Store a file's bytes under the upload root with a generated name
    Persist {
        file: PathBuf,
        /// Override the configured upload root
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Validate, then store
    Ingest {
        file: PathBuf,
        #[arg(short = 't', long)]
        content_type: String,
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Remove abandoned temporary files under the upload root
    Purge {
        /// Override the configured staleness threshold, in seconds
        #[arg(long, value_name = "SECS")]
        older_than: Option<u64>,
    },
}
