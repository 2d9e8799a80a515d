//! Command-line argument definitions for the edgecreator CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the store and the issues to resolve, the
//! output directory, configuration file selection, and logging verbosity.

use clap::Parser;

/// Command-line arguments for the edgecreator tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Root directory of the edge store
    #[arg(help = "Path to the store directory")]
    pub store: String,

    /// Publication code, `country/magazine`
    #[arg(help = "Publication code, e.g. fr/DDD")]
    pub publication: String,

    /// First (or only) issue to resolve
    pub issue: String,

    /// Last issue of a range, inclusive
    #[arg(long)]
    pub to: Option<String>,

    /// Additional issues, when no range is given
    #[arg(long, conflicts_with = "to")]
    pub also: Vec<String>,

    /// Also export the issues around the selection
    #[arg(long)]
    pub surrounding: bool,

    /// Directory receiving the exported documents
    #[arg(short, long, default_value = "out")]
    pub output: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
