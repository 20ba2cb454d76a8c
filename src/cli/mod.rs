//! CLI module for CutStream
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// CutStream
///
/// Preview videos held by a cutting backend with progressive range streaming,
/// and request cuts or MP3 extractions of a time range.
#[derive(Parser, Debug)]
#[command(name = "cutstream")]
#[command(about = "CutStream - progressive video preview and cutting client")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Config file (default: cutstream.toml, then config/cutstream.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask the backend to download a video from a URL
    Fetch(args::FetchArgs),
    /// Stream a downloaded video, falling back to a whole-file download
    Preview(args::PreviewArgs),
    /// Cut a time range into a new video
    Cut(args::CutArgs),
    /// Extract a time range as MP3
    Mp3(args::Mp3Args),
    /// Print the download URL of the original file
    Original(args::OriginalArgs),
}
