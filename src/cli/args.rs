//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the fetch command
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Source video URL
    #[arg(short, long)]
    pub url: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the preview command
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Video id returned by `fetch`
    #[arg(short, long)]
    pub video: String,

    /// Save the loaded video to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Never prompt for a retry after a failed download
    #[arg(long)]
    pub no_retry: bool,
}

/// Arguments for the cut command
#[derive(Args, Debug)]
pub struct CutArgs {
    /// Video id returned by `fetch`
    #[arg(short, long)]
    pub video: String,

    /// Start time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub start: String,

    /// End time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub end: String,

    /// Output container format
    #[arg(long, default_value = "mp4")]
    pub format: String,

    /// Known video duration in seconds, used to validate the range
    #[arg(long)]
    pub duration: Option<f64>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the mp3 command
#[derive(Args, Debug)]
pub struct Mp3Args {
    /// Video id returned by `fetch`
    #[arg(short, long)]
    pub video: String,

    /// Start time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub start: String,

    /// End time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub end: String,

    /// Known video duration in seconds, used to validate the range
    #[arg(long)]
    pub duration: Option<f64>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the original command
#[derive(Args, Debug)]
pub struct OriginalArgs {
    /// Video id returned by `fetch`
    #[arg(short, long)]
    pub video: String,
}
