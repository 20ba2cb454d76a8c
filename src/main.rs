//! CutStream CLI
//!
//! Command-line client for a video cutting backend with progressive preview.
//!
//! # Features
//!
//! - Backend download of a video from its URL
//! - Chunked range streaming with whole-file fallback and bounded retries
//! - Video cuts and MP3 extraction of a time range
//!
//! # Usage
//!
//! ```bash
//! cutstream fetch --url "https://www.youtube.com/watch?v=..."
//! cutstream preview --video abc123 --output preview.mp4
//! cutstream cut --video abc123 --start 00:01:00 --end 00:02:00 --format webm
//! cutstream mp3 --video abc123 --start 30 --end 90
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use cutstream::app::container::DefaultAppContainer;
use cutstream::cli::{commands, Cli, Commands};
use cutstream::config_initialization::initialize_configuration_hierarchy;
use cutstream::utils::logging::init_logging;

/// Main entry point for the CutStream CLI
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    let settings = initialize_configuration_hierarchy(&cli)?;
    init_logging(&settings.logging).context("Failed to initialize logging")?;
    info!("Starting CutStream {}", env!("CARGO_PKG_VERSION"));

    let container = DefaultAppContainer::new(settings).context("Failed to initialize")?;

    // Execute the requested command
    match cli.command {
        Commands::Fetch(args) => {
            info!("Executing fetch command");
            commands::fetch(&container, args).await?;
        }
        Commands::Preview(args) => {
            info!("Executing preview command");
            commands::preview(&container, args).await?;
        }
        Commands::Cut(args) => {
            info!("Executing cut command");
            commands::cut(&container, args).await?;
        }
        Commands::Mp3(args) => {
            info!("Executing mp3 command");
            commands::mp3(&container, args).await?;
        }
        Commands::Original(args) => {
            commands::original(&container, args)?;
        }
    }

    info!("CutStream completed successfully");
    Ok(())
}
