//! Command implementations

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::app::container::{AppContainer, DefaultAppContainer};
use crate::app::{CutOutcome, CutRequest};
use crate::cli::args::{CutArgs, FetchArgs, Mp3Args, OriginalArgs, PreviewArgs};
use crate::domain::model::{OutputFormat, OutputKind, PlaybackSource, VideoId};
use crate::ports::{PlayerHooks, ViewModel};
use crate::utils::logging::{ProgressReporter, ProgressStyle};
use crate::utils::Utils;

/// Execute the fetch command
pub async fn fetch(container: &DefaultAppContainer, args: FetchArgs) -> Result<()> {
    let video = container
        .cut_interactor()
        .submit_url(&args.url)
        .await
        .context("Failed to download video")?;

    if args.json {
        let json = serde_json::to_string_pretty(&video).context("Failed to serialize video info")?;
        println!("{}", json);
        return Ok(());
    }

    println!("Video Information");
    println!("=================");
    println!("Video ID: {}", video.video_id);
    println!("Title: {}", video.info.title);
    println!(
        "Duration: {}",
        Utils::format_duration(Duration::from_secs_f64(video.info.duration.max(0.0)))
    );
    if !video.info.thumbnail_url.is_empty() {
        println!("Thumbnail: {}", video.info.thumbnail_url);
    }
    for format in &video.info.formats {
        let size = format
            .filesize
            .map(Utils::format_file_size)
            .unwrap_or_else(|| "unknown size".to_string());
        println!("  - {} {} {} ({})", format.format_id, format.ext, format.resolution, size);
    }
    Ok(())
}

/// Host callbacks of the terminal preview
struct TerminalHooks;

impl PlayerHooks for TerminalHooks {
    fn on_ready(&self) {
        info!("Video is ready to play");
    }
}

async fn prompt_retry(message: &str) -> Result<bool> {
    eprint!("{}\nRetry? [y/N] ", message);
    std::io::stderr().flush().ok();
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read answer")?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn describe_source(view: &ViewModel) -> String {
    match &view.source {
        Some(PlaybackSource::Incremental { locator, content_type }) => {
            format!("incremental buffer {} ({})", locator, content_type)
        }
        Some(PlaybackSource::Blob(handle)) => format!(
            "whole-file blob {} ({}, {})",
            handle.locator,
            handle.content_type,
            Utils::format_file_size(handle.size)
        ),
        None => "nothing".to_string(),
    }
}

/// Execute the preview command
pub async fn preview(container: &DefaultAppContainer, args: PreviewArgs) -> Result<()> {
    let video_id = VideoId::new(&args.video).context("Invalid video id")?;
    let reporter = Arc::new(ProgressReporter::new(ProgressStyle::Bar));
    let mut player = container.player(Arc::new(TerminalHooks), Some(reporter))?;

    player.load(video_id).await;
    let mut view = player.settled().await;

    while let Some(banner) = view.error.clone() {
        if banner.can_retry && !args.no_retry && prompt_retry(&banner.message).await? {
            player.retry().await.context("Retry failed")?;
            view = player.settled().await;
            continue;
        }
        player.unmount().await;
        anyhow::bail!("Playback failed: {}", banner.message);
    }

    println!("Loaded {} at {}%", describe_source(&view), view.progress);

    if let Some(output) = &args.output {
        match player.export_to(output).await {
            Ok(bytes) => println!(
                "Saved {} to {}",
                Utils::format_file_size(bytes),
                output.display()
            ),
            Err(e) => {
                player.unmount().await;
                return Err(e).context("Failed to save video");
            }
        }
    }

    player.unmount().await;
    Ok(())
}

async fn run_cut(container: &DefaultAppContainer, request: CutRequest, json: bool) -> Result<()> {
    let outcome = container
        .cut_interactor()
        .cut(&request)
        .await
        .context("Failed to process the video")?;

    if json {
        let json = match &outcome {
            CutOutcome::Video(result) => serde_json::to_string_pretty(result),
            CutOutcome::Audio(result) => serde_json::to_string_pretty(result),
        }
        .context("Failed to serialize result")?;
        println!("{}", json);
        return Ok(());
    }

    if let CutOutcome::Video(result) = &outcome {
        println!("Stream URL: {}", result.stream_url);
    }
    println!("Download URL: {}", outcome.download_url());
    println!("File name: {}", outcome.file_name());
    Ok(())
}

/// Execute the cut command
pub async fn cut(container: &DefaultAppContainer, args: CutArgs) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let mut request = CutRequest::parse(&args.video, &args.start, &args.end, OutputKind::Video, format)?;
    if let Some(duration) = args.duration {
        request = request.with_known_duration(duration);
    }
    run_cut(container, request, args.json).await
}

/// Execute the mp3 command
pub async fn mp3(container: &DefaultAppContainer, args: Mp3Args) -> Result<()> {
    let mut request = CutRequest::parse(
        &args.video,
        &args.start,
        &args.end,
        OutputKind::Audio,
        OutputFormat::default(),
    )?;
    if let Some(duration) = args.duration {
        request = request.with_known_duration(duration);
    }
    run_cut(container, request, args.json).await
}

/// Execute the original command
pub fn original(container: &DefaultAppContainer, args: OriginalArgs) -> Result<()> {
    let video_id = VideoId::new(&args.video).context("Invalid video id")?;
    let url = container.cut_interactor().original_url(&video_id);
    if url.scheme() != "https" {
        warn!("Original download is served over plain HTTP");
    }
    println!("{}", url);
    Ok(())
}
