// Cut interactor - Orchestrates download, cut and MP3 extraction requests

use std::sync::Arc;

use tracing::info;
use url::Url;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Cut or extraction request
#[derive(Debug, Clone, PartialEq)]
pub struct CutRequest {
    pub video_id: VideoId,
    pub range: CutRange,
    pub kind: OutputKind,
    pub format: OutputFormat,
    /// Duration reported at download time, used to bound the range
    pub known_duration: Option<f64>,
}

impl CutRequest {
    /// Build a request from raw time strings
    pub fn parse(
        video_id: &str,
        start: &str,
        end: &str,
        kind: OutputKind,
        format: OutputFormat,
    ) -> Result<Self, DomainError> {
        let start = TimeSpec::parse(start)
            .map_err(|e| DomainError::BadArgs(format!("Invalid start time: {}", e)))?;
        let end = TimeSpec::parse(end)
            .map_err(|e| DomainError::BadArgs(format!("Invalid end time: {}", e)))?;
        Ok(Self {
            video_id: VideoId::new(video_id)?,
            range: CutRange::new(start, end)?,
            kind,
            format,
            known_duration: None,
        })
    }

    pub fn with_known_duration(mut self, duration: f64) -> Self {
        self.known_duration = Some(duration);
        self
    }
}

/// What the backend produced
#[derive(Debug, Clone, PartialEq)]
pub enum CutOutcome {
    Video(CutResult),
    Audio(Mp3Result),
}

impl CutOutcome {
    pub fn download_url(&self) -> &str {
        match self {
            CutOutcome::Video(result) => &result.download_url,
            CutOutcome::Audio(result) => &result.download_url,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            CutOutcome::Video(result) => &result.file_name,
            CutOutcome::Audio(result) => &result.file_name,
        }
    }
}

/// Interactor for the download and cut use cases
pub struct CutInteractor {
    backend: Arc<dyn BackendPort>,
}

impl CutInteractor {
    pub fn new(backend: Arc<dyn BackendPort>) -> Self {
        Self { backend }
    }

    /// Ask the backend to download a source video
    pub async fn submit_url(&self, source_url: &str) -> Result<DownloadedVideo, DomainError> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(DomainError::BadArgs("Please enter a video URL".to_string()));
        }
        let parsed = Url::parse(source_url)
            .map_err(|e| DomainError::BadArgs(format!("Invalid video URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DomainError::BadArgs(format!(
                "Unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let video = self.backend.submit_download(source_url).await?;
        info!(video_id = %video.video_id, title = %video.info.title, duration = video.info.duration, "Video downloaded");
        Ok(video)
    }

    /// Request a cut (video) or MP3 extraction (audio) of a range
    pub async fn cut(&self, request: &CutRequest) -> Result<CutOutcome, DomainError> {
        if let Some(duration) = request.known_duration {
            request.range.validate_against_duration(duration)?;
        }

        info!(
            video_id = %request.video_id,
            start = %request.range.start,
            end = %request.range.end,
            kind = ?request.kind,
            "Starting cut"
        );
        let outcome = match request.kind {
            OutputKind::Video => {
                let options = CutOptions::new(&request.range, request.format);
                CutOutcome::Video(self.backend.request_cut(&request.video_id, &options).await?)
            }
            OutputKind::Audio => CutOutcome::Audio(
                self.backend
                    .request_mp3(&request.video_id, &request.range)
                    .await?,
            ),
        };
        info!(download_url = outcome.download_url(), file_name = outcome.file_name(), "Cut ready");
        Ok(outcome)
    }

    /// Direct download URL of the original file
    pub fn original_url(&self, video_id: &VideoId) -> Url {
        self.backend.endpoints().original(video_id)
    }
}
