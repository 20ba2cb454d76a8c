// Cut-side models - time ranges, cut options and backend results

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Time specification - seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    /// Parse `HH:MM:SS(.ms)`, `MM:SS(.ms)` or plain seconds
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(DomainError::BadArgs("Time cannot be negative".to_string()));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds_part) = match parts.as_slice() {
            [m, s] => (0u32, *m, *s),
            [h, m, s] => {
                let hours = h
                    .parse::<u32>()
                    .map_err(|_| DomainError::BadArgs("Invalid hours format".to_string()))?;
                (hours, *m, *s)
            }
            _ => {
                return Err(DomainError::BadArgs(
                    "Invalid time format. Supported formats: seconds (e.g., 123.45), MM:SS.ms (e.g., 2:30.5), HH:MM:SS.ms (e.g., 1:02:30.5)".to_string(),
                ))
            }
        };

        let minutes = minutes
            .parse::<u32>()
            .map_err(|_| DomainError::BadArgs("Invalid minutes format".to_string()))?;
        let seconds = seconds_part
            .parse::<f64>()
            .map_err(|_| DomainError::BadArgs("Invalid seconds format".to_string()))?;

        if parts.len() == 3 && minutes >= 60 {
            return Err(DomainError::BadArgs("Minutes must be less than 60".to_string()));
        }
        if !(0.0..60.0).contains(&seconds) {
            return Err(DomainError::BadArgs("Seconds must be less than 60".to_string()));
        }

        Ok(Self::from_seconds(
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
        ))
    }

    /// Zero-padded `HH:MM:SS` as the backend expects it; fractions are dropped
    pub fn format_api(&self) -> String {
        let total = self.seconds.max(0.0).floor() as u64;
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let secs = total % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_api())
    }
}

/// Selected portion of a video
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutRange {
    pub start: TimeSpec,
    pub end: TimeSpec,
}

impl CutRange {
    pub fn new(start: TimeSpec, end: TimeSpec) -> Result<Self, DomainError> {
        if start.seconds >= end.seconds {
            return Err(DomainError::BadArgs(format!(
                "Invalid time range: start ({}) must be less than end ({})",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> TimeSpec {
        TimeSpec::from_seconds(self.end.seconds - self.start.seconds)
    }

    /// Reject ranges ending after the known media duration
    pub fn validate_against_duration(&self, duration: f64) -> Result<(), DomainError> {
        if duration > 0.0 && self.end.seconds > duration {
            return Err(DomainError::BadArgs(format!(
                "End time ({}) exceeds video duration ({})",
                self.end,
                TimeSpec::from_seconds(duration)
            )));
        }
        Ok(())
    }
}

/// Container requested for a video cut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Webm,
    Mkv,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().as_str() {
            "mp4" => Ok(OutputFormat::Mp4),
            "webm" => Ok(OutputFormat::Webm),
            "mkv" => Ok(OutputFormat::Mkv),
            other => Err(DomainError::BadArgs(format!(
                "Invalid output format: {}. Valid formats: mp4, webm, mkv",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
            OutputFormat::Mkv => "mkv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a cut yields video or an MP3 extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputKind {
    #[default]
    Video,
    Audio,
}

/// Body of the cut request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CutOptions {
    pub start_time: String,
    pub end_time: String,
    pub format: OutputFormat,
}

impl CutOptions {
    pub fn new(range: &CutRange, format: OutputFormat) -> Self {
        Self {
            start_time: range.start.format_api(),
            end_time: range.end.format_api(),
            format,
        }
    }
}

/// One downloadable rendition reported by the backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoFormat {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub format_note: String,
    #[serde(default, alias = "extension")]
    pub ext: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub filesize: Option<u64>,
}

/// Video metadata shown after a download
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub title: String,
    pub duration: f64,
    pub formats: Vec<VideoFormat>,
    pub thumbnail_url: String,
}

/// Result of submitting a source URL
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadedVideo {
    pub video_id: String,
    pub file_path: String,
    pub info: VideoInfo,
}

/// Result of a video cut
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CutResult {
    pub stream_url: String,
    pub download_url: String,
    pub file_name: String,
}

/// Result of an MP3 extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mp3Result {
    pub download_url: String,
    pub file_name: String,
}
