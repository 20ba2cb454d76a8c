// Business rules - Streaming policy, retry policy and backend message rules

use serde::Deserialize;

use crate::domain::errors::DomainError;
use crate::domain::model::Strategy;

/// Default chunk size for range requests (2 MiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 2 * 1024 * 1024;
/// Default number of chunks loaded before priming ends
pub const DEFAULT_PRIMING_CHUNKS: u32 = 3;
/// Default number of user retries for the whole-file fallback
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Chunk sizing policy of the incremental strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    pub chunk_size: u64,
    pub priming_chunks: u32,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            priming_chunks: DEFAULT_PRIMING_CHUNKS,
        }
    }
}

impl ChunkPolicy {
    pub fn new(chunk_size: u64, priming_chunks: u32) -> Result<Self, DomainError> {
        let policy = Self {
            chunk_size,
            priming_chunks,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.chunk_size == 0 {
            return Err(DomainError::BadArgs("Chunk size cannot be zero".to_string()));
        }
        if self.priming_chunks == 0 {
            return Err(DomainError::BadArgs(
                "Priming chunk count cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bound on user-initiated retries of the whole-file fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// A failure is retryable while the user still has retries left
    pub fn failure_is_retryable(&self, retries_used: u32) -> bool {
        retries_used < self.max_retries
    }
}

/// Error reported by the playback element itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackElementError {
    /// Loading was aborted by the user agent
    Aborted,
    /// Network error while the element was loading
    Network,
    /// The media could not be decoded
    Decode,
    /// The source or its container is not supported
    SourceNotSupported,
}

impl PlaybackElementError {
    pub fn describe(&self) -> &'static str {
        match self {
            PlaybackElementError::Aborted => "playback aborted",
            PlaybackElementError::Network => "network error during playback",
            PlaybackElementError::Decode => "media could not be decoded",
            PlaybackElementError::SourceNotSupported => "media source not supported",
        }
    }
}

/// Decides when a playback element error hands over to the whole-file strategy
pub struct FallbackTrigger;

impl FallbackTrigger {
    /// Only incremental sessions fall back; aborts are not failures.
    pub fn should_fall_back(strategy: Strategy, error: PlaybackElementError) -> bool {
        strategy == Strategy::Incremental && error != PlaybackElementError::Aborted
    }
}

/// Error body returned by the backend
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<Vec<BackendErrorDetail>>,
}

/// Field-level validation error
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendErrorDetail {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Build one human-readable message out of an error body
pub fn compose_error_message(body: &BackendErrorBody, default: &str) -> String {
    let mut message = non_empty(&body.error)
        .or_else(|| non_empty(&body.message))
        .unwrap_or(default)
        .to_string();

    if let Some(details) = &body.details {
        let validation: Vec<&str> = details
            .iter()
            .filter_map(|d| non_empty(&d.msg).or_else(|| non_empty(&d.message)))
            .collect();
        if !validation.is_empty() {
            message.push_str(": ");
            message.push_str(&validation.join("; "));
        }
    }

    message
}

/// Derive a video id from a backend file path (`/videos/abc.mp4` -> `abc`)
pub fn video_id_from_path(path: &str) -> Option<String> {
    let last = path.rsplit('/').next().unwrap_or(path);
    let id = last.split('.').next().unwrap_or(last);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Drop the stray `/undefined/` segment some backend builds emit
pub fn clean_backend_path(path: &str) -> String {
    path.replace("/undefined/", "/")
}

/// Last non-empty path segment, ignoring any query string
pub fn file_name_from_path(path: &str, fallback: &str) -> String {
    let without_query = path.split(['?', '#']).next().unwrap_or(path);
    without_query
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}
