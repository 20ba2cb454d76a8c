// Domain models - Core types and data structures

use std::fmt;

use url::Url;

use crate::domain::errors::DomainError;

mod cut;
mod endpoints;

pub use cut::*;
pub use endpoints::BackendEndpoints;

/// Content type assumed when the metadata probe does not report one
pub const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

/// Opaque backend identifier of a downloaded video
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Create a video id, rejecting empty values and path separators
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(DomainError::BadArgs("Video id cannot be empty".to_string()));
        }
        if trimmed.contains('/') {
            return Err(DomainError::BadArgs(format!(
                "Video id cannot contain '/': {}",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one playback attempt inside a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inclusive byte range of a remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end_inclusive: u64,
}

impl ByteRange {
    /// Create a range; `start` must not exceed `end_inclusive`
    pub fn new(start: u64, end_inclusive: u64) -> Result<Self, DomainError> {
        if start > end_inclusive {
            return Err(DomainError::BadArgs(format!(
                "Invalid byte range: start ({}) is after end ({})",
                start, end_inclusive
            )));
        }
        Ok(Self {
            start,
            end_inclusive,
        })
    }

    /// Number of bytes covered
    pub fn len(&self) -> u64 {
        self.end_inclusive - self.start + 1
    }

    /// A range always covers at least one byte
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for the HTTP `Range` header
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end_inclusive)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end_inclusive)
    }
}

/// Result of the metadata probe
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceMetadata {
    pub content_type: Option<String>,
    pub total_length: Option<u64>,
}

impl ResourceMetadata {
    /// Content type reported by the probe, or the mp4 default
    pub fn content_type_or_default(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// Total length, treating a missing or zero length as unavailable
    pub fn known_length(&self) -> Result<u64, DomainError> {
        match self.total_length {
            Some(len) if len > 0 => Ok(len),
            _ => Err(DomainError::MetadataUnavailable(
                "Content length not available".to_string(),
            )),
        }
    }
}

/// Chunk schedule of a session whose total length is known.
///
/// The cursor only moves forward, one whole chunk at a time, and never passes
/// `total_length`. The plan is complete exactly when `cursor == total_length`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlan {
    total_length: u64,
    chunk_size: u64,
    priming_chunks: u32,
    cursor: u64,
    chunks_appended: u32,
}

impl ChunkPlan {
    pub fn new(total_length: u64, chunk_size: u64, priming_chunks: u32) -> Result<Self, DomainError> {
        if total_length == 0 {
            return Err(DomainError::MetadataUnavailable(
                "Content length not available".to_string(),
            ));
        }
        if chunk_size == 0 {
            return Err(DomainError::BadArgs("Chunk size cannot be zero".to_string()));
        }
        Ok(Self {
            total_length,
            chunk_size,
            priming_chunks,
            cursor: 0,
            chunks_appended: 0,
        })
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn chunks_appended(&self) -> u32 {
        self.chunks_appended
    }

    /// Number of chunks needed to cover the resource
    pub fn total_chunks(&self) -> u64 {
        self.total_length.div_ceil(self.chunk_size)
    }

    /// Chunks to load before priming is over (never more than the resource has)
    pub fn priming_target(&self) -> u32 {
        let total = self.total_chunks().min(u32::MAX as u64) as u32;
        self.priming_chunks.min(total)
    }

    pub fn is_priming(&self) -> bool {
        self.chunks_appended < self.priming_target()
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.total_length
    }

    /// Next range to fetch, or `None` once complete
    pub fn next_range(&self) -> Option<ByteRange> {
        if self.is_complete() {
            return None;
        }
        let end_exclusive = self
            .cursor
            .saturating_add(self.chunk_size)
            .min(self.total_length);
        Some(ByteRange {
            start: self.cursor,
            end_inclusive: end_exclusive - 1,
        })
    }

    /// Move the cursor past an appended range. Returns the new cursor.
    pub fn advance(&mut self, range: ByteRange) -> Result<u64, DomainError> {
        if range.start != self.cursor {
            return Err(DomainError::InvalidState(format!(
                "Range {} does not start at cursor {}",
                range, self.cursor
            )));
        }
        if range.end_inclusive >= self.total_length {
            return Err(DomainError::InvalidState(format!(
                "Range {} exceeds total length {}",
                range, self.total_length
            )));
        }
        self.cursor = range.end_inclusive + 1;
        self.chunks_appended += 1;
        Ok(self.cursor)
    }
}

/// Whether the media buffer can take another append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferState {
    #[default]
    Ready,
    Busy,
}

/// Playback strategy of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    #[default]
    Incremental,
    WholeFile,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Incremental => write!(f, "incremental"),
            Strategy::WholeFile => write!(f, "whole-file"),
        }
    }
}

/// Strategy and user retry bookkeeping. There is no way back to `Incremental`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FallbackState {
    strategy: Strategy,
    retry_count: u32,
}

impl FallbackState {
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn switch_to_whole_file(&mut self) {
        self.strategy = Strategy::WholeFile;
    }

    /// Record one user-initiated retry
    pub fn consume_retry(&mut self) -> u32 {
        self.retry_count += 1;
        self.retry_count
    }
}

/// Loading percentage; never decreases within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    percent: u8,
}

impl ProgressSnapshot {
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Record `floor(consumed / total * 100)` and return the current value
    pub fn record(&mut self, consumed: u64, total: u64) -> u8 {
        if total == 0 {
            return self.percent;
        }
        let computed = ((consumed as u128 * 100) / total as u128).min(100) as u8;
        if computed > self.percent {
            self.percent = computed;
        }
        self.percent
    }

    pub fn complete(&mut self) -> u8 {
        self.percent = 100;
        self.percent
    }

    pub fn reset(&mut self) {
        self.percent = 0;
    }
}

/// Lifecycle of the chunked feeder for one session
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FeederState {
    #[default]
    Initializing,
    PrimingFirstChunks,
    Streaming,
    Complete,
    Errored(DomainError),
}

impl fmt::Display for FeederState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeederState::Initializing => write!(f, "initializing"),
            FeederState::PrimingFirstChunks => write!(f, "priming"),
            FeederState::Streaming => write!(f, "streaming"),
            FeederState::Complete => write!(f, "complete"),
            FeederState::Errored(e) => write!(f, "errored ({})", e),
        }
    }
}

/// Local reference to a whole-resource blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    pub id: u64,
    pub locator: String,
    pub content_type: String,
    pub size: u64,
}

/// What the playback element is pointed at
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackSource {
    Incremental {
        locator: String,
        content_type: String,
    },
    Blob(BlobHandle),
}

impl PlaybackSource {
    pub fn locator(&self) -> &str {
        match self {
            PlaybackSource::Incremental { locator, .. } => locator,
            PlaybackSource::Blob(handle) => &handle.locator,
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            PlaybackSource::Incremental { .. } => Strategy::Incremental,
            PlaybackSource::Blob(_) => Strategy::WholeFile,
        }
    }
}

/// One attempt to play one remote resource
#[derive(Debug, Clone)]
pub struct StreamSession {
    id: SessionId,
    video_id: VideoId,
    resource_url: Url,
    metadata: Option<ResourceMetadata>,
    plan: Option<ChunkPlan>,
    buffer_state: BufferState,
    fallback: FallbackState,
    progress: ProgressSnapshot,
    state: FeederState,
    blob: Option<BlobHandle>,
}

impl StreamSession {
    pub fn new(id: SessionId, video_id: VideoId, resource_url: Url) -> Self {
        Self {
            id,
            video_id,
            resource_url,
            metadata: None,
            plan: None,
            buffer_state: BufferState::Ready,
            fallback: FallbackState::default(),
            progress: ProgressSnapshot::default(),
            state: FeederState::Initializing,
            blob: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    pub fn resource_url(&self) -> &Url {
        &self.resource_url
    }

    pub fn metadata(&self) -> Option<&ResourceMetadata> {
        self.metadata.as_ref()
    }

    pub fn content_type(&self) -> &str {
        self.metadata
            .as_ref()
            .map(|m| m.content_type_or_default())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// Store the probe result and derive the chunk plan from it
    pub fn attach_metadata(
        &mut self,
        metadata: ResourceMetadata,
        chunk_size: u64,
        priming_chunks: u32,
    ) -> Result<&ChunkPlan, DomainError> {
        let total = metadata.known_length()?;
        let plan = ChunkPlan::new(total, chunk_size, priming_chunks)?;
        self.metadata = Some(metadata);
        Ok(self.plan.insert(plan))
    }

    pub fn plan(&self) -> Option<&ChunkPlan> {
        self.plan.as_ref()
    }

    pub fn plan_mut(&mut self) -> Option<&mut ChunkPlan> {
        self.plan.as_mut()
    }

    pub fn buffer_state(&self) -> BufferState {
        self.buffer_state
    }

    pub fn set_buffer_state(&mut self, state: BufferState) {
        self.buffer_state = state;
    }

    pub fn fallback(&self) -> &FallbackState {
        &self.fallback
    }

    pub fn fallback_mut(&mut self) -> &mut FallbackState {
        &mut self.fallback
    }

    pub fn strategy(&self) -> Strategy {
        self.fallback.strategy()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.progress
    }

    /// Recompute progress from the plan cursor
    pub fn record_progress(&mut self) -> u8 {
        match &self.plan {
            Some(plan) => self.progress.record(plan.cursor(), plan.total_length()),
            None => self.progress.percent(),
        }
    }

    pub fn complete_progress(&mut self) -> u8 {
        self.progress.complete()
    }

    pub fn state(&self) -> &FeederState {
        &self.state
    }

    pub fn set_state(&mut self, state: FeederState) {
        self.state = state;
    }

    pub fn blob(&self) -> Option<&BlobHandle> {
        self.blob.as_ref()
    }

    /// Point the session at a new blob, handing back the superseded one for release
    pub fn replace_blob(&mut self, handle: BlobHandle) -> Option<BlobHandle> {
        self.blob.replace(handle)
    }

    pub fn take_blob(&mut self) -> Option<BlobHandle> {
        self.blob.take()
    }
}

#[cfg(test)]
mod tests;
