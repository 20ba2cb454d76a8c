// Ports - Interface definitions (contracts)

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Outcome of a cancellable request. Cancellation is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Data(T),
    Cancelled,
}

impl<T> Fetched<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Fetched::Cancelled)
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Fetched::Data(data) => Some(data),
            Fetched::Cancelled => None,
        }
    }
}

/// Whole resource body with the content type the server reported
#[derive(Debug, Clone, PartialEq)]
pub struct WholeResource {
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Port for byte-range access to a remote media resource
#[async_trait]
pub trait RangeFetchPort: Send + Sync {
    /// Metadata probe (HEAD); failures map to `MetadataUnavailable`
    async fn probe(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Fetched<ResourceMetadata>, DomainError>;

    /// Fetch an inclusive byte range; failures map to `ChunkFetchFailed`
    async fn fetch_range(
        &self,
        url: &Url,
        range: ByteRange,
        cancel: &CancellationToken,
    ) -> Result<Fetched<Bytes>, DomainError>;

    /// Fetch the full body without a range; failures map to `WholeFileFetchFailed`
    async fn fetch_whole(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Fetched<WholeResource>, DomainError>;
}

/// Incremental media buffer fed one chunk at a time.
///
/// `append` resolves once the buffer has finished consuming the chunk. Taking
/// `&mut self` means a second append cannot be issued while one is pending.
#[async_trait]
pub trait MediaBuffer: Send + Sync {
    async fn append(&mut self, chunk: Bytes) -> Result<(), DomainError>;

    /// Signal that no more data will follow
    async fn end_of_stream(&mut self) -> Result<(), DomainError>;

    /// Where the playback element reads this buffer from
    fn locator(&self) -> &str;

    fn content_type(&self) -> &str;

    /// Copy everything appended so far to `dest`, returning the bytes written
    async fn export(&self, dest: &Path) -> Result<u64, DomainError>;
}

/// Port creating incremental media buffers
#[async_trait]
pub trait MediaBufferPort: Send + Sync {
    /// Whether buffers of this content type can be created
    fn is_type_supported(&self, content_type: &str) -> bool;

    /// Create a buffer; failures map to `BufferAppendFailed`
    async fn open(&self, session: &StreamSession) -> Result<Box<dyn MediaBuffer>, DomainError>;
}

/// Port for local blob references (object URLs)
#[async_trait]
pub trait BlobStorePort: Send + Sync {
    /// Materialize a body as a local blob
    async fn create(&self, body: Bytes, content_type: &str) -> Result<BlobHandle, DomainError>;

    /// Release a blob; releasing an unknown handle is a no-op
    async fn revoke(&self, handle: &BlobHandle) -> Result<(), DomainError>;

    /// Copy a blob's body to `dest`, returning the bytes written
    async fn export(&self, handle: &BlobHandle, dest: &Path) -> Result<u64, DomainError>;

    /// Number of blobs currently held
    fn live_count(&self) -> usize;
}

/// Port for the backend video API
#[async_trait]
pub trait BackendPort: Send + Sync {
    /// Ask the backend to download a source URL
    async fn submit_download(&self, source_url: &str) -> Result<DownloadedVideo, DomainError>;

    /// Request a cut/transcode of a time range
    async fn request_cut(
        &self,
        video_id: &VideoId,
        options: &CutOptions,
    ) -> Result<CutResult, DomainError>;

    /// Request an MP3 extraction of a time range
    async fn request_mp3(
        &self,
        video_id: &VideoId,
        range: &CutRange,
    ) -> Result<Mp3Result, DomainError>;

    fn endpoints(&self) -> &BackendEndpoints;
}

/// Callbacks the player exposes to its host
pub trait PlayerHooks: Send + Sync {
    /// Invoked once per session when the resource becomes playable
    fn on_ready(&self) {}

    /// Invoked on every playback time update
    fn on_time_progress(&self, _position: Duration) {}

    /// Invoked whenever the rendered state changes
    fn on_view_changed(&self, _view: &ViewModel) {}
}

/// Hooks that do nothing
pub struct NoopHooks;

impl PlayerHooks for NoopHooks {}

/// Events emitted while a session is driven
pub trait StreamObserver: Send + Sync {
    fn on_state(&self, _session: SessionId, _state: &FeederState) {}

    fn on_progress(&self, _session: SessionId, _percent: u8) {}

    /// Emitted when the playback element can start
    fn on_playable(&self, _session: SessionId, _source: &PlaybackSource) {}

    /// Emitted when the controller surfaces an error
    fn on_error(&self, _session: SessionId, _error: &DomainError, _retryable: bool) {}
}

/// Error banner shown over the player
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBanner {
    pub message: String,
    pub can_retry: bool,
}

/// Rendered player state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewModel {
    pub loading: bool,
    pub progress: u8,
    pub error: Option<ErrorBanner>,
    pub source: Option<PlaybackSource>,
}

impl ViewModel {
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn can_retry(&self) -> bool {
        self.error.as_ref().map(|e| e.can_retry).unwrap_or(false)
    }
}
