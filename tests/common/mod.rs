// Shared test utilities: a scripted range fetcher and recording observers
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use url::Url;

use cutstream::adapters::{MemoryBlobStoreAdapter, MemoryMediaBufferAdapter};
use cutstream::app::{ChunkedBufferFeeder, PlaybackFallbackController, PlayerView};
use cutstream::domain::model::{BackendEndpoints, ResourceMetadata};
use cutstream::domain::rules::{ChunkPolicy, RetryPolicy};
use cutstream::ports::*;
use cutstream::*;

pub const MIB: u64 = 1024 * 1024;
pub const BACKEND: &str = "http://backend.test";

/// Deterministic media body of `len` bytes
pub fn media_body(len: u64) -> Bytes {
    (0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into()
}

pub fn stream_url(video: &str) -> Url {
    Url::parse(&format!("{}/api/videos/stream/{}", BACKEND, video)).unwrap()
}

pub fn session(id: u64, video: &str) -> StreamSession {
    StreamSession::new(SessionId(id), VideoId::new(video).unwrap(), stream_url(video))
}

/// Range fetcher serving one in-memory body per URL, with scripted failures
pub struct ScriptedFetcher {
    body: Bytes,
    content_type: Option<String>,
    report_length: bool,
    fail_chunk: Option<usize>,
    short_chunk: Option<usize>,
    block_chunk: Option<(String, usize)>,
    whole_failures: AtomicUsize,
    probes: AtomicUsize,
    wholes: AtomicUsize,
    ranges: Mutex<Vec<(String, ByteRange)>>,
    chunk_calls: Mutex<HashMap<String, usize>>,
    pub blocked: Notify,
}

impl ScriptedFetcher {
    pub fn new(len: u64) -> Self {
        Self {
            body: media_body(len),
            content_type: Some("video/mp4".to_string()),
            report_length: true,
            fail_chunk: None,
            short_chunk: None,
            block_chunk: None,
            whole_failures: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            wholes: AtomicUsize::new(0),
            ranges: Mutex::new(Vec::new()),
            chunk_calls: Mutex::new(HashMap::new()),
            blocked: Notify::new(),
        }
    }

    /// HEAD answers without a Content-Length
    pub fn without_length(mut self) -> Self {
        self.report_length = false;
        self
    }

    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// The n-th range request (1-based) answers 500
    pub fn fail_chunk(mut self, n: usize) -> Self {
        self.fail_chunk = Some(n);
        self
    }

    /// The n-th range request returns one byte less than asked
    pub fn short_chunk(mut self, n: usize) -> Self {
        self.short_chunk = Some(n);
        self
    }

    /// The n-th range request of `video` hangs until cancelled
    pub fn block_chunk(mut self, video: &str, n: usize) -> Self {
        self.block_chunk = Some((video.to_string(), n));
        self
    }

    /// The next `count` whole-file fetches fail with 503
    pub fn fail_whole(self, count: usize) -> Self {
        self.whole_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn body(&self) -> Bytes {
        self.body.clone()
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn wholes(&self) -> usize {
        self.wholes.load(Ordering::SeqCst)
    }

    /// Every range requested, in order
    pub fn ranges(&self) -> Vec<ByteRange> {
        self.ranges.lock().iter().map(|(_, r)| *r).collect()
    }

    pub fn ranges_for(&self, video: &str) -> Vec<ByteRange> {
        self.ranges
            .lock()
            .iter()
            .filter(|(v, _)| v == video)
            .map(|(_, r)| *r)
            .collect()
    }
}

fn video_of(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut s| s.next_back())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl RangeFetchPort for ScriptedFetcher {
    async fn probe(
        &self,
        _url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Fetched<ResourceMetadata>, DomainError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Ok(Fetched::Cancelled);
        }
        Ok(Fetched::Data(ResourceMetadata {
            content_type: self.content_type.clone(),
            total_length: self.report_length.then_some(self.body.len() as u64),
        }))
    }

    async fn fetch_range(
        &self,
        url: &Url,
        range: ByteRange,
        cancel: &CancellationToken,
    ) -> Result<Fetched<Bytes>, DomainError> {
        let video = video_of(url);
        self.ranges.lock().push((video.clone(), range));
        let call = {
            let mut calls = self.chunk_calls.lock();
            let count = calls.entry(video.clone()).or_insert(0);
            *count += 1;
            *count
        };

        if self.block_chunk.as_ref() == Some(&(video, call)) {
            self.blocked.notify_one();
            cancel.cancelled().await;
            return Ok(Fetched::Cancelled);
        }
        if cancel.is_cancelled() {
            return Ok(Fetched::Cancelled);
        }
        if self.fail_chunk == Some(call) {
            return Err(DomainError::ChunkFetchFailed {
                status: Some(500),
                message: "HTTP error! status: 500".to_string(),
            });
        }

        let end = (range.end_inclusive + 1).min(self.body.len() as u64) as usize;
        let mut chunk = self.body.slice(range.start as usize..end);
        if self.short_chunk == Some(call) {
            chunk.truncate(chunk.len() - 1);
        }
        tokio::task::yield_now().await;
        Ok(Fetched::Data(chunk))
    }

    async fn fetch_whole(
        &self,
        _url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Fetched<WholeResource>, DomainError> {
        self.wholes.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Ok(Fetched::Cancelled);
        }
        let failing = self
            .whole_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DomainError::WholeFileFetchFailed {
                status: Some(503),
                message: "Error fetching video: 503 Service Unavailable".to_string(),
            });
        }
        Ok(Fetched::Data(WholeResource {
            body: self.body.clone(),
            content_type: self.content_type.clone(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    State(SessionId, FeederState),
    Progress(SessionId, u8),
    Playable(SessionId, PlaybackSource),
    Error(SessionId, DomainError, bool),
}

/// Observer recording every event it sees
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn states(&self) -> Vec<FeederState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::State(_, state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Progress(_, percent) => Some(percent),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<(DomainError, bool)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(_, error, retryable) => Some((error, retryable)),
                _ => None,
            })
            .collect()
    }

    pub fn playable(&self) -> Vec<PlaybackSource> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Playable(_, source) => Some(source),
                _ => None,
            })
            .collect()
    }
}

impl StreamObserver for RecordingObserver {
    fn on_state(&self, session: SessionId, state: &FeederState) {
        self.events.lock().push(Event::State(session, state.clone()));
    }

    fn on_progress(&self, session: SessionId, percent: u8) {
        self.events.lock().push(Event::Progress(session, percent));
    }

    fn on_playable(&self, session: SessionId, source: &PlaybackSource) {
        self.events.lock().push(Event::Playable(session, source.clone()));
    }

    fn on_error(&self, session: SessionId, error: &DomainError, retryable: bool) {
        self.events
            .lock()
            .push(Event::Error(session, error.clone(), retryable));
    }
}

/// Host hooks counting callbacks
#[derive(Default)]
pub struct RecordingHooks {
    ready: AtomicUsize,
    positions: Mutex<Vec<Duration>>,
    views: Mutex<Vec<ViewModel>>,
}

impl RecordingHooks {
    pub fn ready_count(&self) -> usize {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn positions(&self) -> Vec<Duration> {
        self.positions.lock().clone()
    }

    pub fn views(&self) -> Vec<ViewModel> {
        self.views.lock().clone()
    }
}

impl PlayerHooks for RecordingHooks {
    fn on_ready(&self) {
        self.ready.fetch_add(1, Ordering::SeqCst);
    }

    fn on_time_progress(&self, position: Duration) {
        self.positions.lock().push(position);
    }

    fn on_view_changed(&self, view: &ViewModel) {
        self.views.lock().push(view.clone());
    }
}

pub fn default_policy() -> ChunkPolicy {
    ChunkPolicy::new(2 * MIB, 3).unwrap()
}

/// Player wired to in-memory adapters
pub struct Harness {
    pub fetcher: Arc<ScriptedFetcher>,
    pub buffers: Arc<MemoryMediaBufferAdapter>,
    pub blobs: Arc<MemoryBlobStoreAdapter>,
    pub hooks: Arc<RecordingHooks>,
    pub observer: Arc<RecordingObserver>,
}

impl Harness {
    pub fn new(fetcher: ScriptedFetcher, buffers: MemoryMediaBufferAdapter) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            buffers: Arc::new(buffers),
            blobs: Arc::new(MemoryBlobStoreAdapter::new()),
            hooks: Arc::new(RecordingHooks::default()),
            observer: Arc::new(RecordingObserver::default()),
        }
    }

    pub fn feeder(&self) -> ChunkedBufferFeeder {
        ChunkedBufferFeeder::new(self.fetcher.clone(), self.buffers.clone(), default_policy())
    }

    pub fn fallback(&self) -> PlaybackFallbackController {
        PlaybackFallbackController::new(self.fetcher.clone(), self.blobs.clone(), RetryPolicy::default())
    }

    pub fn player(&self) -> PlayerView {
        PlayerView::new(
            self.feeder(),
            self.fallback(),
            self.blobs.clone(),
            BackendEndpoints::new(BACKEND).unwrap(),
            self.hooks.clone(),
            Some(self.observer.clone()),
        )
    }
}
