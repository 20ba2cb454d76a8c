// Chunked buffer feeder - drives one session's media buffer with sequential ranges

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

/// A session together with the media buffer it currently owns
pub struct SessionSlot {
    pub session: StreamSession,
    pub buffer: Option<Box<dyn MediaBuffer>>,
}

impl SessionSlot {
    pub fn new(session: StreamSession) -> Self {
        Self {
            session,
            buffer: None,
        }
    }

    /// Drop the incremental buffer, if any
    pub fn release_buffer(&mut self) -> bool {
        self.buffer.take().is_some()
    }
}

/// How a feeder run ended
#[derive(Debug, Clone, PartialEq)]
pub enum FeederOutcome {
    Complete,
    Errored(DomainError),
    /// The session was torn down; nothing is reported
    Cancelled,
}

/// Feeds a session's media buffer chunk by chunk.
///
/// Chunks are fetched strictly in order and the next fetch only starts once
/// the previous append has resolved, so a session never has more than one
/// outstanding fetch or append. The feeder never retries; failures end the
/// run with `FeederOutcome::Errored`.
pub struct ChunkedBufferFeeder {
    fetcher: Arc<dyn RangeFetchPort>,
    buffers: Arc<dyn MediaBufferPort>,
    policy: ChunkPolicy,
}

impl ChunkedBufferFeeder {
    pub fn new(
        fetcher: Arc<dyn RangeFetchPort>,
        buffers: Arc<dyn MediaBufferPort>,
        policy: ChunkPolicy,
    ) -> Self {
        Self {
            fetcher,
            buffers,
            policy,
        }
    }

    pub fn policy(&self) -> ChunkPolicy {
        self.policy
    }

    /// Run the state machine until the session completes, fails or is cancelled
    #[instrument(skip_all, fields(session = %slot.session.id(), video_id = %slot.session.video_id()))]
    pub async fn run(
        &self,
        slot: &mut SessionSlot,
        cancel: &CancellationToken,
        observer: &dyn StreamObserver,
    ) -> FeederOutcome {
        match self.drive(slot, cancel, observer).await {
            Ok(Fetched::Data(())) => FeederOutcome::Complete,
            Ok(Fetched::Cancelled) => {
                debug!("Feeder cancelled");
                FeederOutcome::Cancelled
            }
            Err(_) if cancel.is_cancelled() => {
                debug!("Feeder failed after cancellation, ignoring");
                FeederOutcome::Cancelled
            }
            Err(error) => {
                warn!(%error, "Incremental streaming failed");
                self.transition(slot, FeederState::Errored(error.clone()), observer);
                FeederOutcome::Errored(error)
            }
        }
    }

    fn transition(&self, slot: &mut SessionSlot, state: FeederState, observer: &dyn StreamObserver) {
        debug!(from = %slot.session.state(), to = %state, "Feeder transition");
        observer.on_state(slot.session.id(), &state);
        slot.session.set_state(state);
    }

    async fn drive(
        &self,
        slot: &mut SessionSlot,
        cancel: &CancellationToken,
        observer: &dyn StreamObserver,
    ) -> Result<Fetched<()>, DomainError> {
        let id = slot.session.id();
        let url = slot.session.resource_url().clone();
        self.transition(slot, FeederState::Initializing, observer);

        let metadata = match self.fetcher.probe(&url, cancel).await? {
            Fetched::Data(metadata) => metadata,
            Fetched::Cancelled => return Ok(Fetched::Cancelled),
        };
        let (total_length, chunks, priming) = {
            let plan = slot.session.attach_metadata(
                metadata,
                self.policy.chunk_size,
                self.policy.priming_chunks,
            )?;
            (plan.total_length(), plan.total_chunks(), plan.priming_target())
        };
        info!(
            total_length,
            chunks,
            priming,
            content_type = slot.session.content_type(),
            "Stream metadata resolved"
        );

        let buffer = self.buffers.open(&slot.session).await?;
        let source = PlaybackSource::Incremental {
            locator: buffer.locator().to_string(),
            content_type: buffer.content_type().to_string(),
        };
        slot.buffer = Some(buffer);
        self.transition(slot, FeederState::PrimingFirstChunks, observer);

        while let Some(range) = slot.session.plan().and_then(ChunkPlan::next_range) {
            let chunk = match self.fetcher.fetch_range(&url, range, cancel).await? {
                Fetched::Data(chunk) => chunk,
                Fetched::Cancelled => return Ok(Fetched::Cancelled),
            };
            if chunk.len() as u64 != range.len() {
                return Err(DomainError::ChunkFetchFailed {
                    status: None,
                    message: format!(
                        "Expected {} bytes for range {}, received {}",
                        range.len(),
                        range,
                        chunk.len()
                    ),
                });
            }
            if cancel.is_cancelled() {
                return Ok(Fetched::Cancelled);
            }

            let buffer = slot
                .buffer
                .as_mut()
                .ok_or_else(|| DomainError::InvalidState("Media buffer was released".to_string()))?;
            slot.session.set_buffer_state(BufferState::Busy);
            let appended = buffer.append(chunk).await;
            slot.session.set_buffer_state(BufferState::Ready);
            appended?;

            let plan = slot
                .session
                .plan_mut()
                .ok_or_else(|| DomainError::InvalidState("Chunk plan missing".to_string()))?;
            let cursor = plan.advance(range)?;
            let appended_count = plan.chunks_appended();
            let priming = plan.is_priming();
            debug!(%range, cursor, chunk = appended_count, "Chunk appended");

            let percent = slot.session.record_progress();
            observer.on_progress(id, percent);
            if appended_count == 1 {
                observer.on_playable(id, &source);
            }
            if !priming && *slot.session.state() == FeederState::PrimingFirstChunks {
                self.transition(slot, FeederState::Streaming, observer);
            }
        }

        if let Some(buffer) = slot.buffer.as_mut() {
            buffer.end_of_stream().await?;
        }
        let percent = slot.session.complete_progress();
        observer.on_progress(id, percent);
        self.transition(slot, FeederState::Complete, observer);
        info!("Incremental stream complete");
        Ok(Fetched::Data(()))
    }
}
