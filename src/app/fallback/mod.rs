// Playback fallback controller - whole-file strategy with bounded user retries

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::app::feeder::SessionSlot;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

/// Result of one whole-file attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackOutcome {
    /// The playback element now points at this blob
    Ready(BlobHandle),
    /// Failed; the user may retry
    Retryable(DomainError),
    /// Failed and retries are exhausted
    Terminal(DomainError),
    Cancelled,
}

/// Sole authority on whole-file fallback versus terminal error
pub struct PlaybackFallbackController {
    fetcher: Arc<dyn RangeFetchPort>,
    blobs: Arc<dyn BlobStorePort>,
    retry_policy: RetryPolicy,
}

impl PlaybackFallbackController {
    pub fn new(
        fetcher: Arc<dyn RangeFetchPort>,
        blobs: Arc<dyn BlobStorePort>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            blobs,
            retry_policy,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Abandon the incremental attempt and run the first whole-file fetch
    #[instrument(skip_all, fields(session = %slot.session.id()))]
    pub async fn engage(
        &self,
        slot: &mut SessionSlot,
        cancel: &CancellationToken,
        observer: &dyn StreamObserver,
    ) -> FallbackOutcome {
        if slot.release_buffer() {
            debug!("Released incremental media buffer");
        }
        slot.session.fallback_mut().switch_to_whole_file();
        info!(video_id = %slot.session.video_id(), "Switched to whole-file playback");
        self.attempt(slot, cancel, observer).await
    }

    /// User-initiated retry of the whole-file fetch
    #[instrument(skip_all, fields(session = %slot.session.id()))]
    pub async fn retry(
        &self,
        slot: &mut SessionSlot,
        cancel: &CancellationToken,
        observer: &dyn StreamObserver,
    ) -> FallbackOutcome {
        if slot.session.strategy() != Strategy::WholeFile {
            return FallbackOutcome::Terminal(DomainError::InvalidState(
                "Retry is only available for whole-file playback".to_string(),
            ));
        }
        let used = slot.session.fallback().retry_count();
        if !self.retry_policy.failure_is_retryable(used) {
            return FallbackOutcome::Terminal(DomainError::InvalidState(format!(
                "Retry limit of {} reached",
                self.retry_policy.max_retries
            )));
        }
        let attempt = slot.session.fallback_mut().consume_retry();
        info!(attempt, max = self.retry_policy.max_retries, "Retrying whole-file fetch");
        self.attempt(slot, cancel, observer).await
    }

    async fn attempt(
        &self,
        slot: &mut SessionSlot,
        cancel: &CancellationToken,
        observer: &dyn StreamObserver,
    ) -> FallbackOutcome {
        let url = slot.session.resource_url().clone();
        let whole = match self.fetcher.fetch_whole(&url, cancel).await {
            Ok(Fetched::Data(whole)) => whole,
            Ok(Fetched::Cancelled) => return FallbackOutcome::Cancelled,
            Err(_) if cancel.is_cancelled() => return FallbackOutcome::Cancelled,
            Err(error) => return self.fail(slot, error, observer),
        };

        let content_type = whole
            .content_type
            .unwrap_or_else(|| slot.session.content_type().to_string());
        let handle = match self.blobs.create(whole.body, &content_type).await {
            Ok(handle) => handle,
            Err(error) => return self.fail(slot, error, observer),
        };

        if cancel.is_cancelled() {
            self.release(&handle).await;
            return FallbackOutcome::Cancelled;
        }

        if let Some(superseded) = slot.session.replace_blob(handle.clone()) {
            self.release(&superseded).await;
        }

        let id = slot.session.id();
        let percent = slot.session.complete_progress();
        observer.on_progress(id, percent);
        observer.on_playable(id, &PlaybackSource::Blob(handle.clone()));
        info!(blob = %handle.locator, size = handle.size, "Whole-file playback ready");
        FallbackOutcome::Ready(handle)
    }

    fn fail(
        &self,
        slot: &SessionSlot,
        error: DomainError,
        observer: &dyn StreamObserver,
    ) -> FallbackOutcome {
        let retryable = self
            .retry_policy
            .failure_is_retryable(slot.session.fallback().retry_count());
        warn!(%error, retryable, "Whole-file fetch failed");
        observer.on_error(slot.session.id(), &error, retryable);
        if retryable {
            FallbackOutcome::Retryable(error)
        } else {
            FallbackOutcome::Terminal(error)
        }
    }

    async fn release(&self, handle: &BlobHandle) {
        if let Err(error) = self.blobs.revoke(handle).await {
            warn!(blob = %handle.locator, %error, "Failed to revoke blob");
        }
    }
}
