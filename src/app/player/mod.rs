// Player view - binds the playback element to the active session and reflects its state

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::app::fallback::{FallbackOutcome, PlaybackFallbackController};
use crate::app::feeder::{ChunkedBufferFeeder, FeederOutcome, SessionSlot};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

#[derive(Debug, Default)]
struct ViewState {
    model: ViewModel,
    session: Option<SessionId>,
    ready_fired: bool,
}

/// State shared between the view and the task driving its session
struct PlayerShared {
    feeder: ChunkedBufferFeeder,
    fallback: PlaybackFallbackController,
    blobs: Arc<dyn BlobStorePort>,
    hooks: Arc<dyn PlayerHooks>,
    observer: Option<Arc<dyn StreamObserver>>,
    view: Mutex<ViewState>,
}

impl PlayerShared {
    /// Apply a change for `session`; events from superseded sessions are dropped.
    /// The closure returns whether `on_ready` should fire.
    fn apply(&self, session: SessionId, change: impl FnOnce(&mut ViewState) -> bool) -> bool {
        let (snapshot, fire_ready) = {
            let mut view = self.view.lock();
            if view.session != Some(session) {
                trace!(%session, "Ignoring event from superseded session");
                return false;
            }
            let fire_ready = change(&mut view);
            (view.model.clone(), fire_ready)
        };
        self.hooks.on_view_changed(&snapshot);
        if fire_ready {
            self.hooks.on_ready();
        }
        true
    }

    fn reset(&self, session: Option<SessionId>) {
        let snapshot = {
            let mut view = self.view.lock();
            *view = ViewState {
                model: if session.is_some() {
                    ViewModel::loading()
                } else {
                    ViewModel::default()
                },
                session,
                ready_fired: false,
            };
            view.model.clone()
        };
        self.hooks.on_view_changed(&snapshot);
    }

    /// The element is being re-pointed; show the spinner until the blob is ready
    fn begin_whole_file(&self, session: SessionId) {
        self.apply(session, |view| {
            view.model.loading = true;
            view.model.error = None;
            view.model.source = None;
            false
        });
    }

    fn snapshot(&self) -> ViewModel {
        self.view.lock().model.clone()
    }
}

impl StreamObserver for PlayerShared {
    fn on_state(&self, session: SessionId, state: &FeederState) {
        let current = self.view.lock().session == Some(session);
        if current {
            if let Some(observer) = &self.observer {
                observer.on_state(session, state);
            }
        }
    }

    fn on_progress(&self, session: SessionId, percent: u8) {
        let applied = self.apply(session, |view| {
            view.model.progress = view.model.progress.max(percent);
            false
        });
        if let (true, Some(observer)) = (applied, &self.observer) {
            observer.on_progress(session, percent);
        }
    }

    fn on_playable(&self, session: SessionId, source: &PlaybackSource) {
        let applied = self.apply(session, |view| {
            view.model.source = Some(source.clone());
            view.model.loading = false;
            view.model.error = None;
            !std::mem::replace(&mut view.ready_fired, true)
        });
        if let (true, Some(observer)) = (applied, &self.observer) {
            observer.on_playable(session, source);
        }
    }

    fn on_error(&self, session: SessionId, error: &DomainError, retryable: bool) {
        let applied = self.apply(session, |view| {
            view.model.loading = false;
            view.model.source = None;
            view.model.error = Some(ErrorBanner {
                message: error.to_string(),
                can_retry: retryable,
            });
            false
        });
        if let (true, Some(observer)) = (applied, &self.observer) {
            observer.on_error(session, error, retryable);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Job {
    Stream,
    Fallback,
    Retry,
}

/// The session the view currently owns
struct ActiveSession {
    id: SessionId,
    /// Cancelled when the session is replaced or the view unmounts
    lifetime: CancellationToken,
    /// Child of `lifetime`, cancelled to interrupt only the running task
    task_cancel: CancellationToken,
    slot: Arc<tokio::sync::Mutex<SessionSlot>>,
    task: Option<JoinHandle<()>>,
}

impl ActiveSession {
    async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(session = %self.id, error = %e, "Session task ended abnormally");
            }
        }
    }

    async fn interrupt(&mut self) {
        self.task_cancel.cancel();
        self.join().await;
        self.task_cancel = self.lifetime.child_token();
    }
}

fn spawn_job(shared: &Arc<PlayerShared>, active: &ActiveSession, job: Job) -> JoinHandle<()> {
    let shared = Arc::clone(shared);
    let slot = Arc::clone(&active.slot);
    let cancel = active.task_cancel.clone();
    let session = active.id;

    tokio::spawn(async move {
        let mut slot = slot.lock().await;
        let outcome = match job {
            Job::Stream => match shared.feeder.run(&mut slot, &cancel, &*shared).await {
                FeederOutcome::Errored(error) if error.triggers_fallback() => {
                    info!(%session, %error, "Handing over to whole-file playback");
                    shared.begin_whole_file(session);
                    Some(shared.fallback.engage(&mut slot, &cancel, &*shared).await)
                }
                FeederOutcome::Errored(error) => {
                    warn!(%session, %error, "Streaming stopped without fallback");
                    shared.on_error(session, &error, false);
                    None
                }
                FeederOutcome::Complete | FeederOutcome::Cancelled => None,
            },
            Job::Fallback if slot.session.blob().is_some() => None,
            Job::Fallback => Some(shared.fallback.engage(&mut slot, &cancel, &*shared).await),
            Job::Retry => Some(shared.fallback.retry(&mut slot, &cancel, &*shared).await),
        };
        if let Some(outcome) = outcome {
            match &outcome {
                FallbackOutcome::Ready(handle) => debug!(%session, blob = %handle.locator, "Fallback ready"),
                FallbackOutcome::Cancelled => debug!(%session, "Fallback cancelled"),
                FallbackOutcome::Retryable(_) | FallbackOutcome::Terminal(_) => {
                    debug!(%session, ?outcome, "Fallback failed")
                }
            }
        }
    })
}

/// Binds a playback element to at most one streaming session at a time.
///
/// Supplying a new video cancels and releases the previous session before the
/// new one starts. `unmount` must be awaited to release blobs; dropping the
/// view only cancels in-flight requests.
pub struct PlayerView {
    shared: Arc<PlayerShared>,
    endpoints: BackendEndpoints,
    next_session: u64,
    active: Option<ActiveSession>,
}

impl PlayerView {
    pub fn new(
        feeder: ChunkedBufferFeeder,
        fallback: PlaybackFallbackController,
        blobs: Arc<dyn BlobStorePort>,
        endpoints: BackendEndpoints,
        hooks: Arc<dyn PlayerHooks>,
        observer: Option<Arc<dyn StreamObserver>>,
    ) -> Self {
        Self {
            shared: Arc::new(PlayerShared {
                feeder,
                fallback,
                blobs,
                hooks,
                observer,
                view: Mutex::new(ViewState::default()),
            }),
            endpoints,
            next_session: 0,
            active: None,
        }
    }

    /// Start playing a video, replacing whatever was loaded before
    pub async fn load(&mut self, video_id: VideoId) -> SessionId {
        self.teardown().await;

        self.next_session += 1;
        let id = SessionId(self.next_session);
        let url = self.endpoints.stream(&video_id);
        info!(session = %id, video_id = %video_id, url = %url, "Loading video");

        self.shared.reset(Some(id));
        let lifetime = CancellationToken::new();
        let mut active = ActiveSession {
            id,
            task_cancel: lifetime.child_token(),
            lifetime,
            slot: Arc::new(tokio::sync::Mutex::new(SessionSlot::new(StreamSession::new(
                id, video_id, url,
            )))),
            task: None,
        };
        active.task = Some(spawn_job(&self.shared, &active, Job::Stream));
        self.active = Some(active);
        id
    }

    /// User retry of a failed whole-file fetch
    pub async fn retry(&mut self) -> Result<(), DomainError> {
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| DomainError::InvalidState("No video loaded".to_string()))?;
        active.join().await;
        if !self.shared.snapshot().can_retry() {
            return Err(DomainError::InvalidState(
                "Retry is not available".to_string(),
            ));
        }
        self.shared.begin_whole_file(active.id);
        active.task = Some(spawn_job(&self.shared, active, Job::Retry));
        Ok(())
    }

    /// Error reported by the playback element. Returns whether whole-file playback was engaged.
    pub async fn report_playback_error(&mut self, error: PlaybackElementError) -> bool {
        let strategy = match &self.shared.snapshot().source {
            Some(source) => source.strategy(),
            None => {
                debug!(?error, "Playback error without a source, ignoring");
                return false;
            }
        };
        if !FallbackTrigger::should_fall_back(strategy, error) {
            debug!(?error, %strategy, "Playback error does not trigger fallback");
            return false;
        }
        let Some(active) = self.active.as_mut() else {
            return false;
        };

        warn!(session = %active.id, error = error.describe(), "Playback element failed, switching to whole-file");
        active.interrupt().await;
        self.shared.begin_whole_file(active.id);
        active.task = Some(spawn_job(&self.shared, active, Job::Fallback));
        true
    }

    /// Native playback time update
    pub fn time_update(&self, position: Duration) {
        if self.active.is_some() {
            self.shared.hooks.on_time_progress(position);
        }
    }

    pub fn view(&self) -> ViewModel {
        self.shared.snapshot()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Wait for the running task to finish and return the resulting view
    pub async fn settled(&mut self) -> ViewModel {
        if let Some(active) = self.active.as_mut() {
            active.join().await;
        }
        self.view()
    }

    /// Copy of the active session; waits for the running task
    pub async fn session(&self) -> Option<StreamSession> {
        let active = self.active.as_ref()?;
        let slot = active.slot.lock().await;
        Some(slot.session.clone())
    }

    /// Save what is currently playable (blob, or a completed incremental buffer) to `dest`
    pub async fn export_to(&mut self, dest: &Path) -> Result<u64, DomainError> {
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| DomainError::InvalidState("No video loaded".to_string()))?;
        active.join().await;

        let slot = active.slot.lock().await;
        if let Some(blob) = slot.session.blob() {
            return self.shared.blobs.export(blob, dest).await;
        }
        match (&slot.buffer, slot.session.state()) {
            (Some(buffer), FeederState::Complete) => buffer.export(dest).await,
            _ => Err(DomainError::InvalidState(
                "Nothing complete to export".to_string(),
            )),
        }
    }

    /// Cancel in-flight requests and release the buffer and blob
    pub async fn unmount(&mut self) {
        self.teardown().await;
        self.shared.reset(None);
    }

    async fn teardown(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        active.lifetime.cancel();
        active.join().await;

        let mut slot = active.slot.lock().await;
        slot.release_buffer();
        if let Some(blob) = slot.session.take_blob() {
            if let Err(error) = self.shared.blobs.revoke(&blob).await {
                warn!(session = %active.id, blob = %blob.locator, %error, "Failed to revoke blob");
            }
        }
        debug!(session = %active.id, "Session released");
    }
}

impl Drop for PlayerView {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.lifetime.cancel();
        }
    }
}
