// Whole-file fallback and retry bound tests

mod common;

use tokio_util::sync::CancellationToken;

use common::*;
use cutstream::adapters::MemoryMediaBufferAdapter;
use cutstream::app::{FallbackOutcome, FeederOutcome, SessionSlot};
use cutstream::ports::BlobStorePort;
use cutstream::*;

#[tokio::test]
async fn test_append_failure_mid_stream_switches_to_whole_file() {
    let harness = Harness::new(
        ScriptedFetcher::new(10 * MIB),
        MemoryMediaBufferAdapter::new().fail_append_at(3),
    );
    let instrument = harness.buffers.instrument();
    let cancel = CancellationToken::new();
    let mut slot = SessionSlot::new(session(1, "abc"));

    let outcome = harness
        .feeder()
        .run(&mut slot, &cancel, &*harness.observer)
        .await;
    assert!(matches!(outcome, FeederOutcome::Errored(_)));

    let outcome = harness
        .fallback()
        .engage(&mut slot, &cancel, &*harness.observer)
        .await;
    let handle = match outcome {
        FallbackOutcome::Ready(handle) => handle,
        other => panic!("unexpected outcome: {:?}", other),
    };

    assert_eq!(harness.fetcher.wholes(), 1);
    assert_eq!(harness.fetcher.ranges().len(), 3);
    assert_eq!(slot.session.strategy(), Strategy::WholeFile);
    assert!(slot.buffer.is_none());
    assert_eq!(instrument.released(), 1);

    assert_eq!(harness.blobs.live_count(), 1);
    assert_eq!(harness.blobs.body(&handle), Some(harness.fetcher.body()));
    assert_eq!(handle.content_type, "video/mp4");
    assert_eq!(slot.session.blob(), Some(&handle));
    assert_eq!(slot.session.progress().percent(), 100);
    assert_eq!(
        harness.observer.playable().last(),
        Some(&PlaybackSource::Blob(handle))
    );
    assert!(harness.observer.errors().is_empty());
}

#[tokio::test]
async fn test_retries_are_bounded_and_never_automatic() {
    let harness = Harness::new(
        ScriptedFetcher::new(4 * MIB).without_length().fail_whole(3),
        MemoryMediaBufferAdapter::new(),
    );
    let controller = harness.fallback();
    let cancel = CancellationToken::new();
    let observer = &*harness.observer;
    let mut slot = SessionSlot::new(session(1, "abc"));

    harness.feeder().run(&mut slot, &cancel, observer).await;

    let first = controller.engage(&mut slot, &cancel, observer).await;
    assert!(matches!(first, FallbackOutcome::Retryable(_)));
    assert_eq!(harness.fetcher.wholes(), 1);
    assert_eq!(slot.session.fallback().retry_count(), 0);

    let second = controller.retry(&mut slot, &cancel, observer).await;
    assert!(matches!(second, FallbackOutcome::Retryable(_)));
    assert_eq!(slot.session.fallback().retry_count(), 1);

    let third = controller.retry(&mut slot, &cancel, observer).await;
    assert!(matches!(
        third,
        FallbackOutcome::Terminal(DomainError::WholeFileFetchFailed { status: Some(503), .. })
    ));
    assert_eq!(slot.session.fallback().retry_count(), 2);

    let exhausted = controller.retry(&mut slot, &cancel, observer).await;
    assert!(matches!(
        exhausted,
        FallbackOutcome::Terminal(DomainError::InvalidState(_))
    ));
    assert_eq!(harness.fetcher.wholes(), 3);

    let retryable: Vec<bool> = harness.observer.errors().into_iter().map(|(_, r)| r).collect();
    assert_eq!(retryable, vec![true, true, false]);
    assert_eq!(slot.session.strategy(), Strategy::WholeFile);
    assert_eq!(harness.blobs.created(), 0);
}

#[tokio::test]
async fn test_retry_after_failure_recovers() {
    let harness = Harness::new(
        ScriptedFetcher::new(4 * MIB).without_length().fail_whole(1),
        MemoryMediaBufferAdapter::new(),
    );
    let controller = harness.fallback();
    let cancel = CancellationToken::new();
    let observer = &*harness.observer;
    let mut slot = SessionSlot::new(session(1, "abc"));

    assert!(matches!(
        controller.engage(&mut slot, &cancel, observer).await,
        FallbackOutcome::Retryable(_)
    ));
    assert!(matches!(
        controller.retry(&mut slot, &cancel, observer).await,
        FallbackOutcome::Ready(_)
    ));
    assert_eq!(harness.fetcher.wholes(), 2);
    assert_eq!(slot.session.fallback().retry_count(), 1);
    assert_eq!(harness.blobs.live_count(), 1);
}

#[tokio::test]
async fn test_superseded_blob_is_revoked() {
    let harness = Harness::new(ScriptedFetcher::new(MIB), MemoryMediaBufferAdapter::new());
    let controller = harness.fallback();
    let cancel = CancellationToken::new();
    let observer = &*harness.observer;
    let mut slot = SessionSlot::new(session(1, "abc"));

    let first = match controller.engage(&mut slot, &cancel, observer).await {
        FallbackOutcome::Ready(handle) => handle,
        other => panic!("unexpected outcome: {:?}", other),
    };
    let second = match controller.retry(&mut slot, &cancel, observer).await {
        FallbackOutcome::Ready(handle) => handle,
        other => panic!("unexpected outcome: {:?}", other),
    };

    assert_ne!(first.id, second.id);
    assert_eq!(harness.blobs.revoked(), vec![first.id]);
    assert_eq!(harness.blobs.live_count(), 1);
    assert_eq!(slot.session.blob(), Some(&second));
}

#[tokio::test]
async fn test_retry_requires_whole_file_strategy() {
    let harness = Harness::new(ScriptedFetcher::new(MIB), MemoryMediaBufferAdapter::new());
    let mut slot = SessionSlot::new(session(1, "abc"));

    let outcome = harness
        .fallback()
        .retry(&mut slot, &CancellationToken::new(), &*harness.observer)
        .await;

    assert!(matches!(
        outcome,
        FallbackOutcome::Terminal(DomainError::InvalidState(_))
    ));
    assert_eq!(harness.fetcher.wholes(), 0);
    assert_eq!(slot.session.strategy(), Strategy::Incremental);
}

#[tokio::test]
async fn test_cancelled_fallback_reports_nothing() {
    let harness = Harness::new(ScriptedFetcher::new(MIB), MemoryMediaBufferAdapter::new());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut slot = SessionSlot::new(session(1, "abc"));

    let outcome = harness
        .fallback()
        .engage(&mut slot, &cancel, &*harness.observer)
        .await;

    assert_eq!(outcome, FallbackOutcome::Cancelled);
    assert!(harness.observer.events().is_empty());
    assert_eq!(harness.blobs.created(), 0);
    assert!(slot.session.blob().is_none());
}
