// Unit tests for domain models

use super::*;

const MIB: u64 = 1024 * 1024;

fn test_session() -> StreamSession {
    StreamSession::new(
        SessionId(1),
        VideoId::new("abc123").unwrap(),
        Url::parse("http://localhost:3000/api/videos/stream/abc123").unwrap(),
    )
}

#[test]
fn test_video_id_validation() {
    assert!(VideoId::new("").is_err());
    assert!(VideoId::new("   ").is_err());
    assert!(VideoId::new("a/b").is_err());
    assert_eq!(VideoId::new(" abc ").unwrap().as_str(), "abc");
}

#[test]
fn test_byte_range_header_and_len() {
    let range = ByteRange::new(0, 2 * MIB - 1).unwrap();
    assert_eq!(range.len(), 2 * MIB);
    assert_eq!(range.header_value(), "bytes=0-2097151");
    assert!(ByteRange::new(10, 9).is_err());
    assert_eq!(ByteRange::new(5, 5).unwrap().len(), 1);
}

#[test]
fn test_metadata_defaults() {
    let meta = ResourceMetadata::default();
    assert_eq!(meta.content_type_or_default(), "video/mp4");
    assert!(matches!(
        meta.known_length(),
        Err(DomainError::MetadataUnavailable(_))
    ));

    let zero = ResourceMetadata {
        content_type: Some("video/webm".to_string()),
        total_length: Some(0),
    };
    assert!(zero.known_length().is_err());
    assert_eq!(zero.content_type_or_default(), "video/webm");
}

#[test]
fn test_chunk_plan_walks_ten_mib_in_five_chunks() {
    let mut plan = ChunkPlan::new(10 * MIB, 2 * MIB, 3).unwrap();
    assert_eq!(plan.total_chunks(), 5);
    assert_eq!(plan.priming_target(), 3);

    let mut starts = Vec::new();
    let mut last_cursor = 0;
    while let Some(range) = plan.next_range() {
        starts.push(range.start);
        assert_eq!(range.len(), 2 * MIB);
        let cursor = plan.advance(range).unwrap();
        assert!(cursor > last_cursor);
        assert!(cursor <= plan.total_length());
        last_cursor = cursor;
    }

    assert_eq!(starts, vec![0, 2 * MIB, 4 * MIB, 6 * MIB, 8 * MIB]);
    assert!(plan.is_complete());
    assert_eq!(plan.chunks_appended(), 5);
    assert!(plan.next_range().is_none());
}

#[test]
fn test_chunk_plan_short_last_chunk() {
    let mut plan = ChunkPlan::new(5 * MIB + 7, 2 * MIB, 3).unwrap();
    assert_eq!(plan.total_chunks(), 3);
    for _ in 0..2 {
        let range = plan.next_range().unwrap();
        plan.advance(range).unwrap();
    }
    let last = plan.next_range().unwrap();
    assert_eq!(last.len(), MIB + 7);
    assert_eq!(last.end_inclusive, 5 * MIB + 6);
}

#[test]
fn test_chunk_plan_priming_capped_by_resource() {
    let plan = ChunkPlan::new(MIB, 2 * MIB, 3).unwrap();
    assert_eq!(plan.total_chunks(), 1);
    assert_eq!(plan.priming_target(), 1);
    assert!(plan.is_priming());
}

#[test]
fn test_chunk_plan_rejects_out_of_order_ranges() {
    let mut plan = ChunkPlan::new(10, 4, 1).unwrap();
    let skipped = ByteRange::new(4, 7).unwrap();
    assert!(plan.advance(skipped).is_err());
    assert_eq!(plan.cursor(), 0);

    let past_end = ByteRange::new(0, 10).unwrap();
    assert!(plan.advance(past_end).is_err());
}

#[test]
fn test_chunk_plan_rejects_zero_sizes() {
    assert!(matches!(
        ChunkPlan::new(0, 10, 1),
        Err(DomainError::MetadataUnavailable(_))
    ));
    assert!(matches!(ChunkPlan::new(10, 0, 1), Err(DomainError::BadArgs(_))));
}

#[test]
fn test_progress_is_floored_and_monotonic() {
    let mut progress = ProgressSnapshot::default();
    assert_eq!(progress.record(1, 3), 33);
    assert_eq!(progress.record(2, 3), 66);
    assert_eq!(progress.record(1, 3), 66);
    assert_eq!(progress.record(3, 3), 100);
    progress.reset();
    assert_eq!(progress.percent(), 0);
}

#[test]
fn test_fallback_state_never_reverts() {
    let mut state = FallbackState::default();
    assert_eq!(state.strategy(), Strategy::Incremental);
    state.switch_to_whole_file();
    state.switch_to_whole_file();
    assert_eq!(state.strategy(), Strategy::WholeFile);
    assert_eq!(state.consume_retry(), 1);
    assert_eq!(state.strategy(), Strategy::WholeFile);
}

#[test]
fn test_session_attach_metadata_builds_plan() {
    let mut session = test_session();
    assert_eq!(session.content_type(), "video/mp4");

    let meta = ResourceMetadata {
        content_type: Some("video/webm".to_string()),
        total_length: Some(4 * MIB),
    };
    let plan = session.attach_metadata(meta, 2 * MIB, 3).unwrap();
    assert_eq!(plan.total_chunks(), 2);
    assert_eq!(session.content_type(), "video/webm");

    let range = session.plan().unwrap().next_range().unwrap();
    session.plan_mut().unwrap().advance(range).unwrap();
    assert_eq!(session.record_progress(), 50);
}

#[test]
fn test_session_rejects_missing_length() {
    let mut session = test_session();
    let result = session.attach_metadata(ResourceMetadata::default(), 2 * MIB, 3);
    assert!(matches!(result, Err(DomainError::MetadataUnavailable(_))));
    assert!(session.plan().is_none());
}

#[test]
fn test_session_blob_replacement_returns_previous() {
    let mut session = test_session();
    let first = BlobHandle {
        id: 1,
        locator: "blob:1".to_string(),
        content_type: "video/mp4".to_string(),
        size: 10,
    };
    let second = BlobHandle {
        id: 2,
        ..first.clone()
    };
    assert!(session.replace_blob(first.clone()).is_none());
    assert_eq!(session.replace_blob(second), Some(first));
    assert_eq!(session.take_blob().map(|b| b.id), Some(2));
    assert!(session.blob().is_none());
}

#[test]
fn test_time_spec_parsing() {
    assert_eq!(TimeSpec::parse("90.5").unwrap().as_seconds(), 90.5);
    assert_eq!(TimeSpec::parse("01:30").unwrap().as_seconds(), 90.0);
    assert_eq!(TimeSpec::parse("1:02:03").unwrap().as_seconds(), 3723.0);
    assert!(TimeSpec::parse("-1").is_err());
    assert!(TimeSpec::parse("00:61:00").is_err());
    assert!(TimeSpec::parse("abc").is_err());
}

#[test]
fn test_time_spec_api_format() {
    assert_eq!(TimeSpec::from_seconds(0.0).format_api(), "00:00:00");
    assert_eq!(TimeSpec::from_seconds(59.99).format_api(), "00:00:59");
    assert_eq!(TimeSpec::from_seconds(3723.4).format_api(), "01:02:03");
    assert_eq!(TimeSpec::from_seconds(360000.0).format_api(), "100:00:00");
}

#[test]
fn test_cut_range_validation() {
    let start = TimeSpec::from_seconds(10.0);
    let end = TimeSpec::from_seconds(20.0);
    let range = CutRange::new(start, end).unwrap();
    assert_eq!(range.duration().as_seconds(), 10.0);
    assert!(range.validate_against_duration(20.0).is_ok());
    assert!(range.validate_against_duration(15.0).is_err());
    assert!(CutRange::new(end, start).is_err());
    assert!(CutRange::new(start, start).is_err());
}

#[test]
fn test_cut_options_serialize_like_backend_expects() {
    let range = CutRange::new(TimeSpec::from_seconds(5.0), TimeSpec::from_seconds(65.0)).unwrap();
    let options = CutOptions::new(&range, OutputFormat::Webm);
    let json = serde_json::to_value(&options).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"startTime": "00:00:05", "endTime": "00:01:05", "format": "webm"})
    );
}

#[test]
fn test_endpoints_layout() {
    let endpoints = BackendEndpoints::new("http://localhost:3000").unwrap();
    let id = VideoId::new("vid 1").unwrap();
    assert_eq!(
        endpoints.stream(&id).as_str(),
        "http://localhost:3000/api/videos/stream/vid%201"
    );
    assert_eq!(
        endpoints.download().as_str(),
        "http://localhost:3000/api/videos/download"
    );
    assert_eq!(
        endpoints.original(&id).as_str(),
        "http://localhost:3000/api/videos/download/vid%201"
    );

    let mp3 = endpoints.mp3(
        &VideoId::new("v").unwrap(),
        &TimeSpec::from_seconds(1.0),
        &TimeSpec::from_seconds(61.0),
    );
    assert_eq!(
        mp3.as_str(),
        "http://localhost:3000/api/videos/mp3/v?startTime=00%3A00%3A01&endTime=00%3A01%3A01"
    );
}

#[test]
fn test_endpoints_keep_base_path_prefix() {
    let endpoints = BackendEndpoints::new("https://example.com/backend/").unwrap();
    assert_eq!(
        endpoints.cut(&VideoId::new("x").unwrap()).as_str(),
        "https://example.com/backend/api/videos/cut/x"
    );
    assert_eq!(
        endpoints.absolute("/files/out.mp4").unwrap().as_str(),
        "https://example.com/backend/files/out.mp4"
    );
    assert!(BackendEndpoints::new("ftp://example.com").is_err());
    assert!(BackendEndpoints::new("not a url").is_err());
}
