//! Behavior of the public engine types, no broker required.

use std::collections::VecDeque;
use std::time::Duration;

use kafka_scout::{
    run_scan, EngineConfig, MatchFilter, MatchOptions, MatchPattern, PartitionRef, RecordSource,
    ScanRequest, ScannedMessage, StartPosition, StopCondition, TruncationReason, Watermarks,
};
use tokio_util::sync::CancellationToken;

/// Replays a fixed sequence of records, one per poll, then runs dry.
struct ReplaySource {
    records: VecDeque<ScannedMessage>,
}

impl RecordSource for ReplaySource {
    fn poll_record(&mut self, _wait: Duration) -> kafka_scout::Result<Option<ScannedMessage>> {
        Ok(self.records.pop_front())
    }
}

fn message(offset: i64, ts: i64, key: &str, value: &str) -> ScannedMessage {
    ScannedMessage {
        topic: "orders".to_string(),
        partition: 3,
        offset,
        key: Some(key.as_bytes().to_vec()),
        value: Some(value.as_bytes().to_vec()),
        timestamp_ms: Some(ts),
        headers: vec![("trace-id".to_string(), Some(b"abc-123".to_vec()))],
    }
}

#[test]
fn scan_request_builder_produces_valid_requests() {
    let request = ScanRequest::new(
        StartPosition::Offset(100),
        StopCondition::AtOffset(200),
        Duration::from_secs(10),
        Duration::from_millis(100),
        10_000,
    );
    assert!(request.validate().is_ok());

    let request = ScanRequest::new(
        StartPosition::TailRecords(50),
        StopCondition::AfterCount(50),
        Duration::from_secs(5),
        Duration::from_millis(100),
        10_000,
    );
    assert!(request.validate().is_ok());
}

#[test]
fn scan_request_rejects_degenerate_bounds() {
    let request = ScanRequest::new(
        StartPosition::Offset(-1),
        StopCondition::Exhausted,
        Duration::from_secs(1),
        Duration::from_millis(10),
        100,
    );
    assert!(request.validate().is_err());

    let request = ScanRequest::new(
        StartPosition::Offset(0),
        StopCondition::AfterCount(0),
        Duration::from_secs(1),
        Duration::from_millis(10),
        100,
    );
    assert!(request.validate().is_err());
}

#[test]
fn scan_over_a_custom_source_honors_the_offset_window() {
    let records: VecDeque<ScannedMessage> =
        (100..=300).map(|o| message(o, o, "k", "v")).collect();
    let mut source = ReplaySource { records };

    let request = ScanRequest::new(
        StartPosition::Offset(150),
        StopCondition::AtOffset(200),
        Duration::from_secs(5),
        Duration::from_millis(1),
        10_000,
    );
    let result = run_scan(&mut source, &request, &CancellationToken::new());

    assert_eq!(result.truncation, TruncationReason::Completed);
    assert_eq!(result.messages.first().unwrap().offset, 150);
    assert_eq!(result.messages.last().unwrap().offset, 200);
}

#[test]
fn scan_aimed_past_the_head_returns_no_stale_records() {
    // A cursor reset to the low watermark replays old records; none of them
    // fall inside the requested [5000, 6000] window.
    let records: VecDeque<ScannedMessage> =
        (100..=300).map(|o| message(o, o, "k", "v")).collect();
    let mut source = ReplaySource { records };

    let request = ScanRequest::new(
        StartPosition::Offset(5000),
        StopCondition::AtOffset(6000),
        Duration::from_secs(5),
        Duration::from_millis(1),
        10_000,
    );
    let result = run_scan(&mut source, &request, &CancellationToken::new());

    assert_eq!(result.truncation, TruncationReason::StreamExhausted);
    assert!(result.messages.is_empty());
}

#[test]
fn time_windowed_case_insensitive_search_over_a_batch() {
    let options = MatchOptions {
        time_window: Some((1_000, 2_000)),
        ..MatchOptions::default()
    };
    let filter = MatchFilter::compile(
        &MatchPattern::Regex(r"order-\d+ SHIPPED".to_string()),
        options,
    )
    .unwrap();

    let batch = vec![
        message(10, 500, "k1", "order-7 shipped"),   // before window
        message(11, 1_000, "k2", "order-8 shipped"), // window start, inclusive
        message(12, 1_500, "k3", "order-9 pending"), // no pattern match
        message(13, 2_000, "k4", "order-10 Shipped"), // window end, inclusive
        message(14, 2_500, "k5", "order-11 shipped"), // after window
    ];

    let hits: Vec<i64> = batch
        .iter()
        .filter(|m| filter.matches(m))
        .map(|m| m.offset)
        .collect();
    assert_eq!(hits, vec![11, 13]);
}

#[test]
fn header_search_is_opt_in() {
    let msg = message(1, 1_000, "k", "payload");

    let value_only = MatchFilter::compile(
        &MatchPattern::Substring("abc-123".to_string()),
        MatchOptions::default(),
    )
    .unwrap();
    assert!(!value_only.matches(&msg));

    let with_headers = MatchFilter::compile(
        &MatchPattern::Substring("abc-123".to_string()),
        MatchOptions {
            search_headers: true,
            ..MatchOptions::default()
        },
    )
    .unwrap();
    assert!(with_headers.matches(&msg));
}

#[test]
fn invalid_regex_surfaces_as_pattern_error() {
    let result = MatchFilter::compile(
        &MatchPattern::Regex("order-(".to_string()),
        MatchOptions::default(),
    );
    assert!(result.is_err());
}

#[test]
fn watermarks_describe_retained_span() {
    let wm = Watermarks::new(100, 1_100);
    assert_eq!(wm.span(), 1_000);
    assert!(!wm.is_empty());

    let empty = Watermarks::new(42, 42);
    assert_eq!(empty.span(), 0);
    assert!(empty.is_empty());

    let unavailable = Watermarks::unavailable();
    assert!(unavailable.degraded);
    assert!(unavailable.is_empty());
}

#[test]
fn partition_ref_displays_topic_and_partition() {
    let p = PartitionRef::new("orders", 3);
    assert_eq!(p.to_string(), "orders[3]");
}

#[test]
fn config_reports_whether_it_is_usable() {
    assert!(EngineConfig::new("localhost:9092").is_configured());
    assert!(!EngineConfig::new("").is_configured());
}
