//! The bounded scan loop
//!
//! Kafka offers no random access: the only way to a record is to seek near it
//! and poll forward. [`run_scan`] is that loop, bounded by a stop condition
//! (target offset or target count), a hard result cap, and a wall-clock
//! deadline. Whichever fires first tags the result with its
//! [`TruncationReason`], so a partial result is an ordinary, documented
//! outcome rather than an error.
//!
//! The loop is written against the [`RecordSource`] seam instead of a
//! concrete consumer; the production source wraps an rdkafka `BaseConsumer`
//! (see [`session`](super::session)) and tests drive the loop with scripted
//! sources.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::error::{EngineError, Result};
use super::matcher::MatchFilter;
use super::message::{ScannedMessage, Watermarks};

/// Where a scan begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// Seek to an absolute offset
    Offset(i64),
    /// Seek to `max(low, high - n)`: the n most recent records
    TailRecords(i64),
    /// Seek to the first record at or after this epoch-millisecond timestamp
    Timestamp(i64),
}

/// When a scan stops (other than cap or deadline, which always apply).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    /// Stop once a record at or beyond this offset has been processed; the
    /// record at the target offset itself, if present, is included
    AtOffset(i64),
    /// Stop once this many records have been accumulated
    AfterCount(usize),
    /// Run until cap or deadline (used by searches)
    Exhausted,
}

/// Why a scan returned when it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationReason {
    /// The stop condition was satisfied
    Completed,
    /// The result cap was hit before the stop condition
    CountReached,
    /// The wall-clock budget ran out (or the caller canceled)
    DeadlineReached,
    /// An empty poll signaled no more data is currently available
    StreamExhausted,
}

impl std::fmt::Display for TruncationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TruncationReason::Completed => "completed",
            TruncationReason::CountReached => "count-reached",
            TruncationReason::DeadlineReached => "deadline-reached",
            TruncationReason::StreamExhausted => "stream-exhausted",
        };
        f.write_str(s)
    }
}

/// Parameters of one bounded retrieval.
#[derive(Debug)]
pub struct ScanRequest {
    pub start: StartPosition,
    pub stop: StopCondition,
    /// Hard wall-clock budget for the whole scan
    pub budget: Duration,
    /// Wait per poll; short so the loop stays responsive to the budget
    pub poll_wait: Duration,
    /// Hard cap on accumulated records
    pub max_records: usize,
    /// Optional per-record predicate (search scans)
    pub filter: Option<MatchFilter>,
}

impl ScanRequest {
    pub fn new(
        start: StartPosition,
        stop: StopCondition,
        budget: Duration,
        poll_wait: Duration,
        max_records: usize,
    ) -> Self {
        Self {
            start,
            stop,
            budget,
            poll_wait,
            max_records,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: MatchFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub(crate) fn with_stop(mut self, stop: StopCondition) -> Self {
        self.stop = stop;
        self
    }

    /// Reject bad parameters before any broker call is made.
    pub fn validate(&self) -> Result<()> {
        if self.budget.is_zero() {
            return Err(EngineError::InvalidRequest(
                "scan budget must be greater than zero".to_string(),
            ));
        }
        if self.max_records == 0 {
            return Err(EngineError::InvalidRequest(
                "result cap must be greater than zero".to_string(),
            ));
        }
        match self.start {
            StartPosition::Offset(o) if o < 0 => {
                return Err(EngineError::InvalidRequest(format!(
                    "start offset must be non-negative, got {}",
                    o
                )));
            }
            StartPosition::TailRecords(n) if n <= 0 => {
                return Err(EngineError::InvalidRequest(format!(
                    "tail record count must be positive, got {}",
                    n
                )));
            }
            StartPosition::Timestamp(ts) if ts < 0 => {
                return Err(EngineError::InvalidRequest(format!(
                    "start timestamp must be non-negative, got {}",
                    ts
                )));
            }
            _ => {}
        }
        if let StopCondition::AfterCount(0) = self.stop {
            return Err(EngineError::InvalidRequest(
                "target count must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a bounded scan.
#[derive(Debug)]
pub struct ScanResult {
    /// Records in ascending offset order, length ≤ the request's cap
    pub messages: Vec<ScannedMessage>,
    pub truncation: TruncationReason,
    /// True when a connectivity failure was absorbed into this (possibly
    /// empty) result instead of erroring
    pub degraded: bool,
}

impl ScanResult {
    pub(crate) fn new(messages: Vec<ScannedMessage>, truncation: TruncationReason) -> Self {
        Self {
            messages,
            truncation,
            degraded: false,
        }
    }

    /// An empty result for scans that never reached the broker's data.
    pub(crate) fn empty(truncation: TruncationReason, degraded: bool) -> Self {
        Self {
            messages: Vec::new(),
            truncation,
            degraded,
        }
    }

    /// Whether the scan was cut short by cap or deadline.
    pub fn is_partial(&self) -> bool {
        matches!(
            self.truncation,
            TruncationReason::CountReached | TruncationReason::DeadlineReached
        )
    }
}

/// The seam between the scan loop and the broker.
///
/// One call yields at most one record; `None` means nothing arrived within
/// the wait. The production implementation wraps an assigned, pre-seeked
/// rdkafka consumer.
pub trait RecordSource {
    fn poll_record(&mut self, wait: Duration) -> Result<Option<ScannedMessage>>;
}

/// Start offset for a tail-N scan given the partition's watermarks.
pub(crate) fn tail_start(wm: &Watermarks, count: i64) -> i64 {
    (wm.high - count).max(wm.low)
}

/// Drive one bounded scan over `source`.
///
/// Invariants upheld here:
/// - records are appended in poll order, which the broker guarantees is
///   ascending offset order within a partition
/// - for an absolute-offset start, records below the requested offset are
///   never retained, even if the broker's cursor fell back below it
/// - for a target-offset stop, the record at the target offset is included
///   and nothing past it is retained, even when the source has more buffered
/// - the deadline and the cancellation token are checked between polls; an
///   in-flight poll is never aborted
pub fn run_scan<S: RecordSource>(
    source: &mut S,
    request: &ScanRequest,
    cancel: &CancellationToken,
) -> ScanResult {
    let deadline = Instant::now() + request.budget;
    let mut messages: Vec<ScannedMessage> = Vec::new();

    loop {
        let now = Instant::now();
        if cancel.is_cancelled() || now >= deadline {
            return ScanResult::new(messages, TruncationReason::DeadlineReached);
        }

        // Never let a single poll overshoot the overall budget.
        let wait = request.poll_wait.min(deadline - now);

        match source.poll_record(wait) {
            Ok(Some(record)) => {
                let offset = record.offset;

                let in_range = match request.stop {
                    StopCondition::AtOffset(target) => offset <= target,
                    _ => true,
                };
                // A broker-side offset reset can replay records from below
                // the requested start; they are outside the window.
                let above_start = match request.start {
                    StartPosition::Offset(from) => offset >= from,
                    _ => true,
                };
                let accepted = request.filter.as_ref().map_or(true, |f| f.matches(&record));
                if in_range && above_start && accepted {
                    messages.push(record);
                }

                if let StopCondition::AtOffset(target) = request.stop {
                    if offset >= target {
                        return ScanResult::new(messages, TruncationReason::Completed);
                    }
                }
                if let StopCondition::AfterCount(n) = request.stop {
                    if messages.len() >= n {
                        return ScanResult::new(messages, TruncationReason::Completed);
                    }
                }
                if messages.len() >= request.max_records {
                    return ScanResult::new(messages, TruncationReason::CountReached);
                }
            }
            Ok(None) => {
                // An empty poll ends range scans: they seeked forward into
                // contiguous data, so nothing more is currently available.
                // Count scans and searches keep waiting out their budget.
                if matches!(request.stop, StopCondition::AtOffset(_)) {
                    return ScanResult::new(messages, TruncationReason::StreamExhausted);
                }
            }
            Err(e) => {
                warn!("scan poll failed, returning partial result: {}", e);
                let mut result = ScanResult::new(messages, TruncationReason::StreamExhausted);
                result.degraded = true;
                return result;
            }
        }
    }
}
