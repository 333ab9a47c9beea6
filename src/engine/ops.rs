//! Engine operations
//!
//! The [`Engine`] is the public face of the crate. Every method opens a
//! fresh broker session, does its work, and closes it; there is no state
//! between calls beyond the configuration. Consumer work runs on the
//! blocking pool because `BaseConsumer` polls synchronously; admin and
//! producer calls are natively async.
//!
//! ```text
//!                 Engine
//!                   |
//!     +---------+---+-----+-----------+
//!     |         |         |           |
//!   scans   watermarks  groups    publisher
//!     |         |         |           |
//!     +----+----+    BaseConsumer  FutureProducer
//!          |            AdminClient
//!    BrokerSession
//! ```

use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::EngineConfig;

use super::error::{EngineError, Result};
use super::groups::{self, GroupOffsetEntry, ResetStrategy};
use super::matcher::{MatchFilter, MatchOptions, MatchPattern};
use super::message::{PartitionRef, Watermarks};
use super::publisher::{self, OutboundMessage};
use super::scanner::{
    run_scan, tail_start, ScanRequest, ScanResult, StartPosition, StopCondition, TruncationReason,
};
use super::session::BrokerSession;
use super::watermarks;

/// Stateless handle over one cluster.
///
/// Cheap to clone; every call opens and closes its own broker session.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Low and high watermarks for every partition of `topic`.
    ///
    /// Partitions whose query fails are reported unavailable rather than
    /// failing the listing. An unknown topic is an error.
    pub async fn resolve_watermarks(&self, topic: &str) -> Result<Vec<(PartitionRef, Watermarks)>> {
        let config = self.config.clone();
        let topic = topic.to_string();
        run_blocking(move || {
            let session = BrokerSession::open_scan(&config)?;
            let partitions = watermarks::list_partitions(&session, &topic)?;
            Ok(watermarks::resolve_all(&session, &partitions))
        })
        .await
    }

    /// Watermarks for an explicit partition set, one shared session.
    pub async fn partition_watermarks(
        &self,
        partitions: &[PartitionRef],
    ) -> Result<Vec<(PartitionRef, Watermarks)>> {
        let config = self.config.clone();
        let partitions = partitions.to_vec();
        run_blocking(move || {
            let session = BrokerSession::open_scan(&config)?;
            Ok(watermarks::resolve_all(&session, &partitions))
        })
        .await
    }

    /// Run an arbitrary scan request against one partition.
    pub async fn scan(&self, partition: &PartitionRef, request: ScanRequest) -> Result<ScanResult> {
        self.scan_with(partition, request, CancellationToken::new())
            .await
    }

    /// [`Engine::scan`] with an external cancellation handle. Cancelling
    /// returns the records gathered so far, marked deadline-reached.
    pub async fn scan_with(
        &self,
        partition: &PartitionRef,
        request: ScanRequest,
        cancel: CancellationToken,
    ) -> Result<ScanResult> {
        request.validate()?;
        let config = self.config.clone();
        let partition = partition.clone();
        run_blocking(move || scan_partition(&config, &partition, request, &cancel)).await
    }

    /// Records in `[start_offset, end_offset]`, oldest first.
    ///
    /// Offsets below the low watermark are clamped up to it; an inverted
    /// range after clamping yields an empty result, not an error.
    pub async fn scan_offset_range(
        &self,
        partition: &PartitionRef,
        start_offset: i64,
        end_offset: i64,
    ) -> Result<ScanResult> {
        let request = ScanRequest::new(
            StartPosition::Offset(start_offset),
            StopCondition::AtOffset(end_offset),
            self.config.tunables.range_scan_deadline,
            self.config.tunables.scan_poll_wait,
            self.config.tunables.max_scan_records,
        );
        self.scan(partition, request).await
    }

    /// The newest `count` records of one partition, oldest first.
    pub async fn scan_latest(&self, partition: &PartitionRef, count: usize) -> Result<ScanResult> {
        let request = ScanRequest::new(
            StartPosition::TailRecords(count as i64),
            StopCondition::AfterCount(count),
            self.config.tunables.latest_scan_deadline,
            self.config.tunables.scan_poll_wait,
            self.config.tunables.max_scan_records,
        );
        self.scan(partition, request).await
    }

    /// Up to `count` records at or after `timestamp_ms`, oldest first.
    pub async fn scan_from_timestamp(
        &self,
        partition: &PartitionRef,
        timestamp_ms: i64,
        count: usize,
    ) -> Result<ScanResult> {
        let request = ScanRequest::new(
            StartPosition::Timestamp(timestamp_ms),
            StopCondition::AfterCount(count),
            self.config.tunables.range_scan_deadline,
            self.config.tunables.scan_poll_wait,
            self.config.tunables.max_scan_records,
        );
        self.scan(partition, request).await
    }

    /// Scan everything currently retained on one partition for records
    /// matching `pattern`, bounded by the search deadline and `max_results`.
    pub async fn search(
        &self,
        partition: &PartitionRef,
        pattern: &MatchPattern,
        options: MatchOptions,
        max_results: usize,
    ) -> Result<ScanResult> {
        self.search_with(
            partition,
            pattern,
            options,
            max_results,
            CancellationToken::new(),
        )
        .await
    }

    /// [`Engine::search`] with an external cancellation handle.
    pub async fn search_with(
        &self,
        partition: &PartitionRef,
        pattern: &MatchPattern,
        options: MatchOptions,
        max_results: usize,
        cancel: CancellationToken,
    ) -> Result<ScanResult> {
        let start = match options.time_window {
            Some((from, _)) => StartPosition::Timestamp(from),
            None => StartPosition::Offset(0),
        };
        let filter = MatchFilter::compile(pattern, options)?;
        let request = ScanRequest::new(
            start,
            StopCondition::Exhausted,
            self.config.tunables.search_deadline,
            self.config.tunables.search_poll_wait,
            max_results.min(self.config.tunables.max_scan_records),
        )
        .with_filter(filter);
        self.scan_with(partition, request, cancel).await
    }

    /// Committed offsets and lag for every partition the group tracks.
    pub async fn group_offsets(&self, group_id: &str) -> Result<Vec<GroupOffsetEntry>> {
        let config = self.config.clone();
        let group_id = group_id.to_string();
        run_blocking(move || groups::fetch_group_offsets(&config, &group_id)).await
    }

    /// Rewrite a group's committed offsets on the given partitions.
    ///
    /// Returns the offset committed per partition. The broker rejects this
    /// while the group has live members.
    pub async fn reset_group_offsets(
        &self,
        group_id: &str,
        partitions: &[PartitionRef],
        strategy: ResetStrategy,
    ) -> Result<Vec<(PartitionRef, i64)>> {
        let config = self.config.clone();
        let group_id = group_id.to_string();
        let partitions = partitions.to_vec();
        run_blocking(move || groups::reset_offsets(&config, &group_id, &partitions, strategy)).await
    }

    /// [`Engine::reset_group_offsets`] across every partition of a topic.
    pub async fn reset_group_offsets_for_topic(
        &self,
        group_id: &str,
        topic: &str,
        strategy: ResetStrategy,
    ) -> Result<Vec<(PartitionRef, i64)>> {
        let config = self.config.clone();
        let group_id = group_id.to_string();
        let topic = topic.to_string();
        run_blocking(move || {
            let partitions = {
                let session = BrokerSession::open_scan(&config)?;
                watermarks::list_partitions(&session, &topic)?
            };
            groups::reset_offsets(&config, &group_id, &partitions, strategy)
        })
        .await
    }

    /// Delete a consumer group and its committed offsets.
    pub async fn delete_group(&self, group_id: &str) -> Result<()> {
        groups::delete_group(&self.config, group_id).await
    }

    /// Publish one message and wait for the broker ack.
    pub async fn publish(&self, message: &OutboundMessage) -> Result<(i32, i64)> {
        publisher::publish(&self.config, message).await
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    task::spawn_blocking(work)
        .await
        .map_err(|e| EngineError::Internal(format!("blocking task failed: {}", e)))?
}

/// Resolve the request against live watermarks, seek, and run the loop.
fn scan_partition(
    config: &EngineConfig,
    partition: &PartitionRef,
    request: ScanRequest,
    cancel: &CancellationToken,
) -> Result<ScanResult> {
    let session = BrokerSession::open_scan(config)?;
    let wm = match session.fetch_watermarks(partition) {
        Ok(wm) => wm,
        Err(e) => {
            warn!("watermark query for {} failed, scan degraded: {}", partition, e);
            return Ok(ScanResult::empty(TruncationReason::StreamExhausted, true));
        }
    };
    debug!("scanning {} within {:?}", partition, wm);

    if wm.is_empty() {
        return Ok(ScanResult::empty(TruncationReason::Completed, false));
    }

    let start = match request.start {
        StartPosition::Offset(offset) => offset.max(wm.low),
        StartPosition::TailRecords(count) => tail_start(&wm, count),
        StartPosition::Timestamp(ts) => match session.offset_for_timestamp(partition, ts) {
            Ok(Some(offset)) => offset,
            // Every retained record is older than the requested time.
            Ok(None) => return Ok(ScanResult::empty(TruncationReason::Completed, false)),
            Err(e) => {
                warn!("timestamp lookup for {} failed, scan degraded: {}", partition, e);
                return Ok(ScanResult::empty(TruncationReason::StreamExhausted, true));
            }
        },
    };

    // A range scan aimed past the head has nothing to read. Seeking there
    // anyway would trip the consumer's earliest fallback and replay the
    // partition from the low watermark.
    if start >= wm.high {
        if let StopCondition::AtOffset(_) = request.stop {
            return Ok(ScanResult::empty(TruncationReason::StreamExhausted, false));
        }
    }

    // An open-ended stop becomes a bound to the head observed at entry, so
    // a search never idles at the head burning its budget.
    let request = match request.stop {
        StopCondition::Exhausted => request.with_stop(StopCondition::AtOffset(wm.high - 1)),
        _ => request,
    };

    session.assign_at(partition, start)?;
    let mut source = session.into_source();
    Ok(run_scan(&mut source, &request, cancel))
}
