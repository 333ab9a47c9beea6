//! Consumer-group offsets
//!
//! Reading a group's position is fail-soft: a partition whose end offset
//! cannot be resolved still appears in the listing with a zero end offset.
//! Rewriting a group's position is fail-loud: every committed target must be
//! acknowledged by the broker or the call errors. The broker itself rejects
//! commits for a group with live members, so an active group cannot be
//! silently rewound.
//!
//! The listing and reset logic is written against [`GroupOffsetStore`], the
//! same seam move the scanner makes with `RecordSource`, so the
//! fetch-then-commit flow is testable without a broker.

use rdkafka::admin::AdminOptions;
use rdkafka::consumer::{CommitMode, Consumer};
use rdkafka::error::KafkaError;
use rdkafka::{Offset, TopicPartitionList};
use tracing::{info, warn};

use crate::config::EngineConfig;

use super::constants::INTERNAL_TOPIC_PREFIX;
use super::error::{EngineError, Result};
use super::message::{PartitionRef, Watermarks};
use super::session::{admin_client, BrokerSession};

/// Committed position and lag of one partition within a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOffsetEntry {
    pub group_id: String,
    pub partition: PartitionRef,
    /// Last committed offset, `None` when the group never committed here.
    pub committed: Option<i64>,
    /// High watermark at listing time, zero when unresolvable.
    pub end_offset: i64,
    /// `end_offset - committed`. Negative values are reported as-is; they
    /// mean the log was truncated past the commit.
    pub lag: Option<i64>,
    /// Free-form metadata the group attached to the commit, when any.
    pub metadata: Option<String>,
}

impl GroupOffsetEntry {
    pub(crate) fn build(
        group_id: impl Into<String>,
        partition: PartitionRef,
        committed: Option<i64>,
        end_offset: Option<i64>,
        metadata: Option<String>,
    ) -> Self {
        let end_offset = end_offset.unwrap_or(0);
        let lag = committed.map(|c| end_offset - c);
        Self {
            group_id: group_id.into(),
            partition,
            committed,
            end_offset,
            lag,
            metadata,
        }
    }
}

/// Where an offset reset should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStrategy {
    /// Rewind to the low watermark.
    Earliest,
    /// Jump to the high watermark, skipping everything retained.
    Latest,
    /// Commit this exact offset on every targeted partition.
    ToOffset(i64),
}

impl ResetStrategy {
    pub(crate) fn target_for(&self, watermarks: &Watermarks) -> i64 {
        match self {
            ResetStrategy::Earliest => watermarks.low,
            ResetStrategy::Latest => watermarks.high,
            ResetStrategy::ToOffset(offset) => *offset,
        }
    }
}

/// The seam between the group logic and the broker.
///
/// `committed` yields only partitions the group has a stored offset on,
/// together with any commit metadata.
pub(crate) trait GroupOffsetStore {
    fn committed(&mut self) -> Result<Vec<(PartitionRef, i64, Option<String>)>>;
    fn watermarks(&mut self, partition: &PartitionRef) -> Result<Watermarks>;
    fn commit(&mut self, targets: &[(PartitionRef, i64)]) -> Result<()>;
}

/// List every partition the group has a committed offset on, with lag.
pub(crate) fn list_offsets<S: GroupOffsetStore>(
    store: &mut S,
    group_id: &str,
) -> Result<Vec<GroupOffsetEntry>> {
    let committed = store
        .committed()
        .map_err(|e| group_op_error("group_offsets", e))?;

    let mut entries = Vec::with_capacity(committed.len());
    for (partition, offset, metadata) in committed {
        let end = match store.watermarks(&partition) {
            Ok(wm) => Some(wm.high),
            Err(e) => {
                warn!("end offset for {} unavailable: {}", partition, e);
                None
            }
        };
        entries.push(GroupOffsetEntry::build(
            group_id,
            partition,
            Some(offset),
            end,
            metadata,
        ));
    }
    Ok(entries)
}

/// Commit new offsets for a group on the given partitions.
///
/// Returns one entry per partition with the offset that was committed.
pub(crate) fn apply_reset<S: GroupOffsetStore>(
    store: &mut S,
    group_id: &str,
    partitions: &[PartitionRef],
    strategy: ResetStrategy,
) -> Result<Vec<(PartitionRef, i64)>> {
    if partitions.is_empty() {
        return Err(EngineError::InvalidRequest(
            "offset reset requires at least one partition".to_string(),
        ));
    }
    if let ResetStrategy::ToOffset(offset) = strategy {
        if offset < 0 {
            return Err(EngineError::InvalidRequest(format!(
                "reset target offset must be non-negative, got {}",
                offset
            )));
        }
    }

    let mut targets = Vec::with_capacity(partitions.len());
    for partition in partitions {
        let watermarks = store
            .watermarks(partition)
            .map_err(|e| group_op_error("reset_group_offsets", e))?;
        let target = strategy.target_for(&watermarks);
        // Best-effort bounds check; the broker has the final say.
        if target < watermarks.low || target > watermarks.high {
            warn!(
                "reset target {} for {} is outside [{}, {}]",
                target, partition, watermarks.low, watermarks.high
            );
        }
        targets.push((partition.clone(), target));
    }

    store
        .commit(&targets)
        .map_err(|e| group_op_error("reset_group_offsets", e))?;
    info!(
        "committed {:?} reset for group {} on {} partition(s)",
        strategy,
        group_id,
        targets.len()
    );
    Ok(targets)
}

fn group_op_error(op: &'static str, e: EngineError) -> EngineError {
    match e {
        EngineError::Client(source) => EngineError::broker(op, source),
        other => other,
    }
}

/// Production [`GroupOffsetStore`] over one group-scoped session.
pub(crate) struct BrokerGroupStore {
    session: BrokerSession,
}

impl BrokerGroupStore {
    pub(crate) fn open(config: &EngineConfig, group_id: &str) -> Result<Self> {
        let session = BrokerSession::open_group(config, group_id)?;
        Ok(Self { session })
    }
}

impl GroupOffsetStore for BrokerGroupStore {
    fn committed(&mut self) -> Result<Vec<(PartitionRef, i64, Option<String>)>> {
        let metadata = self
            .session
            .consumer()
            .fetch_metadata(None, self.session.metadata_timeout())?;
        let mut query = TopicPartitionList::new();
        for topic in metadata.topics() {
            if topic.name().starts_with(INTERNAL_TOPIC_PREFIX) {
                continue;
            }
            for partition in topic.partitions() {
                query.add_partition(topic.name(), partition.id());
            }
        }

        let committed = self
            .session
            .consumer()
            .committed_offsets(query, self.session.metadata_timeout())?;

        let mut out = Vec::new();
        for elem in committed.elements() {
            let offset = match elem.offset() {
                Offset::Offset(o) => o,
                _ => continue,
            };
            let meta = elem.metadata();
            let meta = (!meta.is_empty()).then(|| meta.to_string());
            out.push((PartitionRef::new(elem.topic(), elem.partition()), offset, meta));
        }
        Ok(out)
    }

    fn watermarks(&mut self, partition: &PartitionRef) -> Result<Watermarks> {
        self.session.fetch_watermarks(partition)
    }

    fn commit(&mut self, targets: &[(PartitionRef, i64)]) -> Result<()> {
        let mut tpl = TopicPartitionList::new();
        for (partition, target) in targets {
            tpl.add_partition_offset(
                &partition.topic,
                partition.partition,
                Offset::Offset(*target),
            )?;
        }
        self.session.consumer().commit(&tpl, CommitMode::Sync)?;
        Ok(())
    }
}

pub(crate) fn fetch_group_offsets(
    config: &EngineConfig,
    group_id: &str,
) -> Result<Vec<GroupOffsetEntry>> {
    let mut store = BrokerGroupStore::open(config, group_id)?;
    list_offsets(&mut store, group_id)
}

pub(crate) fn reset_offsets(
    config: &EngineConfig,
    group_id: &str,
    partitions: &[PartitionRef],
    strategy: ResetStrategy,
) -> Result<Vec<(PartitionRef, i64)>> {
    let mut store = BrokerGroupStore::open(config, group_id)?;
    apply_reset(&mut store, group_id, partitions, strategy)
}

/// Delete a consumer group. Fails if the group still has live members.
pub(crate) async fn delete_group(config: &EngineConfig, group_id: &str) -> Result<()> {
    let admin = admin_client(config)?;
    let results = admin
        .delete_groups(&[group_id], &AdminOptions::new())
        .await
        .map_err(|e| EngineError::broker("delete_group", e))?;

    for result in results {
        if let Err((group, code)) = result {
            warn!("delete of group {} rejected: {}", group, code);
            return Err(EngineError::broker(
                "delete_group",
                KafkaError::AdminOp(code),
            ));
        }
    }
    info!("deleted consumer group {}", group_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdkafka::types::RDKafkaErrorCode;
    use std::collections::HashMap;

    fn part(p: i32) -> PartitionRef {
        PartitionRef::new("orders", p)
    }

    fn entry(committed: Option<i64>, end: Option<i64>) -> GroupOffsetEntry {
        GroupOffsetEntry::build("g1", part(0), committed, end, None)
    }

    /// In-memory store: fixed watermarks, mutable committed offsets.
    struct InMemoryGroupStore {
        watermarks: HashMap<PartitionRef, Watermarks>,
        committed: HashMap<PartitionRef, i64>,
        fail_commit: bool,
    }

    impl InMemoryGroupStore {
        fn new(entries: &[(PartitionRef, Watermarks, Option<i64>)]) -> Self {
            let mut watermarks = HashMap::new();
            let mut committed = HashMap::new();
            for (partition, wm, offset) in entries {
                watermarks.insert(partition.clone(), *wm);
                if let Some(offset) = offset {
                    committed.insert(partition.clone(), *offset);
                }
            }
            Self {
                watermarks,
                committed,
                fail_commit: false,
            }
        }
    }

    impl GroupOffsetStore for InMemoryGroupStore {
        fn committed(&mut self) -> Result<Vec<(PartitionRef, i64, Option<String>)>> {
            let mut out: Vec<_> = self
                .committed
                .iter()
                .map(|(p, o)| (p.clone(), *o, None))
                .collect();
            out.sort_by_key(|(p, _, _)| p.partition);
            Ok(out)
        }

        fn watermarks(&mut self, partition: &PartitionRef) -> Result<Watermarks> {
            self.watermarks
                .get(partition)
                .copied()
                .ok_or_else(|| EngineError::Internal(format!("no watermarks for {}", partition)))
        }

        fn commit(&mut self, targets: &[(PartitionRef, i64)]) -> Result<()> {
            if self.fail_commit {
                return Err(EngineError::Client(KafkaError::ConsumerCommit(
                    RDKafkaErrorCode::UnknownMemberId,
                )));
            }
            for (partition, target) in targets {
                self.committed.insert(partition.clone(), *target);
            }
            Ok(())
        }
    }

    #[test]
    fn test_lag_is_end_minus_committed() {
        let e = entry(Some(40), Some(100));
        assert_eq!(e.lag, Some(60));
        assert_eq!(e.end_offset, 100);
        assert_eq!(e.group_id, "g1");
    }

    #[test]
    fn test_missing_end_offset_defaults_to_zero() {
        let e = entry(Some(40), None);
        assert_eq!(e.end_offset, 0);
        assert_eq!(e.lag, Some(-40));
    }

    #[test]
    fn test_caught_up_group_has_zero_lag() {
        let e = entry(Some(40), Some(40));
        assert_eq!(e.lag, Some(0));
    }

    #[test]
    fn test_negative_lag_passes_through() {
        let e = entry(Some(150), Some(100));
        assert_eq!(e.lag, Some(-50));
    }

    #[test]
    fn test_uncommitted_partition_has_no_lag() {
        let e = entry(None, Some(100));
        assert_eq!(e.lag, None);
    }

    #[test]
    fn test_entry_carries_commit_metadata() {
        let e = GroupOffsetEntry::build(
            "g1",
            part(0),
            Some(10),
            Some(20),
            Some("consumer-1".to_string()),
        );
        assert_eq!(e.metadata.as_deref(), Some("consumer-1"));
    }

    #[test]
    fn test_reset_targets_follow_watermarks() {
        let wm = Watermarks::new(10, 250);
        assert_eq!(ResetStrategy::Earliest.target_for(&wm), 10);
        assert_eq!(ResetStrategy::Latest.target_for(&wm), 250);
        assert_eq!(ResetStrategy::ToOffset(77).target_for(&wm), 77);
    }

    #[test]
    fn test_reset_to_earliest_then_listing_shows_low_watermark() {
        let partitions = [part(0), part(1)];
        let mut store = InMemoryGroupStore::new(&[
            (part(0), Watermarks::new(10, 100), Some(80)),
            (part(1), Watermarks::new(25, 90), Some(90)),
        ]);

        let targets = apply_reset(&mut store, "g1", &partitions, ResetStrategy::Earliest).unwrap();
        assert_eq!(targets, vec![(part(0), 10), (part(1), 25)]);

        let entries = list_offsets(&mut store, "g1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].committed, Some(10));
        assert_eq!(entries[0].lag, Some(90));
        assert_eq!(entries[1].committed, Some(25));
        assert_eq!(entries[1].lag, Some(65));
    }

    #[test]
    fn test_reset_to_latest_zeroes_lag() {
        let partitions = [part(0)];
        let mut store =
            InMemoryGroupStore::new(&[(part(0), Watermarks::new(10, 100), Some(40))]);

        apply_reset(&mut store, "g1", &partitions, ResetStrategy::Latest).unwrap();

        let entries = list_offsets(&mut store, "g1").unwrap();
        assert_eq!(entries[0].committed, Some(100));
        assert_eq!(entries[0].lag, Some(0));
    }

    #[test]
    fn test_reset_requires_partitions() {
        let mut store = InMemoryGroupStore::new(&[]);
        let result = apply_reset(&mut store, "g1", &[], ResetStrategy::Earliest);
        assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
    }

    #[test]
    fn test_commit_failure_is_wrapped_with_operation() {
        let partitions = [part(0)];
        let mut store =
            InMemoryGroupStore::new(&[(part(0), Watermarks::new(10, 100), Some(40))]);
        store.fail_commit = true;

        let err = apply_reset(&mut store, "g1", &partitions, ResetStrategy::Earliest).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Broker {
                op: "reset_group_offsets",
                ..
            }
        ));
    }
}
