//! Watermark resolution
//!
//! Watermark reads are fail-soft: a partition whose query fails is reported
//! as unavailable and flagged degraded instead of failing the whole call.
//! Enumerating a topic's partitions is fail-loud, since nothing useful can
//! be said about a topic the cluster does not know.

use rdkafka::consumer::Consumer;
use tracing::warn;

use super::error::{EngineError, Result};
use super::message::{PartitionRef, Watermarks};
use super::session::BrokerSession;

/// All partition ids of `topic`, in broker order.
pub(crate) fn list_partitions(session: &BrokerSession, topic: &str) -> Result<Vec<PartitionRef>> {
    let metadata = session
        .consumer()
        .fetch_metadata(Some(topic), session.metadata_timeout())?;

    let topic_meta = metadata
        .topics()
        .iter()
        .find(|t| t.name() == topic)
        .ok_or_else(|| EngineError::TopicNotFound(topic.to_string()))?;
    if topic_meta.partitions().is_empty() {
        return Err(EngineError::TopicNotFound(topic.to_string()));
    }

    Ok(topic_meta
        .partitions()
        .iter()
        .map(|p| PartitionRef::new(topic, p.id()))
        .collect())
}

/// Resolve watermarks for each partition through one shared session.
///
/// Order of the result matches the order of `partitions`.
pub(crate) fn resolve_all(
    session: &BrokerSession,
    partitions: &[PartitionRef],
) -> Vec<(PartitionRef, Watermarks)> {
    partitions
        .iter()
        .map(|p| (p.clone(), resolve_one(session, p)))
        .collect()
}

fn resolve_one(session: &BrokerSession, partition: &PartitionRef) -> Watermarks {
    match session.fetch_watermarks(partition) {
        Ok(wm) => wm,
        Err(e) => {
            warn!("watermark query for {} failed: {}", partition, e);
            Watermarks::unavailable()
        }
    }
}
