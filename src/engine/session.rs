//! Short-lived broker sessions
//!
//! Every public operation opens its own session and drops it on the way out;
//! nothing here outlives a single call. Consumer handles get an ephemeral
//! uuid group id so concurrent scans never share group state, and
//! `enable.auto.commit` stays off so browsing a partition never moves any
//! group's offsets.

use std::time::Duration;

use rdkafka::admin::AdminClient;
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::producer::FutureProducer;
use rdkafka::{Offset, TopicPartitionList};
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;

use super::constants::EPHEMERAL_GROUP_PREFIX;
use super::error::Result;
use super::message::{PartitionRef, ScannedMessage, Watermarks};
use super::scanner::RecordSource;

/// Map the engine's security settings onto librdkafka properties.
///
/// SASL credentials are only applied for SASL_* protocols and the CA
/// location only for *_SSL protocols, so a PLAINTEXT config never carries
/// stray auth properties.
fn client_config(config: &EngineConfig) -> ClientConfig {
    let mut cc = ClientConfig::new();
    cc.set("bootstrap.servers", &config.bootstrap_servers);
    cc.set("security.protocol", &config.security.protocol);

    if config.security.protocol.starts_with("SASL") {
        cc.set("sasl.mechanism", &config.security.sasl_mechanism);
        if !config.security.sasl_username.is_empty() {
            cc.set("sasl.username", &config.security.sasl_username);
        }
        if !config.security.sasl_password.is_empty() {
            cc.set("sasl.password", &config.security.sasl_password);
        }
    }

    if config.security.protocol.ends_with("SSL") {
        if !config.security.ssl_ca_location.is_empty() {
            cc.set("ssl.ca.location", &config.security.ssl_ca_location);
        }
        cc.set("ssl.endpoint.identification.algorithm", "https");
    }

    cc
}

/// A consumer handle scoped to one logical operation.
///
/// Closed by `Drop` on every exit path; there is no pooling and no reuse.
pub(crate) struct BrokerSession {
    consumer: BaseConsumer,
    metadata_timeout: Duration,
}

impl BrokerSession {
    /// Open a session under a fresh ephemeral group id, for scans and
    /// watermark queries.
    pub(crate) fn open_scan(config: &EngineConfig) -> Result<Self> {
        let group_id = format!("{}-{}", EPHEMERAL_GROUP_PREFIX, Uuid::new_v4());
        Self::open_with_group(config, &group_id)
    }

    /// Open a session joined to an existing group id, for committed-offset
    /// reads and offset-reset commits.
    pub(crate) fn open_group(config: &EngineConfig, group_id: &str) -> Result<Self> {
        Self::open_with_group(config, group_id)
    }

    fn open_with_group(config: &EngineConfig, group_id: &str) -> Result<Self> {
        let consumer: BaseConsumer = client_config(config)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()?;
        debug!("opened broker session with group id {}", group_id);

        Ok(Self {
            consumer,
            metadata_timeout: config.tunables.metadata_timeout,
        })
    }

    /// Query the low/high watermarks of one partition.
    pub(crate) fn fetch_watermarks(&self, partition: &PartitionRef) -> Result<Watermarks> {
        let (low, high) = self.consumer.fetch_watermarks(
            &partition.topic,
            partition.partition,
            self.metadata_timeout,
        )?;
        Ok(Watermarks::new(low, high))
    }

    /// Assign this session's cursor to one partition at an absolute offset.
    pub(crate) fn assign_at(&self, partition: &PartitionRef, offset: i64) -> Result<()> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&partition.topic, partition.partition, Offset::Offset(offset))?;
        self.consumer.assign(&tpl)?;
        Ok(())
    }

    /// Offset of the first record at or after `timestamp_ms`, or `None` when
    /// every retained record is older.
    pub(crate) fn offset_for_timestamp(
        &self,
        partition: &PartitionRef,
        timestamp_ms: i64,
    ) -> Result<Option<i64>> {
        let mut query = TopicPartitionList::new();
        query.add_partition_offset(
            &partition.topic,
            partition.partition,
            Offset::Offset(timestamp_ms),
        )?;

        let resolved = self
            .consumer
            .offsets_for_times(query, self.metadata_timeout)?;
        let offset = resolved
            .elements()
            .into_iter()
            .find(|e| e.topic() == partition.topic && e.partition() == partition.partition)
            .and_then(|e| match e.offset() {
                Offset::Offset(o) => Some(o),
                _ => None,
            });
        Ok(offset)
    }

    pub(crate) fn consumer(&self) -> &BaseConsumer {
        &self.consumer
    }

    pub(crate) fn metadata_timeout(&self) -> Duration {
        self.metadata_timeout
    }

    /// Turn this session into a record source for the scan loop. The cursor
    /// must already be assigned.
    pub(crate) fn into_source(self) -> ConsumerSource {
        ConsumerSource { session: self }
    }
}

/// Production [`RecordSource`]: one assigned consumer, one record per poll.
pub(crate) struct ConsumerSource {
    session: BrokerSession,
}

impl RecordSource for ConsumerSource {
    fn poll_record(&mut self, wait: Duration) -> Result<Option<ScannedMessage>> {
        match self.session.consumer.poll(wait) {
            None => Ok(None),
            Some(Ok(msg)) => Ok(Some(ScannedMessage::from_borrowed(&msg))),
            Some(Err(e)) => Err(e.into()),
        }
    }
}

/// Admin handle for group deletion.
pub(crate) fn admin_client(config: &EngineConfig) -> Result<AdminClient<DefaultClientContext>> {
    let admin = client_config(config).create()?;
    Ok(admin)
}

/// Producer handle for single-message publishes.
pub(crate) fn producer(config: &EngineConfig) -> Result<FutureProducer> {
    let producer = client_config(config)
        .set("client.id", EPHEMERAL_GROUP_PREFIX)
        .set(
            "message.timeout.ms",
            config.tunables.send_timeout.as_millis().to_string(),
        )
        .create()?;
    Ok(producer)
}
