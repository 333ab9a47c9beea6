//! Message publishing
//!
//! One message per call, delivery awaited synchronously. Unlike the read
//! paths this is fail-loud: any broker rejection surfaces as an error with
//! the record it refused.

use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use tracing::debug;

use crate::config::EngineConfig;

use super::error::{EngineError, Result};
use super::session::producer;

/// A record to publish. Absent partition means broker-side partitioning.
#[derive(Debug, Clone, Default)]
pub struct OutboundMessage {
    pub topic: String,
    pub partition: Option<i32>,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub headers: Vec<(String, Option<Vec<u8>>)>,
}

impl OutboundMessage {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.topic.is_empty() {
            return Err(EngineError::InvalidRequest(
                "publish requires a topic".to_string(),
            ));
        }
        if let Some(p) = self.partition {
            if p < 0 {
                return Err(EngineError::InvalidRequest(format!(
                    "publish partition must be non-negative, got {}",
                    p
                )));
            }
        }
        Ok(())
    }
}

/// Publish one message and wait for the broker ack.
///
/// Returns the partition and offset the record landed at.
pub(crate) async fn publish(
    config: &EngineConfig,
    message: &OutboundMessage,
) -> Result<(i32, i64)> {
    message.validate()?;
    let producer: FutureProducer = producer(config)?;

    let mut record: FutureRecord<'_, Vec<u8>, Vec<u8>> = FutureRecord::to(&message.topic);
    if let Some(p) = message.partition {
        record = record.partition(p);
    }
    if let Some(key) = &message.key {
        record = record.key(key);
    }
    if let Some(value) = &message.value {
        record = record.payload(value);
    }
    if !message.headers.is_empty() {
        let mut headers = OwnedHeaders::new_with_capacity(message.headers.len());
        for (name, value) in &message.headers {
            headers = headers.insert(Header {
                key: name,
                value: value.as_ref(),
            });
        }
        record = record.headers(headers);
    }

    let (partition, offset) = producer
        .send(record, config.tunables.send_timeout)
        .await
        .map_err(|(e, _)| EngineError::broker("publish", e))?;
    debug!(
        "published to {}[{}] at offset {}",
        message.topic, partition, offset
    );
    Ok((partition, offset))
}
