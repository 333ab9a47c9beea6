//! Partition references, watermarks, and the owned message representation
//!
//! Everything a scan returns is detached from the client library here:
//! [`ScannedMessage`] owns its key, value, and headers so results outlive the
//! session that produced them.

use rdkafka::message::{BorrowedMessage, Headers, Message};

/// A single partition of a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionRef {
    pub topic: String,
    pub partition: i32,
}

impl PartitionRef {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

impl std::fmt::Display for PartitionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.topic, self.partition)
    }
}

/// Low/high offset bounds of a partition at a point in time.
///
/// A snapshot, not a live view: the high watermark can advance between
/// resolving it and fetching records. `low == high` means the partition
/// currently holds no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermarks {
    /// Oldest retained offset
    pub low: i64,
    /// Next offset to be written
    pub high: i64,
    /// True when the broker could not be queried and the bounds defaulted
    /// to zero instead of erroring
    pub degraded: bool,
}

impl Watermarks {
    pub fn new(low: i64, high: i64) -> Self {
        Self {
            low,
            high,
            degraded: false,
        }
    }

    /// The zero watermarks returned when the broker is unreachable.
    pub fn unavailable() -> Self {
        Self {
            low: 0,
            high: 0,
            degraded: true,
        }
    }

    /// Number of records currently retained.
    pub fn span(&self) -> i64 {
        self.high - self.low
    }

    pub fn is_empty(&self) -> bool {
        self.high <= self.low
    }
}

/// One record retrieved from a partition, in the engine's owned form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    /// Broker timestamp in epoch milliseconds, when the broker reported one
    pub timestamp_ms: Option<i64>,
    /// Headers in broker order; a header value may itself be null
    pub headers: Vec<(String, Option<Vec<u8>>)>,
}

impl ScannedMessage {
    /// Detach an rdkafka message into the engine's owned representation.
    pub fn from_borrowed(msg: &BorrowedMessage<'_>) -> Self {
        let headers = msg
            .headers()
            .map(|hs| {
                hs.iter()
                    .map(|h| (h.key.to_string(), h.value.map(|v| v.to_vec())))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key: msg.key().map(|k| k.to_vec()),
            value: msg.payload().map(|v| v.to_vec()),
            timestamp_ms: msg.timestamp().to_millis(),
            headers,
        }
    }

    /// Key decoded as UTF-8 (lossy), if present.
    pub fn key_text(&self) -> Option<String> {
        self.key
            .as_deref()
            .map(|k| String::from_utf8_lossy(k).into_owned())
    }

    /// Value decoded as UTF-8 (lossy), if present.
    pub fn value_text(&self) -> Option<String> {
        self.value
            .as_deref()
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> ScannedMessage {
        ScannedMessage {
            topic: "orders".to_string(),
            partition: 2,
            offset: 41,
            key: Some(b"order-41".to_vec()),
            value: Some(b"{\"total\": 12}".to_vec()),
            timestamp_ms: Some(1_700_000_000_000),
            headers: vec![
                ("trace-id".to_string(), Some(b"abc".to_vec())),
                ("retry".to_string(), None),
            ],
        }
    }

    #[test]
    fn test_partition_ref_display() {
        let p = PartitionRef::new("orders", 3);
        assert_eq!(format!("{}", p), "orders[3]");
    }

    #[test]
    fn test_watermarks_span() {
        let wm = Watermarks::new(100, 1100);
        assert_eq!(wm.span(), 1000);
        assert!(!wm.is_empty());
        assert!(!wm.degraded);
    }

    #[test]
    fn test_watermarks_empty_partition() {
        let wm = Watermarks::new(42, 42);
        assert_eq!(wm.span(), 0);
        assert!(wm.is_empty());
    }

    #[test]
    fn test_watermarks_unavailable_is_degraded() {
        let wm = Watermarks::unavailable();
        assert_eq!(wm.low, 0);
        assert_eq!(wm.high, 0);
        assert!(wm.degraded);
    }

    #[test]
    fn test_message_text_accessors() {
        let msg = sample_message();
        assert_eq!(msg.key_text().unwrap(), "order-41");
        assert!(msg.value_text().unwrap().contains("total"));
    }

    #[test]
    fn test_message_headers_keep_order() {
        let msg = sample_message();
        assert_eq!(msg.headers[0].0, "trace-id");
        assert_eq!(msg.headers[1].0, "retry");
        assert!(msg.headers[1].1.is_none());
    }

    #[test]
    fn test_null_key_and_value() {
        let mut msg = sample_message();
        msg.key = None;
        msg.value = None;
        assert!(msg.key_text().is_none());
        assert!(msg.value_text().is_none());
    }
}
