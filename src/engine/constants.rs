//! Operational defaults
//!
//! Central home for the engine's fixed constants. Anything here that callers
//! may want to tune is mirrored as a field on [`Tunables`](crate::Tunables);
//! the rest is internal plumbing.

/// Default budget for "most recent N" scans (milliseconds)
pub const DEFAULT_LATEST_SCAN_DEADLINE_MS: u64 = 5_000;

/// Default budget for offset-range scans (milliseconds)
pub const DEFAULT_RANGE_SCAN_DEADLINE_MS: u64 = 10_000;

/// Default budget for full-partition pattern searches (milliseconds)
pub const DEFAULT_SEARCH_DEADLINE_MS: u64 = 30_000;

/// Per-poll wait inside offset/count scans (milliseconds)
pub const DEFAULT_SCAN_POLL_WAIT_MS: u64 = 100;

/// Per-poll wait inside pattern searches (milliseconds)
pub const DEFAULT_SEARCH_POLL_WAIT_MS: u64 = 1_000;

/// Timeout for watermark, metadata, and committed-offset queries (milliseconds)
pub const DEFAULT_METADATA_TIMEOUT_MS: u64 = 5_000;

/// Delivery timeout for produced messages (milliseconds)
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 5_000;

/// Hard cap on records returned by any single scan
pub const DEFAULT_MAX_SCAN_RECORDS: usize = 10_000;

/// Default transport security
pub const DEFAULT_SECURITY_PROTOCOL: &str = "PLAINTEXT";

/// Default SASL mechanism when a SASL protocol is selected
pub const DEFAULT_SASL_MECHANISM: &str = "PLAIN";

/// Prefix for the ephemeral consumer-group ids the engine assigns to its
/// short-lived scan consumers. A fresh uuid is appended per session so
/// concurrent scans never share group state.
pub const EPHEMERAL_GROUP_PREFIX: &str = "kafka-scout";

/// Topics whose names start with this prefix are Kafka-internal and are
/// skipped when enumerating a group's partitions.
pub const INTERNAL_TOPIC_PREFIX: &str = "__";
