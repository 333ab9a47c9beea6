//! Engine configuration
//!
//! Connection settings (bootstrap servers plus SASL/SSL properties) and the
//! operational tunables every scan obeys: per-operation deadlines, per-poll
//! waits, and result caps. All values have working defaults; callers only
//! need to supply the broker address list.

use std::time::Duration;

use crate::engine::constants::{
    DEFAULT_LATEST_SCAN_DEADLINE_MS, DEFAULT_MAX_SCAN_RECORDS, DEFAULT_METADATA_TIMEOUT_MS,
    DEFAULT_RANGE_SCAN_DEADLINE_MS, DEFAULT_SASL_MECHANISM, DEFAULT_SCAN_POLL_WAIT_MS,
    DEFAULT_SEARCH_DEADLINE_MS, DEFAULT_SEARCH_POLL_WAIT_MS, DEFAULT_SECURITY_PROTOCOL,
    DEFAULT_SEND_TIMEOUT_MS,
};

/// Top-level configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Comma-separated broker address list (e.g. "kafka1:9092,kafka2:9092")
    pub bootstrap_servers: String,
    /// Transport security settings
    pub security: SecurityConfig,
    /// Deadlines, poll waits, and caps
    pub tunables: Tunables,
}

impl EngineConfig {
    /// Create a configuration for the given bootstrap servers with default
    /// security (PLAINTEXT) and tunables.
    pub fn new(bootstrap_servers: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            security: SecurityConfig::default(),
            tunables: Tunables::default(),
        }
    }

    /// Whether enough is configured to attempt a broker connection.
    pub fn is_configured(&self) -> bool {
        !self.bootstrap_servers.is_empty()
    }
}

/// Security protocol settings applied to every client handle.
///
/// Mirrors librdkafka's `security.protocol` / `sasl.*` / `ssl.*` properties.
/// Supported SASL mechanisms: PLAIN, SCRAM-SHA-256, SCRAM-SHA-512.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// PLAINTEXT, SSL, SASL_PLAINTEXT, or SASL_SSL
    pub protocol: String,
    /// SASL mechanism (only used for SASL_* protocols)
    pub sasl_mechanism: String,
    /// SASL username
    pub sasl_username: String,
    /// SASL password
    pub sasl_password: String,
    /// CA certificate location (only used for *_SSL protocols)
    pub ssl_ca_location: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_SECURITY_PROTOCOL.to_string(),
            sasl_mechanism: DEFAULT_SASL_MECHANISM.to_string(),
            sasl_username: String::new(),
            sasl_password: String::new(),
            ssl_ca_location: String::new(),
        }
    }
}

/// Operational tunables.
///
/// The deadlines are hard wall-clock budgets: a scan that exhausts its budget
/// returns whatever it has accumulated, tagged as partial. The poll waits
/// keep the scan loop responsive to its deadline; they are not the deadline
/// itself.
#[derive(Debug, Clone)]
pub struct Tunables {
    /// Budget for "most recent N" scans
    pub latest_scan_deadline: Duration,
    /// Budget for offset-range scans
    pub range_scan_deadline: Duration,
    /// Budget for full-partition pattern searches
    pub search_deadline: Duration,
    /// Per-poll wait inside offset/count scans
    pub scan_poll_wait: Duration,
    /// Per-poll wait inside pattern searches (longer: the search expects to
    /// chew through the whole partition)
    pub search_poll_wait: Duration,
    /// Timeout for watermark, metadata, and committed-offset queries
    pub metadata_timeout: Duration,
    /// Hard cap on records returned by any single scan
    pub max_scan_records: usize,
    /// Delivery timeout for produced messages
    pub send_timeout: Duration,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            latest_scan_deadline: Duration::from_millis(DEFAULT_LATEST_SCAN_DEADLINE_MS),
            range_scan_deadline: Duration::from_millis(DEFAULT_RANGE_SCAN_DEADLINE_MS),
            search_deadline: Duration::from_millis(DEFAULT_SEARCH_DEADLINE_MS),
            scan_poll_wait: Duration::from_millis(DEFAULT_SCAN_POLL_WAIT_MS),
            search_poll_wait: Duration::from_millis(DEFAULT_SEARCH_POLL_WAIT_MS),
            metadata_timeout: Duration::from_millis(DEFAULT_METADATA_TIMEOUT_MS),
            max_scan_records: DEFAULT_MAX_SCAN_RECORDS,
            send_timeout: Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS),
        }
    }
}
