//! kafka-scout: bounded partition access and consumer-group offset management
//! for Kafka clusters.
//!
//! Kafka only hands out records through sequential polling, so every retrieval
//! here is a *bounded scan*: a poll loop constrained by a stop condition, a
//! result cap, and a wall-clock deadline. The crate wraps that loop, plus the
//! watermark and consumer-group plumbing around it, behind a small async
//! surface ([`Engine`]).
//!
//! ## What it does
//!
//! - Resolve low/high watermarks for a partition
//! - Fetch a bounded offset range or the most recent N records
//! - Search a partition by substring or regex, optionally time-windowed
//! - Compute consumer-group lag and reset or delete group offsets
//! - Produce a single message (with headers) to a chosen partition
//!
//! ## What it deliberately does not do
//!
//! No broker wire protocol (rdkafka provides the client), no exactly-once or
//! transactional guarantees, and no state between calls: every operation
//! opens its own short-lived session and the broker remains the sole source
//! of truth.
//!
//! ```no_run
//! use kafka_scout::{Engine, EngineConfig, PartitionRef};
//!
//! # async fn demo() -> kafka_scout::Result<()> {
//! let engine = Engine::new(EngineConfig::new("localhost:9092"));
//! for (partition, wm) in engine.resolve_watermarks("orders").await? {
//!     println!("{}: {} records retained", partition, wm.span());
//! }
//! let recent = engine.scan_latest(&PartitionRef::new("orders", 0), 50).await?;
//! println!("{} records ({})", recent.messages.len(), recent.truncation);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;

pub use config::{EngineConfig, SecurityConfig, Tunables};
pub use engine::error::{EngineError, Result};
pub use engine::groups::{GroupOffsetEntry, ResetStrategy};
pub use engine::matcher::{MatchFilter, MatchOptions, MatchPattern};
pub use engine::message::{PartitionRef, ScannedMessage, Watermarks};
pub use engine::publisher::OutboundMessage;
pub use engine::scanner::{
    run_scan, RecordSource, ScanRequest, ScanResult, StartPosition, StopCondition,
    TruncationReason,
};
pub use engine::Engine;
