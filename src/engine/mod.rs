//! The partition access and offset engine.
//!
//! Layering, top to bottom:
//!
//! - [`ops`]: the async [`Engine`] facade, one method per operation
//! - [`scanner`], [`groups`], [`publisher`] and the watermark resolver:
//!   the operations themselves, written against plain data
//! - the session layer: short-lived rdkafka handles, one per call
//!
//! The scan loop is deliberately independent of rdkafka (via
//! [`scanner::RecordSource`]) so its ordering, truncation, and deadline
//! behavior are testable without a broker.

pub mod constants;
pub mod error;
pub mod groups;
pub mod matcher;
pub mod message;
pub mod ops;
pub mod publisher;
pub mod scanner;
mod session;
mod watermarks;

pub use ops::Engine;
