//! Scanferry: stream file inventories to an HTTP sink.
//!
//! Four cooperating stages wired with bounded channels (filesystem walker,
//! hash worker pool, duplicate filter, batching HTTP shipper) under a
//! single cancellation token. Data flows strictly forward; non-fatal errors
//! flow on a sibling channel that never blocks the data path.

pub mod engine;
pub mod errors;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use errors::{PipelineError, ShipError, WalkError};
pub use types::*;

/// Result alias used by the public scanferry API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
