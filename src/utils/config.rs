//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::time::Duration;

// ---- Channel capacities ----

/// Bounded capacities for the inter-stage queues. The walker may run ahead
/// of the hash workers, but never unboundedly.
pub struct ChannelCaps;

impl ChannelCaps {
    /// Walker → hasher path queue.
    pub const PATHS: usize = 1000;
    /// Hasher → deduper record queue, per worker.
    pub const RECORDS_PER_WORKER: usize = 2;
    /// Deduper → shipper unique-record queue.
    pub const UNIQUE: usize = 100;
    /// Error channel; overflow is dropped with a local log.
    pub const ERRORS: usize = 10;
}

// ---- Hashing ----

/// Digest and string-extraction I/O buffer sizes.
pub struct HashingConsts;

impl HashingConsts {
    /// Reusable read buffer for streaming digests (bytes). 1 MB.
    pub const READ_CHUNK_SIZE: usize = 1024 * 1024;
    /// Read buffer for the printable-string scan (bytes). 64 KB.
    pub const STRINGS_CHUNK_SIZE: usize = 64 * 1024;
    /// Hard cap on extracted strings per file.
    pub const MAX_STRINGS_PER_FILE: usize = 10_000;
}

// ---- Shipping ----

/// Batch and retry defaults for the API shipper.
pub struct ShipperConsts;

impl ShipperConsts {
    pub const DEFAULT_BATCH_SIZE: usize = 100;
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    /// Cap on a single retry delay.
    pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);
    /// Per-request HTTP timeout.
    pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
    /// Error-response body bytes kept for diagnostics.
    pub const ERROR_BODY_LIMIT: usize = 2048;
}

/// Exponential backoff shape: `base * 2^attempt * jitter`, capped.
pub struct BackoffConsts;

impl BackoffConsts {
    /// Base delay before scaling (milliseconds).
    pub const BASE_MS: u64 = 100;
    /// Uniform jitter range applied per attempt.
    pub const JITTER_MIN: f64 = 0.8;
    pub const JITTER_MAX: f64 = 1.4;
}

// ---- Shutdown ----

/// After a signal cancels the pipeline, force-exit once this much time
/// passes without an orderly finish.
pub const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);
