//! Non-fatal error taxonomy for the pipeline's error channel.
//!
//! Per-file processing failures do not appear here; those travel inside
//! [`FileRecord::error`](crate::FileRecord) as diagnostic records. This
//! module covers walk failures (skipped entries) and delivery failures
//! (batches discarded after retries).

use std::path::PathBuf;
use thiserror::Error;

/// A filesystem walk failure. The walker reports it and moves on.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("error accessing path {}: {source}", .path.display())]
    Access {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error resolving symlink {}: {source}", .path.display())]
    Symlink {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error reading directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error getting info for {}: {source}", .path.display())]
    EntryInfo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid exclude pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
}

/// A batch delivery failure. The batch is discarded, not re-queued.
#[derive(Debug, Error)]
pub enum ShipError {
    #[error("error serializing batch: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("API error (attempt {attempts}/{max_attempts}): status={status}, body={body}")]
    Status {
        attempts: u32,
        max_attempts: u32,
        status: u16,
        body: String,
    },

    #[error("request error (attempt {attempts}/{max_attempts}): {source}")]
    Request {
        attempts: u32,
        max_attempts: u32,
        source: reqwest::Error,
    },
}

/// Any non-fatal stage error. The driver counts scan and API errors
/// separately for the final summary.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Scan(#[from] WalkError),

    #[error(transparent)]
    Api(#[from] ShipError),
}
