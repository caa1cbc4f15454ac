//! Public types for the scanferry API and pipeline.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Digest algorithm used to fingerprint file contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key derivation used by the deduplication stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DedupMode {
    /// `<algorithm>:<hash>`: byte-identical contents collapse.
    Hash,
    /// Full path: every distinct path forwards.
    Path,
    /// `<name>#<size>`: same basename and size collapse.
    NameSize,
}

impl DedupMode {
    /// Parse a mode name. Unknown names fall back to [`DedupMode::Hash`]
    /// with a single warning rather than failing the run.
    pub fn parse(s: &str) -> DedupMode {
        match s.to_ascii_lowercase().as_str() {
            "hash" => DedupMode::Hash,
            "path" => DedupMode::Path,
            "name-size" | "name_size" => DedupMode::NameSize,
            other => {
                log::warn!("Unknown dedup mode {:?}, falling back to hash", other);
                DedupMode::Hash
            }
        }
    }
}

/// Authentication scheme selected on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AuthMethod {
    Bearer,
    Basic,
    ApiKey,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthMethod::Bearer => "bearer",
            AuthMethod::Basic => "basic",
            AuthMethod::ApiKey => "api-key",
        })
    }
}

/// Credentials resolved from `--auth-method` and `--token`, with a single
/// "apply to outgoing request" operation.
#[derive(Clone, Debug)]
pub enum Credentials {
    Bearer(String),
    ApiKey(String),
    Basic { username: String, password: String },
}

impl Credentials {
    pub fn apply(
        &self,
        req: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match self {
            Credentials::Bearer(token) => req.bearer_auth(token),
            Credentials::ApiKey(key) => req.header("X-API-Key", key),
            Credentials::Basic { username, password } => {
                req.basic_auth(username, Some(password))
            }
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One processed file, as produced by the hash stage and shipped to the API.
///
/// Exactly one of `hash` / `error` is non-empty; records with a non-empty
/// `error` carry diagnostic value only and are dropped by the dedup stage.
/// Records are immutable once emitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Absolute path to the file.
    pub path: String,
    /// Final path component.
    pub name: String,
    /// Size in bytes at stat time.
    pub size: i64,
    /// Last-modified timestamp.
    pub mod_time: DateTime<Utc>,
    /// Lowercase hex digest; empty when `error` is set.
    pub hash: String,
    /// Algorithm the digest was computed with (set even on error).
    pub hash_algorithm: HashAlgorithm,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    /// Printable tokens extracted from the file, in first-occurrence order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strings: Option<Vec<String>>,
    /// Reason processing failed, if it did.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// True iff any executable bit is set.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_executable: bool,
    /// When the hash stage emitted this record.
    pub processed_at: DateTime<Utc>,
}

impl FileRecord {
    /// Dedup key for this record under `mode`.
    pub fn dedup_key(&self, mode: DedupMode) -> String {
        match mode {
            DedupMode::Hash => format!("{}:{}", self.hash_algorithm, self.hash),
            DedupMode::Path => self.path.clone(),
            DedupMode::NameSize => format!("{}#{}", self.name, self.size),
        }
    }
}
