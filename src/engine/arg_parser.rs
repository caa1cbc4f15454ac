use clap::{Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

use crate::types::{AuthMethod, HashAlgorithm};

struct DefaultArgs;

impl DefaultArgs {
    pub const PATHS: &'static str = ".";
    pub const MAX_SIZE: i64 = 100 * 1024 * 1024;
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Log verbosity for the `--log-level` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        })
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> LevelFilter {
        match level {
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

/// Inventory file trees, fingerprint contents, and ship unique records to an
/// HTTP sink.
#[derive(Clone, Parser)]
#[command(name = "scanferry", version)]
#[command(about = "Scan file trees, hash each file, and POST unique records to an API.")]
pub struct Cli {
    /// Comma-separated list of paths to scan.
    #[arg(long, default_value = DefaultArgs::PATHS)]
    pub paths: String,

    /// Comma-separated list of glob patterns to exclude.
    #[arg(long, default_value = "")]
    pub exclude: String,

    /// Hash algorithm.
    #[arg(long, value_enum, default_value_t = HashAlgorithm::Sha256)]
    pub algorithm: HashAlgorithm,

    /// Number of hash workers. Default: hardware parallelism.
    #[arg(long, default_value_t = default_workers())]
    pub workers: usize,

    /// Maximum directory depth (-1 for unlimited).
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub depth: i32,

    /// API endpoint URL.
    #[arg(long, required = true)]
    pub api: String,

    /// API credential; meaning depends on --auth-method (basic expects
    /// user:pass).
    #[arg(long, default_value = "")]
    pub token: String,

    /// API authentication method.
    #[arg(long, value_enum, default_value_t = AuthMethod::Bearer)]
    pub auth_method: AuthMethod,

    /// Records per POST.
    #[arg(long, default_value_t = 100)]
    pub batch: usize,

    /// Retries per batch after the first attempt.
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// User-Agent header for API requests.
    #[arg(long, default_value_t = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,

    /// Deduplication key: hash, path, or name-size.
    #[arg(long, default_value = "hash")]
    pub dedup: String,

    /// Extract printable strings from files.
    #[arg(long)]
    pub strings: bool,

    /// Minimum extracted string length.
    #[arg(long, default_value_t = 4)]
    pub string_min: usize,

    /// Maximum file size to process, in bytes.
    #[arg(long, default_value_t = DefaultArgs::MAX_SIZE)]
    pub max_size: i64,

    /// Resolve symbolic links instead of skipping them.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Scan hidden files and directories.
    #[arg(long)]
    pub include_hidden: bool,

    /// Log level.
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log file path; empty logs to stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Split a comma-separated flag value, trimming and dropping empties.
pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
