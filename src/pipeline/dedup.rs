//! Deduplication stage: forward each distinct key at most once per run.

use crossbeam_channel::{bounded, Receiver};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use crate::pipeline::cancel::{recv_or_cancel, send_or_cancel, CancelToken};
use crate::types::{DedupMode, FileRecord};
use crate::utils::config::ChannelCaps;

#[derive(Default)]
struct DedupState {
    seen: HashSet<String>,
    total_files: u64,
    unique_files: u64,
}

/// Run-local duplicate filter with live stats. Clone is cheap and shares
/// the seen set and counters.
///
/// Error records are dropped outright (counted in `total_files` only).
/// Forwarded records keep arrival order of first occurrences. The seen set
/// and counters share one reader-writer lock; the run thread is the only
/// writer, and [`stats`](DedupEngine::stats) snapshots concurrently.
#[derive(Clone)]
pub struct DedupEngine {
    mode: DedupMode,
    state: Arc<RwLock<DedupState>>,
}

impl DedupEngine {
    pub fn new(mode: DedupMode) -> DedupEngine {
        DedupEngine {
            mode,
            state: Arc::new(RwLock::new(DedupState::default())),
        }
    }

    pub fn mode(&self) -> DedupMode {
        self.mode
    }

    /// Spawn the filter thread. The output channel closes when the input
    /// closes or the token is cancelled.
    pub fn run(
        &self,
        cancel: &CancelToken,
        input: Receiver<FileRecord>,
    ) -> (Receiver<FileRecord>, JoinHandle<()>) {
        let (unique_tx, unique_rx) = bounded::<FileRecord>(ChannelCaps::UNIQUE);
        let engine = self.clone();
        let cancel = cancel.clone();

        let handle = thread::spawn(move || {
            while let Some(record) = recv_or_cancel(&input, &cancel) {
                if !engine.admit(&record) {
                    continue;
                }
                if !send_or_cancel(&unique_tx, record, &cancel) {
                    break;
                }
            }
            let (total, unique) = engine.stats();
            if cancel.is_cancelled() {
                log::info!("Deduplication stopped by cancellation");
            } else {
                log::info!(
                    "Deduplication complete: processed {} files, {} unique",
                    total,
                    unique
                );
            }
        });

        (unique_rx, handle)
    }

    /// Count the record and decide whether it forwards: error records and
    /// already-seen keys do not.
    fn admit(&self, record: &FileRecord) -> bool {
        let mut state = self.state.write().unwrap();
        state.total_files += 1;

        if !record.error.is_empty() {
            log::debug!("Dropping error record: {}", record.path);
            return false;
        }

        let key = record.dedup_key(self.mode);
        if state.seen.contains(&key) {
            log::debug!("Filtered duplicate file: {}", record.path);
            return false;
        }
        state.seen.insert(key);
        state.unique_files += 1;
        true
    }

    /// Read-consistent `(total_files, unique_files)` snapshot.
    pub fn stats(&self) -> (u64, u64) {
        let state = self.state.read().unwrap();
        (state.total_files, state.unique_files)
    }

    /// Atomically clear counters and the seen set. Safe while a run is in
    /// progress; in-flight records land in the new generation.
    pub fn reset(&self) {
        let mut state = self.state.write().unwrap();
        *state = DedupState::default();
    }
}
