//! Hash stage: a fixed pool of workers turning paths into [`FileRecord`]s.

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver};
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crate::engine::hashing::hash_reader;
use crate::engine::strings::extract_strings;
use crate::pipeline::cancel::{recv_or_cancel, send_or_cancel, CancelToken};
use crate::types::{FileRecord, HashAlgorithm};
use crate::utils::config::ChannelCaps;

/// Converts each input path into exactly one [`FileRecord`]. Per-file
/// failures become records with `error` set; workers never re-queue or
/// abort on single-file errors.
#[derive(Clone, Debug)]
pub struct HashStage {
    pub algorithm: HashAlgorithm,
    /// Fixed worker count; callers default this to hardware parallelism.
    pub workers: usize,
    pub extract_strings: bool,
    pub string_min_length: usize,
    /// When set, files larger than `max_file_size` get an error record
    /// instead of being read.
    pub skip_large: bool,
    pub max_file_size: i64,
}

impl HashStage {
    pub fn new(algorithm: HashAlgorithm, workers: usize) -> HashStage {
        HashStage {
            algorithm,
            workers: workers.max(1),
            extract_strings: false,
            string_min_length: 4,
            skip_large: true,
            max_file_size: 100 * 1024 * 1024,
        }
    }

    /// Spawn the worker pool. The record channel is bounded at
    /// 2 x workers to smooth bursts; it closes when every worker exits.
    pub fn process(
        &self,
        cancel: &CancelToken,
        path_rx: Receiver<PathBuf>,
    ) -> (Receiver<FileRecord>, Vec<JoinHandle<()>>) {
        let workers = self.workers.max(1);
        let (record_tx, record_rx) =
            bounded::<FileRecord>(workers * ChannelCaps::RECORDS_PER_WORKER);

        let handles = (0..workers)
            .map(|id| {
                let stage = self.clone();
                let path_rx = path_rx.clone();
                let record_tx = record_tx.clone();
                let cancel = cancel.clone();
                thread::spawn(move || {
                    log::debug!("Hash worker {} started", id);
                    while let Some(path) = recv_or_cancel(&path_rx, &cancel) {
                        let record = stage.process_file(&path);
                        if !send_or_cancel(&record_tx, record, &cancel) {
                            break;
                        }
                    }
                    log::debug!("Hash worker {} finished", id);
                })
            })
            .collect();

        (record_rx, handles)
    }

    /// Process a single file into a record. Exactly one of `hash` / `error`
    /// is populated on the result; `hash_algorithm` always is.
    pub fn process_file(&self, path: &Path) -> FileRecord {
        let mut record = FileRecord {
            path: path.to_string_lossy().into_owned(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: 0,
            mod_time: DateTime::<Utc>::UNIX_EPOCH,
            hash: String::new(),
            hash_algorithm: self.algorithm,
            mime_type: String::new(),
            strings: None,
            error: String::new(),
            is_executable: false,
            processed_at: Utc::now(),
        };

        let info = match std::fs::metadata(path) {
            Ok(info) => info,
            Err(e) => {
                record.error = format!("stat error: {}", e);
                return self.emit(record);
            }
        };

        record.size = info.len() as i64;
        if let Ok(modified) = info.modified() {
            record.mod_time = DateTime::<Utc>::from(modified);
        }
        record.is_executable = is_executable(&info);

        if self.skip_large && self.max_file_size > 0 && record.size > self.max_file_size {
            record.error = format!("file too large ({} bytes)", record.size);
            return self.emit(record);
        }

        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                record.error = format!("open error: {}", e);
                return self.emit(record);
            }
        };

        match hash_reader(&mut file, self.algorithm) {
            Ok(hash) => record.hash = hash,
            Err(e) => {
                record.error = format!("hash error: {}", e);
                return self.emit(record);
            }
        }

        if self.extract_strings {
            if let Err(e) = file.seek(SeekFrom::Start(0)) {
                record.hash.clear();
                record.error = format!("seek error: {}", e);
                return self.emit(record);
            }
            match extract_strings(&mut file, self.string_min_length) {
                Ok(strings) => record.strings = Some(strings),
                Err(e) => {
                    record.hash.clear();
                    record.error = format!("string extraction error: {}", e);
                    return self.emit(record);
                }
            }
        }

        self.emit(record)
    }

    fn emit(&self, mut record: FileRecord) -> FileRecord {
        record.processed_at = Utc::now();
        record
    }
}

#[cfg(unix)]
fn is_executable(info: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    info.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_info: &std::fs::Metadata) -> bool {
    false
}
