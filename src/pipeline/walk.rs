//! Filesystem walker: one thread per root, emitting regular-file paths that
//! pass the policy filters onto a bounded channel.

use crossbeam_channel::{bounded, Receiver, Sender};
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crate::errors::{PipelineError, WalkError};
use crate::pipeline::cancel::{send_or_cancel, CancelToken};
use crate::utils::config::ChannelCaps;

/// Scans one or more roots and streams out every regular file that passes
/// the hidden/symlink/exclude/depth/size filters. Roots are walked
/// concurrently, one thread per root.
#[derive(Clone, Debug)]
pub struct FileWalker {
    pub roots: Vec<PathBuf>,
    /// Shell-glob patterns matched against basenames and full paths.
    pub exclude_patterns: Vec<String>,
    /// Maximum directory depth; negative means unlimited. Depth 0 keeps only
    /// entries directly under a root.
    pub max_depth: i32,
    /// Files larger than this are not emitted; <= 0 means unlimited.
    pub max_file_size: i64,
    pub skip_hidden: bool,
    pub skip_symlinks: bool,
}

impl FileWalker {
    pub fn new(roots: Vec<PathBuf>) -> FileWalker {
        FileWalker {
            roots,
            exclude_patterns: Vec::new(),
            max_depth: -1,
            max_file_size: -1,
            skip_hidden: true,
            skip_symlinks: true,
        }
    }

    /// Start the walk. Returns the bounded path channel and one join handle
    /// per root; the channel closes once every root thread finishes.
    ///
    /// Malformed exclude patterns are reported once on the error channel and
    /// dropped from the compiled set; they never abort the scan.
    pub fn scan(
        &self,
        cancel: &CancelToken,
        error_tx: &Sender<PipelineError>,
    ) -> (Receiver<PathBuf>, Vec<JoinHandle<()>>) {
        let (path_tx, path_rx) = bounded::<PathBuf>(ChannelCaps::PATHS);

        let mut patterns = Vec::with_capacity(self.exclude_patterns.len());
        for raw in &self.exclude_patterns {
            match Pattern::new(raw) {
                Ok(p) => patterns.push(p),
                Err(e) => report_walk_error(
                    error_tx,
                    WalkError::Pattern {
                        pattern: raw.clone(),
                        source: e,
                    },
                ),
            }
        }

        let handles = self
            .roots
            .iter()
            .map(|root| {
                let ctx = WalkContext {
                    patterns: patterns.clone(),
                    max_depth: self.max_depth,
                    max_file_size: self.max_file_size,
                    skip_hidden: self.skip_hidden,
                    skip_symlinks: self.skip_symlinks,
                    path_tx: path_tx.clone(),
                    error_tx: error_tx.clone(),
                    cancel: cancel.clone(),
                };
                let root = root.clone();
                thread::spawn(move || ctx.scan_root(&root))
            })
            .collect();

        // Dropping our senders lets the channel close when the last root
        // thread exits.
        drop(path_tx);
        (path_rx, handles)
    }
}

/// Per-thread walk state: compiled filters plus the channel ends.
struct WalkContext {
    patterns: Vec<Pattern>,
    max_depth: i32,
    max_file_size: i64,
    skip_hidden: bool,
    skip_symlinks: bool,
    path_tx: Sender<PathBuf>,
    error_tx: Sender<PipelineError>,
    cancel: CancelToken,
}

/// A basename is hidden when it starts with `.`, excluding `.` and `..`.
fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}

fn basename(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

impl WalkContext {
    fn scan_root(&self, root: &Path) {
        // Record paths are absolute (and `.`-style roots resolved) from here on.
        let root = match fs::canonicalize(root) {
            Ok(r) => r,
            Err(e) => {
                self.report(WalkError::Access {
                    path: root.to_path_buf(),
                    source: e,
                });
                return;
            }
        };
        self.scan_path(&root, 0);
    }

    /// Recursive walk of one path. `depth` is 0 for a root; a directory at
    /// `depth` > max_depth is pruned before its entries are read, so depth 0
    /// keeps exactly the entries directly under a root.
    fn scan_path(&self, path: &Path, depth: i32) {
        if self.cancel.is_cancelled() {
            return;
        }

        let info = match fs::symlink_metadata(path) {
            Ok(info) => info,
            Err(e) => {
                self.report(WalkError::Access {
                    path: path.to_path_buf(),
                    source: e,
                });
                return;
            }
        };

        // Symlink policy: skip, or resolve and continue with the target.
        // Hidden names were already filtered in the parent's entry loop; an
        // explicitly configured root is scanned even if its own name is
        // hidden.
        let (path, info) = if info.file_type().is_symlink() {
            if self.skip_symlinks {
                return;
            }
            let real = match fs::canonicalize(path) {
                Ok(real) => real,
                Err(e) => {
                    self.report(WalkError::Symlink {
                        path: path.to_path_buf(),
                        source: e,
                    });
                    return;
                }
            };
            match fs::metadata(&real) {
                Ok(info) => (real, info),
                Err(e) => {
                    self.report(WalkError::Access {
                        path: real,
                        source: e,
                    });
                    return;
                }
            }
        } else {
            (path.to_path_buf(), info)
        };

        if self.is_excluded(&path) {
            return;
        }

        if !info.is_dir() {
            self.emit_file(path, &info);
            return;
        }

        if self.max_depth >= 0 && depth > self.max_depth {
            return;
        }

        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(e) => {
                self.report(WalkError::ReadDir { path, source: e });
                return;
            }
        };

        for entry in entries {
            if self.cancel.is_cancelled() {
                return;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.report(WalkError::EntryInfo {
                        path: path.clone(),
                        source: e,
                    });
                    continue;
                }
            };

            let entry_path = entry.path();
            if self.skip_hidden && is_hidden_name(basename(&entry_path)) {
                continue;
            }

            // Entry metadata does not follow symlinks; links route back
            // through scan_path so the resolve policy applies.
            let entry_info = match entry.metadata() {
                Ok(info) => info,
                Err(e) => {
                    self.report(WalkError::EntryInfo {
                        path: entry_path,
                        source: e,
                    });
                    continue;
                }
            };

            if entry_info.is_dir() || entry_info.file_type().is_symlink() {
                self.scan_path(&entry_path, depth + 1);
            } else {
                self.emit_file(entry_path, &entry_info);
            }
        }
    }

    /// Final filter ladder for a candidate file: regular, size pre-filter,
    /// exclude, then a cancellation-aware blocking send.
    fn emit_file(&self, path: PathBuf, info: &fs::Metadata) {
        if self.cancel.is_cancelled() {
            return;
        }
        // Devices, sockets and FIFOs are silently skipped.
        if !info.is_file() {
            return;
        }
        if self.max_file_size > 0 && info.len() as i64 > self.max_file_size {
            return;
        }
        if self.is_excluded(&path) {
            return;
        }
        send_or_cancel(&self.path_tx, path, &self.cancel);
    }

    /// A path is excluded when any pattern matches its basename or the full
    /// path.
    fn is_excluded(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let name = basename(path);
        let full = path.to_string_lossy();
        self.patterns
            .iter()
            .any(|p| p.matches(name) || p.matches(&full))
    }

    fn report(&self, err: WalkError) {
        report_walk_error(&self.error_tx, err);
    }
}

/// Non-blocking error report; a full channel drops the error with a log.
fn report_walk_error(error_tx: &Sender<PipelineError>, err: WalkError) {
    let err = PipelineError::Scan(err);
    if let Err(crossbeam_channel::TrySendError::Full(err)) = error_tx.try_send(err) {
        log::warn!("Error channel full, dropping error: {}", err);
    }
}
