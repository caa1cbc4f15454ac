//! Printable-string extraction.
//!
//! A "printable run" is a maximal contiguous sequence of bytes in
//! 0x20..=0x7E. Runs at least `min_length` long become tokens; duplicates
//! within one file are removed on insertion, and extraction stops once
//! [`HashingConsts::MAX_STRINGS_PER_FILE`] tokens have been collected.

use std::collections::HashSet;
use std::io::Read;

use crate::utils::config::HashingConsts;

fn is_printable(b: u8) -> bool {
    (0x20..=0x7e).contains(&b)
}

/// Close out the current run: keep it iff it is long enough and unseen.
/// Returns true once the token cap is reached.
fn flush_run(
    run: &mut Vec<u8>,
    min_length: usize,
    seen: &mut HashSet<String>,
    out: &mut Vec<String>,
) -> bool {
    if run.len() >= min_length {
        // Runs are pure ASCII by construction.
        let token = String::from_utf8_lossy(run).into_owned();
        if seen.insert(token.clone()) {
            out.push(token);
        }
    }
    run.clear();
    out.len() >= HashingConsts::MAX_STRINGS_PER_FILE
}

/// Scan `reader` for printable runs of at least `min_length` bytes.
/// Tokens come back in first-occurrence order. A run is never split unless
/// it actually ended, regardless of read-buffer boundaries.
pub fn extract_strings<R: Read>(reader: &mut R, min_length: usize) -> std::io::Result<Vec<String>> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut run: Vec<u8> = Vec::new();
    let mut buf = vec![0u8; HashingConsts::STRINGS_CHUNK_SIZE];
    let mut capped = false;

    'scan: loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        for &b in &buf[..n] {
            if is_printable(b) {
                run.push(b);
            } else if flush_run(&mut run, min_length, &mut seen, &mut out) {
                capped = true;
                break 'scan;
            }
        }
    }

    if !capped {
        flush_run(&mut run, min_length, &mut seen, &mut out);
    }
    Ok(out)
}
