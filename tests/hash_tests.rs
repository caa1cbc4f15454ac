//! Hash stage tests: digests, per-file error records, string extraction.

use scanferry::engine::{extract_strings, hash_reader};
use scanferry::pipeline::{CancelToken, HashStage};
use scanferry::HashAlgorithm;
use std::fs;
use std::io::Cursor;

mod common;

const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";
const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";
const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
const HELLO_SHA512: &str = "9b71d224bd62f3785d96d46ad3ea3d73319bfbc2890caadae2dff72519673ca7\
2323c3d99ba5c11d7c7acc6e14b8c5da0c4663475c2e5c3adef46f73bcdec043";

#[test]
fn hash_reader_all_algorithms() {
    let cases = [
        (HashAlgorithm::Md5, HELLO_MD5),
        (HashAlgorithm::Sha1, HELLO_SHA1),
        (HashAlgorithm::Sha256, HELLO_SHA256),
        (HashAlgorithm::Sha512, HELLO_SHA512),
    ];
    for (algorithm, expected) in cases {
        let mut reader = Cursor::new(b"hello");
        assert_eq!(hash_reader(&mut reader, algorithm).unwrap(), expected);
    }
}

#[test]
fn process_file_populates_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.txt");
    fs::write(&path, b"hello").unwrap();

    let stage = HashStage::new(HashAlgorithm::Sha256, 1);
    let record = stage.process_file(&path);

    assert_eq!(record.name, "hello.txt");
    assert_eq!(record.path, path.to_string_lossy());
    assert_eq!(record.size, 5);
    assert_eq!(record.hash, HELLO_SHA256);
    assert_eq!(record.hash_algorithm, HashAlgorithm::Sha256);
    assert!(record.error.is_empty());
    assert!(record.strings.is_none());
    assert!(record.mod_time.timestamp() > 0);
}

#[test]
fn stat_failure_yields_error_record() {
    let dir = tempfile::tempdir().unwrap();
    let stage = HashStage::new(HashAlgorithm::Sha256, 1);
    let record = stage.process_file(&dir.path().join("missing.txt"));

    assert!(record.error.starts_with("stat error:"), "{}", record.error);
    assert!(record.hash.is_empty());
    // The configured algorithm is set even on error.
    assert_eq!(record.hash_algorithm, HashAlgorithm::Sha256);
}

#[test]
fn oversize_file_yields_error_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.bin");
    fs::write(&path, vec![0u8; 2000]).unwrap();

    let mut stage = HashStage::new(HashAlgorithm::Sha256, 1);
    stage.max_file_size = 1000;
    let record = stage.process_file(&path);

    assert_eq!(record.error, "file too large (2000 bytes)");
    assert!(record.hash.is_empty());
    assert_eq!(record.size, 2000);
}

#[cfg(unix)]
#[test]
fn executable_bit_detected() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tool.sh");
    fs::write(&path, b"#!/bin/sh\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

    let stage = HashStage::new(HashAlgorithm::Sha256, 1);
    assert!(stage.process_file(&path).is_executable);

    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    assert!(!stage.process_file(&path).is_executable);
}

#[test]
fn worker_pool_emits_one_record_per_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    for i in 0..20 {
        let path = dir.path().join(format!("f{}.txt", i));
        fs::write(&path, format!("content {}", i)).unwrap();
        paths.push(path);
    }
    // One path that will fail stat, to check totality under errors.
    paths.push(dir.path().join("missing.txt"));

    let (path_tx, path_rx) = crossbeam_channel::bounded(100);
    for p in &paths {
        path_tx.send(p.clone()).unwrap();
    }
    drop(path_tx);

    let cancel = CancelToken::new();
    let stage = HashStage::new(HashAlgorithm::Sha256, 4);
    let (record_rx, handles) = stage.process(&cancel, path_rx);
    let records: Vec<_> = record_rx.iter().collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(records.len(), paths.len());
    // Hash/error dichotomy holds for every record.
    for record in &records {
        assert!(
            record.hash.is_empty() != record.error.is_empty(),
            "exactly one of hash/error must be set: {:?}",
            record
        );
    }
    assert_eq!(records.iter().filter(|r| !r.error.is_empty()).count(), 1);
}

#[test]
fn strings_extraction_keeps_runs_of_min_length() {
    // "Hi" (2) and "Go" (2) are below the minimum; only "HelloWorld" stays.
    let mut reader = Cursor::new(b"Hi\x00HelloWorld\x01Go".to_vec());
    let strings = extract_strings(&mut reader, 4).unwrap();
    assert_eq!(strings, vec!["HelloWorld"]);
}

#[test]
fn strings_min_length_boundary() {
    let mut reader = Cursor::new(b"abc\x00abcd".to_vec());
    let strings = extract_strings(&mut reader, 4).unwrap();
    assert_eq!(strings, vec!["abcd"]);
}

#[test]
fn strings_deduplicated_in_first_occurrence_order() {
    let mut reader = Cursor::new(b"beta\x00alpha\x00beta\x00gamma".to_vec());
    let strings = extract_strings(&mut reader, 4).unwrap();
    assert_eq!(strings, vec!["beta", "alpha", "gamma"]);
}

#[test]
fn strings_run_survives_buffer_boundary() {
    // One printable run far larger than the 64 KiB read chunk must come
    // back as a single token.
    let mut content = vec![0u8; 10];
    content.extend(std::iter::repeat(b'A').take(65_000));
    content.push(0);
    content.extend_from_slice(b"word");
    let mut reader = Cursor::new(content);

    let strings = extract_strings(&mut reader, 4).unwrap();
    assert_eq!(strings.len(), 2);
    assert_eq!(strings[0].len(), 65_000);
    assert_eq!(strings[1], "word");
}

#[test]
fn strings_capped_at_ten_thousand_tokens() {
    let mut content = Vec::new();
    for i in 0..10_050 {
        content.extend_from_slice(format!("token{:05}", i).as_bytes());
        content.push(b'\n');
    }
    let mut reader = Cursor::new(content);

    let strings = extract_strings(&mut reader, 4).unwrap();
    assert_eq!(strings.len(), 10_000);
    assert_eq!(strings[0], "token00000");
    assert_eq!(strings[9_999], "token09999");
}

#[test]
fn process_file_with_strings_keeps_hash_and_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.bin");
    fs::write(&path, b"Hi\x00HelloWorld\x01Go").unwrap();

    let mut stage = HashStage::new(HashAlgorithm::Sha256, 1);
    stage.extract_strings = true;
    stage.string_min_length = 4;
    let record = stage.process_file(&path);

    assert!(record.error.is_empty());
    assert!(!record.hash.is_empty());
    assert_eq!(record.strings, Some(vec!["HelloWorld".to_string()]));
}
