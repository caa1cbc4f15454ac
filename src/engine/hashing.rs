//! Streaming file digests.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::io::Read;

use crate::types::HashAlgorithm;
use crate::utils::config::HashingConsts;

/// One in-progress digest, dispatched once per file rather than per update.
enum FileDigest {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl FileDigest {
    fn new(algorithm: HashAlgorithm) -> FileDigest {
        match algorithm {
            HashAlgorithm::Md5 => FileDigest::Md5(Md5::new()),
            HashAlgorithm::Sha1 => FileDigest::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => FileDigest::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => FileDigest::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            FileDigest::Md5(h) => h.update(data),
            FileDigest::Sha1(h) => h.update(data),
            FileDigest::Sha256(h) => h.update(data),
            FileDigest::Sha512(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            FileDigest::Md5(h) => format!("{:x}", h.finalize()),
            FileDigest::Sha1(h) => format!("{:x}", h.finalize()),
            FileDigest::Sha256(h) => format!("{:x}", h.finalize()),
            FileDigest::Sha512(h) => format!("{:x}", h.finalize()),
        }
    }
}

/// Stream `reader` through `algorithm` using a fixed-size chunk buffer and
/// return the lowercase hex digest.
pub fn hash_reader<R: Read>(reader: &mut R, algorithm: HashAlgorithm) -> std::io::Result<String> {
    let mut digest = FileDigest::new(algorithm);
    let mut buf = vec![0u8; HashingConsts::READ_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        digest.update(&buf[..n]);
    }
    Ok(digest.finalize_hex())
}
