//! Content verification primitives for cached artifacts.
//!
//! Provides incremental hashing behind a minimal [`Hasher`] trait and
//! streaming file verification. Files are hashed in fixed-size chunks, never
//! loaded whole, so multi-hundred-megabyte artifacts verify in constant
//! memory.

pub use error::{Result, VerifyError};
pub use hasher::{Hasher, Sha1Hasher, Sha256Hasher};

use std::fs::File;
use std::io::Read;
use std::path::Path;

mod error;
mod hasher;

const CHUNK_SIZE: usize = 64 * 1024;

/// Stream `reader` through `hasher` and return the finalized digest.
pub fn hash_reader<H: Hasher>(mut reader: impl Read, mut hasher: H) -> Result<Vec<u8>> {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Stream the file at `path` through `hasher` and return the digest.
pub fn hash_file<H: Hasher>(path: impl AsRef<Path>, hasher: H) -> Result<Vec<u8>> {
    hash_reader(File::open(path)?, hasher)
}

/// Stream the file at `path` into an already-running `hasher` without
/// finalizing it. Used by mapping layers feeding a shared accumulator.
pub fn hash_file_into(path: impl AsRef<Path>, hasher: &mut dyn Hasher) -> Result<()> {
    let mut reader = File::open(path)?;
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        hasher.update(&buf[..n]);
    }
}

/// Compare the digest of the file at `path` against `expected_hex`,
/// case-insensitively.
///
/// Returns `Ok(false)` on mismatch; the caller decides whether a mismatch is
/// fatal or triggers a re-fetch. An expected digest the caller does not have
/// is the caller's "trust existence" policy, not a concern of this function.
pub fn matches<H: Hasher>(path: impl AsRef<Path>, expected_hex: &str, hasher: H) -> Result<bool> {
    let actual = hash_file(path, hasher)?;
    Ok(hex::encode(actual).eq_ignore_ascii_case(expected_hex))
}

/// [`matches`] with the SHA-1 digest the upstream artifact metadata uses.
pub fn matches_sha1(path: impl AsRef<Path>, expected_hex: &str) -> Result<bool> {
    matches(path, expected_hex, Sha1Hasher::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn matches_known_sha1_vector() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data");
        std::fs::write(&path, b"hello world").unwrap();

        // SHA-1 of "hello world"
        let expected = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";
        assert!(matches_sha1(&path, expected).unwrap());
        assert!(matches_sha1(&path, &expected.to_uppercase()).unwrap());
    }

    #[test]
    fn corrupting_one_byte_flips_the_result() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data");
        std::fs::write(&path, b"hello world").unwrap();
        let expected = hex::encode(hash_file(&path, Sha1Hasher::new()).unwrap());
        assert!(matches_sha1(&path, &expected).unwrap());

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] ^= 0x01;
        std::fs::write(&path, &bytes).unwrap();
        assert!(!matches_sha1(&path, &expected).unwrap());
    }

    #[test]
    fn hash_reader_streams_in_chunks() {
        // Larger than one chunk so the loop takes more than one pass.
        let data = vec![0xabu8; CHUNK_SIZE * 2 + 17];
        let streamed = hash_reader(&data[..], Sha256Hasher::new()).unwrap();
        let whole = Sha256Hasher::digest(&data);
        assert_eq!(streamed, whole);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let err = matches_sha1(dir.path().join("absent"), "00").unwrap_err();
        assert!(matches!(err, VerifyError::Io(_)));
    }

    #[test]
    fn hash_file_into_feeds_a_dyn_accumulator() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"layer bytes").unwrap();
        drop(f);

        let mut hasher = Sha256Hasher::new();
        hash_file_into(&path, &mut hasher).unwrap();
        assert_eq!(hasher.finalize(), Sha256Hasher::digest(b"layer bytes"));
    }
}
