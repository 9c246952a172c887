//! Integrity verification for downloaded artefacts.
//!
//! Every artefact a descriptor names carries an expected SHA-256 digest.
//! Verification is never optional: bytes whose digest differs from the
//! descriptor are not placed into the install prefix. What differs between
//! artefacts is only how a failure propagates, which
//! [`CompletionFailurePolicy`] captures for completion scripts.

use super::sha256_digest::Sha256Digest;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Compute the SHA-256 digest of an in-memory buffer.
///
/// # Examples
///
/// ```
/// use vol_installer::artefact::verification::digest_bytes;
///
/// let digest = digest_bytes(b"");
/// assert_eq!(
///     digest.as_str(),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn digest_bytes(bytes: &[u8]) -> Sha256Digest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    finish(hasher)
}

/// Compute the SHA-256 digest of a file, reading it in chunks.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub fn digest_file(path: &Path) -> io::Result<Sha256Digest> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Ok(finish(hasher))
}

/// Return true iff the SHA-256 of `bytes` equals `expected`.
///
/// # Examples
///
/// ```
/// use vol_installer::artefact::verification::{digest_bytes, verify};
///
/// let expected = digest_bytes(b"vol");
/// assert!(verify(b"vol", &expected));
/// assert!(!verify(b"vom", &expected));
/// ```
#[must_use]
pub fn verify(bytes: &[u8], expected: &Sha256Digest) -> bool {
    digest_bytes(bytes) == *expected
}

/// Compare the digest of the file at `path` against `expected`.
///
/// Returns the actual digest alongside the verdict so callers can report
/// both values on mismatch.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn verify_file(path: &Path, expected: &Sha256Digest) -> io::Result<(bool, Sha256Digest)> {
    let actual = digest_file(path)?;
    Ok((actual == *expected, actual))
}

fn finish(hasher: Sha256) -> Sha256Digest {
    Sha256Digest::from_hex_output(format!("{:x}", hasher.finalize()))
}

/// How a completion-script failure affects the install as a whole.
///
/// The primary binary is always fatal: without it there is no usable tool.
/// Completion scripts are optional conveniences, so by default a failed
/// download or integrity check is reported and the remaining artefacts are
/// still installed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionFailurePolicy {
    /// Skip the failed completion, warn, and continue (degraded install).
    #[default]
    Warn,
    /// Abort the install before placing any file.
    Fail,
}

impl fmt::Display for CompletionFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warn => write!(f, "skip failed completions with a warning"),
            Self::Fail => write!(f, "abort on failed completions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = b"#!/bin/sh\necho vol 2.0.23\n";

    #[test]
    fn verify_accepts_matching_bytes() {
        let expected = digest_bytes(PAYLOAD);
        assert!(verify(PAYLOAD, &expected));
    }

    #[test]
    fn verify_rejects_every_single_byte_mutation() {
        let expected = digest_bytes(PAYLOAD);
        for index in 0..PAYLOAD.len() {
            let mut mutated = PAYLOAD.to_vec();
            if let Some(byte) = mutated.get_mut(index) {
                *byte ^= 0x01;
            }
            assert!(
                !verify(&mutated, &expected),
                "mutation at byte {index} was not detected"
            );
        }
    }

    #[test]
    fn verify_rejects_truncation_and_extension() {
        let expected = digest_bytes(PAYLOAD);
        assert!(!verify(&PAYLOAD[..PAYLOAD.len() - 1], &expected));
        let mut extended = PAYLOAD.to_vec();
        extended.push(b'\n');
        assert!(!verify(&extended, &expected));
    }

    #[test]
    fn file_digest_matches_buffer_digest() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("vol");
        // Larger than one read buffer to exercise chunking.
        let content = PAYLOAD.repeat(1024);
        std::fs::write(&path, &content).expect("write payload");

        let (matches, actual) = verify_file(&path, &digest_bytes(&content)).expect("readable");
        assert!(matches);
        assert_eq!(actual, digest_bytes(&content));
    }

    #[test]
    fn verify_file_reports_actual_digest_on_mismatch() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("vol");
        std::fs::write(&path, b"tampered").expect("write payload");

        let (matches, actual) = verify_file(&path, &digest_bytes(PAYLOAD)).expect("readable");
        assert!(!matches);
        assert_eq!(actual, digest_bytes(b"tampered"));
    }

    #[test]
    fn default_completion_policy_is_warn() {
        assert_eq!(
            CompletionFailurePolicy::default(),
            CompletionFailurePolicy::Warn
        );
        assert_eq!(
            CompletionFailurePolicy::Warn.to_string(),
            "skip failed completions with a warning"
        );
    }
}
