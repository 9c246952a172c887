//! SHA-256 digest newtype for artefact verification.
//!
//! Validates that the value is a 64-character lowercase hexadecimal string
//! representing a 256-bit hash digest.

use super::error::{ArtefactError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// A validated hex-encoded SHA-256 digest string.
///
/// # Examples
///
/// ```
/// use vol_installer::artefact::sha256_digest::Sha256Digest;
///
/// let hex = "a".repeat(64);
/// let digest: Sha256Digest = hex.as_str().try_into().unwrap();
/// assert_eq!(digest.as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap hex produced by a SHA-256 hasher.
    ///
    /// Hasher output is always 64 lowercase hex characters, so no
    /// validation runs here.
    pub(super) fn from_hex_output(hex: String) -> Self {
        debug_assert_eq!(hex.len(), DIGEST_HEX_LEN);
        Self(hex)
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<&str> for Sha256Digest {
    type Error = ArtefactError;

    fn try_from(value: &str) -> Result<Self> {
        validate_sha256(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for Sha256Digest {
    type Error = ArtefactError;

    fn try_from(value: String) -> Result<Self> {
        validate_sha256(&value)?;
        Ok(Self(value))
    }
}

impl From<Sha256Digest> for String {
    fn from(value: Sha256Digest) -> Self {
        value.0
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate that `value` is a well-formed hex-encoded SHA-256 digest.
fn validate_sha256(value: &str) -> Result<()> {
    if value.len() != DIGEST_HEX_LEN {
        return Err(ArtefactError::InvalidSha256Digest {
            reason: format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {}",
                value.len()
            ),
        });
    }
    if let Some(bad) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ArtefactError::InvalidSha256Digest {
            reason: format!("non-hex character '{bad}'"),
        });
    }
    if value.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ArtefactError::InvalidSha256Digest {
            reason: "digest must be lowercase".to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn valid_digest() -> String {
        "a".repeat(64)
    }

    #[test]
    fn accepts_valid_sixty_four_char_hex() {
        let digest = Sha256Digest::try_from(valid_digest().as_str());
        assert!(digest.is_ok());
    }

    #[rstest]
    #[case::too_short("abcdef")]
    #[case::placeholder("PLACEHOLDER_SHA256")]
    #[case::empty("")]
    fn rejects_malformed_digests(#[case] value: &str) {
        assert!(Sha256Digest::try_from(value).is_err());
    }

    #[test]
    fn rejects_non_hex_characters() {
        let mut bad = "a".repeat(63);
        bad.push('g');
        let err = Sha256Digest::try_from(bad.as_str()).expect_err("non-hex rejected");
        assert!(err.to_string().contains("non-hex character 'g'"));
    }

    #[test]
    fn rejects_uppercase_hex() {
        let result = Sha256Digest::try_from("A".repeat(64));
        assert!(result.is_err());
    }

    #[test]
    fn deserializes_through_validation() {
        #[derive(Debug, Deserialize)]
        struct Holder {
            sha256: Sha256Digest,
        }

        let ok: Holder = toml::from_str(&format!("sha256 = \"{}\"", valid_digest()))
            .expect("valid digest parses");
        assert_eq!(ok.sha256.as_str(), valid_digest());

        let bad = toml::from_str::<Holder>("sha256 = \"nope\"");
        assert!(bad.is_err());
    }
}
