//! Release version newtype.
//!
//! Versions are dotted-numeric identifiers such as `2.0.23`. A single
//! leading `v` (as used in release tags) is accepted and stripped, so
//! `v2.0.23` and `2.0.23` name the same release. Components are written
//! without leading zeros, so each release has exactly one spelling.

use super::error::{ArtefactError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A validated release version (e.g. `2.0.23`).
///
/// Ordering compares numeric components left to right; a version that is a
/// prefix of another sorts first, so `2.0 < 2.0.0`. Two versions are equal
/// only when they are spelt the same.
///
/// # Examples
///
/// ```
/// use vol_installer::artefact::version::ReleaseVersion;
///
/// let older: ReleaseVersion = "2.0.0".parse().expect("valid version");
/// let newer: ReleaseVersion = "v2.0.23".parse().expect("valid version");
/// assert!(older < newer);
/// assert_eq!(newer.as_str(), "2.0.23");
/// ```
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseVersion {
    raw: String,
    components: Vec<u64>,
}

impl ReleaseVersion {
    /// Return the version as written, without any tag prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Return the numeric components.
    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl FromStr for ReleaseVersion {
    type Err = ArtefactError;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let raw = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if raw.is_empty() {
            return Err(invalid(value, "version must not be empty"));
        }

        let components = raw
            .split('.')
            .map(|part| {
                if part.is_empty() {
                    return Err(invalid(value, "empty version component"));
                }
                if !part.bytes().all(|byte| byte.is_ascii_digit()) {
                    return Err(invalid(value, &format!("component \"{part}\" is not numeric")));
                }
                if part.len() > 1 && part.starts_with('0') {
                    return Err(invalid(
                        value,
                        &format!("component \"{part}\" has a leading zero"),
                    ));
                }
                part.parse::<u64>()
                    .map_err(|_| invalid(value, &format!("component \"{part}\" is not numeric")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: raw.to_owned(),
            components,
        })
    }
}

impl TryFrom<String> for ReleaseVersion {
    type Error = ArtefactError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl TryFrom<&str> for ReleaseVersion {
    type Error = ArtefactError;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

impl From<ReleaseVersion> for String {
    fn from(value: ReleaseVersion) -> Self {
        value.raw
    }
}

impl PartialEq for ReleaseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn invalid(value: &str, reason: &str) -> ArtefactError {
    ArtefactError::InvalidVersion {
        value: value.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn version(value: &str) -> ReleaseVersion {
        value.parse().expect("valid version")
    }

    #[rstest]
    #[case::plain("2.0.23", "2.0.23")]
    #[case::tagged("v2.0.0", "2.0.0")]
    #[case::padded(" 2.1 ", "2.1")]
    fn parses_and_normalises(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(version(input).as_str(), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::bare_prefix("v")]
    #[case::trailing_dot("2.0.")]
    #[case::alpha("2.0.beta")]
    #[case::negative("2.-1.0")]
    #[case::signed("2.+1.0")]
    #[case::leading_zero_major("02.0.0")]
    #[case::leading_zero_patch("2.0.023")]
    #[case::zero_padded("2.00.23")]
    fn rejects_invalid_versions(#[case] input: &str) {
        assert!(input.parse::<ReleaseVersion>().is_err());
    }

    #[test]
    fn orders_numerically_not_lexically() {
        assert!(version("2.0.9") < version("2.0.23"));
        assert!(version("2.0.23") < version("2.1"));
        assert!(version("10.0.0") > version("9.9.9"));
    }

    #[test]
    fn zero_components_are_accepted() {
        assert_eq!(version("0.10.0").components(), [0, 10, 0]);
    }

    #[test]
    fn extra_trailing_components_name_another_release() {
        assert_ne!(version("2.0"), version("2.0.0"));
        assert_ne!(version("2.0.0.0"), version("2.0.0"));
        assert!(version("2.0") < version("2.0.0"));
        assert!(version("2.0.0.0") < version("2.0.1"));
    }
}
