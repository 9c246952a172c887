//! Error types for the vol installer.
//!
//! This module defines semantic error variants that provide actionable guidance
//! to users when installation fails. The three failure classes of the install
//! contract are [`InstallerError::UnresolvedVersion`],
//! [`InstallerError::Integrity`], and [`InstallerError::SmokeTest`]; the
//! remaining variants cover the ambient machinery around them.

use crate::artefact::download::DownloadError;
use crate::artefact::error::ArtefactError;
use crate::artefact::version::ReleaseVersion;
use crate::authoring::AuthoringError;
use crate::formula::FormulaError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur during the installation process.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// No descriptor (or no upstream release) exists for the requested
    /// version.
    #[error("no release found for vol {version}{hint}", hint = available_hint(.available))]
    UnresolvedVersion {
        /// The requested version.
        version: String,
        /// Versions the catalog does know about.
        available: Vec<ReleaseVersion>,
    },

    /// Downloaded bytes do not match the descriptor's digest.
    #[error("integrity check failed for {artefact}: expected sha256 {expected}, got {actual}")]
    Integrity {
        /// Logical name of the artefact.
        artefact: String,
        /// Digest declared by the descriptor.
        expected: String,
        /// Digest of the downloaded bytes.
        actual: String,
    },

    /// The installed executable failed its acceptance test.
    #[error("acceptance test `{command}` failed: {reason}")]
    SmokeTest {
        /// The command line that was run.
        command: String,
        /// Why the test failed (exit status, spawn error, timeout).
        reason: String,
    },

    /// An artefact could not be downloaded.
    #[error("failed to download {artefact}: {source}")]
    Download {
        /// Logical name of the artefact.
        artefact: String,
        /// Underlying download error.
        #[source]
        source: DownloadError,
    },

    /// A descriptor could not be loaded or is invalid.
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// A version or digest given on the command line is invalid.
    #[error(transparent)]
    Artefact(#[from] ArtefactError),

    /// A descriptor could not be authored from local files.
    #[error(transparent)]
    Authoring(#[from] AuthoringError),

    /// Two descriptors declare the same version.
    #[error("duplicate formula for vol {version}: {first} and {second}")]
    DuplicateFormula {
        /// The version declared twice.
        version: ReleaseVersion,
        /// Path of the first descriptor.
        first: Utf8PathBuf,
        /// Path of the second descriptor.
        second: Utf8PathBuf,
    },

    /// A file could not be placed into the prefix.
    #[error("failed to install {artefact} to {destination}: {reason}")]
    Placement {
        /// Logical name of the artefact.
        artefact: String,
        /// Destination path inside the prefix.
        destination: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Another install currently owns the prefix.
    #[error("install prefix {path} is locked by another installation")]
    PrefixLocked {
        /// The prefix that is locked.
        path: Utf8PathBuf,
    },

    /// The install prefix could not be determined or prepared.
    #[error("install prefix unavailable: {reason}")]
    PrefixUnavailable {
        /// Description of the failure.
        reason: String,
    },

    /// The installer configuration file is invalid.
    #[error("invalid configuration {path}: {reason}")]
    Config {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output could not be rendered as JSON.
    #[error("failed to render JSON output: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

impl InstallerError {
    /// Return true when the failure concerns bytes that must never be
    /// installed.
    #[must_use]
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }
}

fn available_hint(available: &[ReleaseVersion]) -> String {
    if available.is_empty() {
        return String::new();
    }
    let versions: Vec<&str> = available.iter().map(ReleaseVersion::as_str).collect();
    format!("; available: {}", versions.join(", "))
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn version(value: &str) -> ReleaseVersion {
        value.parse().expect("valid version")
    }

    #[test]
    fn unresolved_version_lists_available_releases() {
        let err = InstallerError::UnresolvedVersion {
            version: "9.9.9".to_owned(),
            available: vec![version("2.0.0"), version("2.0.23")],
        };
        let msg = err.to_string();
        assert!(msg.contains("9.9.9"));
        assert!(msg.contains("available: 2.0.0, 2.0.23"));
    }

    #[test]
    fn unresolved_version_without_catalog_omits_hint() {
        let err = InstallerError::UnresolvedVersion {
            version: "2.0.0".to_owned(),
            available: Vec::new(),
        };
        assert_eq!(err.to_string(), "no release found for vol 2.0.0");
    }

    #[test]
    fn integrity_error_includes_both_digests() {
        let err = InstallerError::Integrity {
            artefact: "vol".to_owned(),
            expected: "a".repeat(64),
            actual: "b".repeat(64),
        };
        let msg = err.to_string();
        assert!(msg.contains(&"a".repeat(64)));
        assert!(msg.contains(&"b".repeat(64)));
        assert!(err.is_integrity_failure());
    }

    #[test]
    fn smoke_test_error_includes_command() {
        let err = InstallerError::SmokeTest {
            command: "/opt/vol/bin/vol --version".to_owned(),
            reason: "exit status 1".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/opt/vol/bin/vol --version"));
        assert!(msg.contains("exit status 1"));
        assert!(!err.is_integrity_failure());
    }

    #[test]
    fn download_error_preserves_source() {
        let err = InstallerError::Download {
            artefact: "zsh-completion".to_owned(),
            source: DownloadError::NotFound {
                url: "https://example.test/_vol".to_owned(),
            },
        };
        assert!(err.to_string().contains("zsh-completion"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
