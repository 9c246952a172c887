//! Error types for release versions, digests, and descriptor values.
//!
//! Each variant provides a descriptive message identifying the invalid input
//! and the constraint that was violated.

use thiserror::Error;

/// Errors arising from invalid artefact-related values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtefactError {
    /// A release version string is empty or not dotted-numeric.
    #[error("invalid release version \"{value}\": {reason}")]
    InvalidVersion {
        /// The rejected version string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A SHA-256 digest is not a valid 64-character hex string.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidSha256Digest {
        /// Description of the validation failure.
        reason: String,
    },

    /// A filename would escape its destination directory.
    #[error("invalid filename \"{value}\": {reason}")]
    InvalidFilename {
        /// The rejected filename.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },
}

/// Result type alias using [`ArtefactError`].
pub type Result<T> = std::result::Result<T, ArtefactError>;
