//! Release versions, digests, integrity verification, and downloads.
//!
//! These are the value types and I/O seams shared by the descriptor, the
//! catalog, and the install pipeline.
//!
//! # Sub-modules
//!
//! - [`download`] — Artefact download trait and HTTP implementation.
//! - [`error`] — Semantic error types for validation failures.
//! - [`sha256_digest`] — SHA-256 digest newtype (`Sha256Digest`).
//! - [`verification`] — Digest computation, `verify`, and completion
//!   failure policy.
//! - [`version`] — Release version newtype (`ReleaseVersion`).

pub mod download;
pub mod error;
pub mod sha256_digest;
pub mod verification;
pub mod version;
