//! vol installer library.
//!
//! This crate resolves, verifies, and installs prebuilt releases of the `vol`
//! build tool. It is used by the `vol-installer` CLI binary and can be
//! consumed programmatically for testing or custom installation workflows.
//!
//! # Modules
//!
//! - [`acceptance`] - Post-install acceptance test (`vol --version`)
//! - [`artefact`] - Release versions, digests, verification, and downloads
//! - [`authoring`] - Descriptor generation from local release files
//! - [`catalog`] - Descriptor catalog and download-plan resolution
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Installer configuration file and prefix resolution
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Semantic error types
//! - [`formula`] - Release descriptor model and validation
//! - [`list`] - List command implementation
//! - [`list_output`] - Output formatting for installed-file listing
//! - [`output`] - Progress, summary, and dry-run output
//! - [`pipeline`] - Fetch, verify, place, and test pipeline orchestration
//! - [`placement`] - Atomic copying of staged files into the prefix
//! - [`prefix`] - Install prefix layout and locking
//! - [`scanner`] - Scanner for files installed into a prefix
//! - [`uninstall`] - Removal of installed files

pub mod acceptance;
pub mod artefact;
pub mod authoring;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod error;
pub mod formula;
pub mod list;
pub mod list_output;
pub mod output;
pub mod pipeline;
pub mod placement;
pub mod prefix;
pub mod scanner;
pub mod uninstall;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
