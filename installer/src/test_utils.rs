//! Shared test utilities for the installer crate.
//!
//! Fixture release assets are tiny shell scripts whose digests are computed
//! at runtime, so descriptors built here always carry real SHA-256 values.

use crate::acceptance::{CommandRunner, RunOutcome};
use crate::artefact::download::{ArtefactDownloader, DownloadError};
use crate::artefact::verification::digest_bytes;
use crate::formula::{Formula, FormulaParams, Shell};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::process::{ExitStatus, Output};
use std::time::Duration;

/// Release asset of the primary executable.
pub const BINARY_FILENAME: &str = "vol";

/// Bytes served for the primary executable.
pub const BINARY_BYTES: &[u8] = b"#!/bin/sh\necho \"vol 2.0.23\"\n";

/// Asset filename and bytes of the completion script for `shell`.
#[must_use]
pub fn completion_fixture(shell: Shell) -> (&'static str, &'static [u8]) {
    match shell {
        Shell::Zsh => ("_vol", b"#compdef vol\n_arguments '--version[print version]'\n"),
        Shell::Bash => ("vol.bash", b"complete -W '--version --help' vol\n"),
        Shell::Fish => (
            "vol.fish",
            b"complete -c vol -l version -d 'Print version'\n",
        ),
    }
}

/// Build a descriptor for `version` shipping completions for `shells`.
///
/// # Panics
///
/// Panics if `version` is not a valid release version.
#[must_use]
#[expect(clippy::expect_used, reason = "fixture inputs are constant")]
pub fn formula_with(version: &str, shells: &[Shell]) -> Formula {
    let params = FormulaParams {
        description: "Universal build tool with beautiful terminal output".to_owned(),
        homepage: "https://github.com/pluttan/volumes".to_owned(),
        version: version.parse().expect("fixture version"),
        license: "MIT".to_owned(),
        binary: (BINARY_FILENAME.to_owned(), digest_bytes(BINARY_BYTES)),
        completions: shells
            .iter()
            .map(|&shell| {
                let (filename, bytes) = completion_fixture(shell);
                (shell, filename.to_owned(), digest_bytes(bytes))
            })
            .collect(),
    };
    Formula::try_from(params).expect("fixture formula")
}

/// The 2.0.0 release: primary executable only.
#[must_use]
pub fn formula_v2_0_0() -> Formula {
    formula_with("2.0.0", &[])
}

/// The 2.0.23 release: primary executable plus three completion scripts.
#[must_use]
pub fn formula_v2_0_23() -> Formula {
    formula_with("2.0.23", &Shell::ALL)
}

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// How a stubbed upstream answers a request for one asset.
#[derive(Debug, Clone)]
pub enum StubAsset {
    /// Serve these bytes.
    Bytes(Vec<u8>),
    /// Answer with HTTP 404.
    NotFound,
    /// Fail at the transport level.
    Unreachable,
}

/// An in-memory `ArtefactDownloader` keyed by asset filename.
#[derive(Debug, Default)]
pub struct StubDownloader {
    assets: HashMap<String, StubAsset>,
    requests: RefCell<Vec<String>>,
}

impl StubDownloader {
    /// A downloader serving the genuine bytes of every fixture asset.
    #[must_use]
    pub fn serving_fixtures() -> Self {
        let mut assets = HashMap::new();
        assets.insert(
            BINARY_FILENAME.to_owned(),
            StubAsset::Bytes(BINARY_BYTES.to_vec()),
        );
        for shell in Shell::ALL {
            let (filename, bytes) = completion_fixture(shell);
            assets.insert(filename.to_owned(), StubAsset::Bytes(bytes.to_vec()));
        }
        Self {
            assets,
            requests: RefCell::default(),
        }
    }

    /// Replace how `filename` is served.
    #[must_use]
    pub fn with_asset(mut self, filename: &str, asset: StubAsset) -> Self {
        self.assets.insert(filename.to_owned(), asset);
        self
    }

    /// Serve `filename` with its first byte flipped.
    #[must_use]
    pub fn corrupting(self, filename: &str) -> Self {
        let mut bytes = match self.assets.get(filename) {
            Some(StubAsset::Bytes(bytes)) => bytes.clone(),
            _ => Vec::new(),
        };
        match bytes.first_mut() {
            Some(first) => *first ^= 0xff,
            None => bytes.push(0),
        }
        self.with_asset(filename, StubAsset::Bytes(bytes))
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl ArtefactDownloader for StubDownloader {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        self.requests.borrow_mut().push(url.to_owned());
        let filename = url.rsplit('/').next().unwrap_or_default();
        match self.assets.get(filename) {
            Some(StubAsset::Bytes(bytes)) => std::fs::write(dest, bytes).map_err(DownloadError::Io),
            Some(StubAsset::Unreachable) => Err(DownloadError::HttpError {
                url: url.to_owned(),
                reason: "connection refused".to_owned(),
            }),
            Some(StubAsset::NotFound) | None => Err(DownloadError::NotFound {
                url: url.to_owned(),
            }),
        }
    }
}

/// Behaviour of a stubbed acceptance-test command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubOutcome {
    /// The command exits with this code.
    Exit(i32),
    /// The command cannot be spawned.
    SpawnFailure,
    /// The command outlives its timeout.
    Timeout,
}

/// A stub implementation of `CommandRunner` for testing.
///
/// Returns the same outcome for every invocation and records the command
/// lines it was asked to run.
#[derive(Debug)]
pub struct StubRunner {
    outcome: StubOutcome,
    calls: RefCell<Vec<(Utf8PathBuf, Vec<String>)>>,
}

impl StubRunner {
    /// Creates a runner that answers every invocation with `outcome`.
    #[must_use]
    pub fn new(outcome: StubOutcome) -> Self {
        Self {
            outcome,
            calls: RefCell::default(),
        }
    }

    /// Command lines run so far.
    #[must_use]
    pub fn calls(&self) -> Vec<(Utf8PathBuf, Vec<String>)> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for StubRunner {
    fn run(
        &self,
        program: &Utf8Path,
        args: &[String],
        _timeout: Duration,
    ) -> std::io::Result<RunOutcome> {
        self.calls
            .borrow_mut()
            .push((program.to_owned(), args.to_vec()));
        match self.outcome {
            StubOutcome::Exit(code) => Ok(RunOutcome::Completed(Output {
                status: exit_status(code),
                stdout: b"vol 2.0.23\n".to_vec(),
                stderr: Vec::new(),
            })),
            StubOutcome::SpawnFailure => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No such file or directory",
            )),
            StubOutcome::Timeout => Ok(RunOutcome::TimedOut),
        }
    }
}
