//! Install pipeline orchestration.
//!
//! Drives one release through resolve → fetch → verify → place → test.
//! Every artefact is downloaded and verified into a private staging
//! directory before anything touches the prefix, so a failure of the
//! primary executable (or of a completion under the strict policy) leaves
//! the prefix exactly as it was.

use crate::acceptance::{CommandRunner, SystemCommandRunner, run_self_test};
use crate::artefact::download::{ArtefactDownloader, DownloadError, HttpDownloader};
use crate::artefact::verification::{CompletionFailurePolicy, verify_file};
use crate::catalog::{ResolvedArtefact, ResolvedRelease};
use crate::config::NetworkConfig;
use crate::error::{InstallerError, Result};
use crate::formula::Formula;
use crate::output::{success_message, write_stderr_line};
use crate::placement::{StagedArtefact, install};
use crate::prefix::InstallPrefix;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fmt;
use std::io::Write;
use std::time::Duration;

/// Lifecycle stage of one artefact during an install.
///
/// `Declared → Downloading → (Verified | IntegrityError) → Installed →
/// (Tested | SmokeTestError)`; only the primary executable is tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    /// Named by the descriptor, not yet fetched.
    Declared,
    /// Fetch started (and, if the artefact stops here, failed).
    Downloading,
    /// Downloaded bytes match the declared digest.
    Verified,
    /// Downloaded bytes do not match the declared digest.
    IntegrityError,
    /// Copied into the prefix.
    Installed,
    /// The installed executable passed its acceptance test.
    Tested,
    /// The installed executable failed its acceptance test.
    SmokeTestError,
}

impl InstallStage {
    /// Return true when `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Declared, Self::Downloading)
                | (Self::Downloading, Self::Verified | Self::IntegrityError)
                | (Self::Verified, Self::Installed)
                | (Self::Installed, Self::Tested | Self::SmokeTestError)
        )
    }

    /// Return true for stages no further transition leaves.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::IntegrityError | Self::Tested | Self::SmokeTestError
        )
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Declared => "declared",
            Self::Downloading => "downloading",
            Self::Verified => "verified",
            Self::IntegrityError => "integrity error",
            Self::Installed => "installed",
            Self::Tested => "tested",
            Self::SmokeTestError => "smoke test error",
        };
        f.write_str(label)
    }
}

/// Per-artefact outcome of an install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactReport {
    /// Logical artefact name.
    pub name: String,
    /// Last stage reached.
    pub stage: InstallStage,
    /// Installed path, once placed.
    pub destination: Option<Utf8PathBuf>,
    /// Why the artefact was skipped, for degraded installs.
    pub warning: Option<String>,
}

impl ArtefactReport {
    fn declared(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            stage: InstallStage::Declared,
            destination: None,
            warning: None,
        }
    }

    fn advance(&mut self, next: InstallStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal transition {} -> {next} for {}",
            self.stage,
            self.name
        );
        debug!("{}: {} -> {next}", self.name, self.stage);
        self.stage = next;
    }
}

/// Summary of one install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// The installed release version.
    pub version: String,
    /// The prefix installed into.
    pub prefix: Utf8PathBuf,
    /// One entry per declared artefact, primary first.
    pub artefacts: Vec<ArtefactReport>,
}

impl InstallReport {
    /// Paths placed into the prefix.
    #[must_use]
    pub fn placed(&self) -> Vec<&Utf8Path> {
        self.artefacts
            .iter()
            .filter_map(|artefact| artefact.destination.as_deref())
            .collect()
    }

    /// Warnings for skipped completions.
    #[must_use]
    pub fn warnings(&self) -> Vec<&str> {
        self.artefacts
            .iter()
            .filter_map(|artefact| artefact.warning.as_deref())
            .collect()
    }

    /// Return true when at least one completion was skipped.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.artefacts.iter().any(|a| a.warning.is_some())
    }

    /// Stage reached by the artefact called `name`.
    #[must_use]
    pub fn stage_of(&self, name: &str) -> Option<InstallStage> {
        self.artefacts
            .iter()
            .find(|artefact| artefact.name == name)
            .map(|artefact| artefact.stage)
    }
}

/// Settings for one install run.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Destination prefix.
    pub prefix: InstallPrefix,
    /// How completion-script failures propagate.
    pub completion_policy: CompletionFailurePolicy,
    /// Whether to run the acceptance test after placement.
    pub run_test: bool,
    /// Timeout for the acceptance test.
    pub test_timeout: Duration,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Install `formula` using the production HTTP downloader and process
/// runner.
///
/// # Errors
///
/// See [`install_release_with`].
pub fn install_release(
    formula: &Formula,
    options: &InstallOptions,
    network: &NetworkConfig,
    stderr: &mut dyn Write,
) -> Result<InstallReport> {
    let downloader = HttpDownloader::new(network.timeout(), network.retries);
    install_release_with(formula, options, &downloader, &SystemCommandRunner, stderr)
}

/// Testable inner function with injected dependencies.
///
/// # Errors
///
/// Returns [`InstallerError::PrefixLocked`] if another install owns the
/// prefix; [`InstallerError::UnresolvedVersion`] if upstream has no
/// primary asset for the version; [`InstallerError::Integrity`] or
/// [`InstallerError::Download`] for a primary failure (or a completion
/// failure under [`CompletionFailurePolicy::Fail`]), in which case nothing
/// is placed; [`InstallerError::Placement`] if copying fails; and
/// [`InstallerError::SmokeTest`] if the acceptance test fails.
pub fn install_release_with(
    formula: &Formula,
    options: &InstallOptions,
    downloader: &dyn ArtefactDownloader,
    runner: &dyn CommandRunner,
    stderr: &mut dyn Write,
) -> Result<InstallReport> {
    let prefix = &options.prefix;
    let _lock = prefix.lock()?;
    let release = ResolvedRelease::from_formula(formula);

    if !options.quiet {
        write_stderr_line(
            stderr,
            format!("Installing vol {} to {}...", release.version, prefix.root()),
        );
    }

    let staging = tempfile::tempdir()?;
    let staging_dir = Utf8Path::from_path(staging.path()).ok_or_else(|| {
        InstallerError::PrefixUnavailable {
            reason: "staging directory is not valid UTF-8".to_owned(),
        }
    })?;

    let mut reports = Vec::new();
    let mut staged = Vec::new();
    for (index, resolved) in release.artefacts().enumerate() {
        let mut report = ArtefactReport::declared(resolved.artefact.name());
        let path = staging_path(staging_dir, index, resolved.artefact.filename());
        match fetch_and_verify(resolved, path, downloader, &mut report, options, stderr) {
            Ok(path) => staged.push(StagedArtefact {
                artefact: resolved.artefact.clone(),
                path,
            }),
            Err(err) => {
                let err = classify_failure(&release, resolved, err);
                if resolved.artefact.is_primary()
                    || options.completion_policy == CompletionFailurePolicy::Fail
                {
                    return Err(err);
                }
                warn!("skipping {}: {err}", resolved.artefact.name());
                if !options.quiet {
                    write_stderr_line(
                        stderr,
                        format!("Warning: skipping {}: {err}", resolved.artefact.name()),
                    );
                }
                report.warning = Some(err.to_string());
            }
        }
        reports.push(report);
    }

    let placed = install(prefix, &staged)?;
    for (item, destination) in staged.iter().zip(placed) {
        if let Some(report) = reports
            .iter_mut()
            .find(|report| report.name == item.artefact.name())
        {
            report.advance(InstallStage::Installed);
            report.destination = Some(destination);
        }
    }

    if options.run_test {
        if !options.quiet {
            write_stderr_line(stderr, "Running acceptance test...");
        }
        let result = run_self_test(runner, prefix, formula, options.test_timeout);
        if let Some(primary) = reports.first_mut() {
            primary.advance(if result.is_ok() {
                InstallStage::Tested
            } else {
                InstallStage::SmokeTestError
            });
        }
        result?;
    }

    let report = InstallReport {
        version: release.version.to_string(),
        prefix: prefix.root().to_owned(),
        artefacts: reports,
    };

    if !options.quiet {
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, success_message(&report));
    }

    Ok(report)
}

/// Staging location of the artefact at `index` in the release.
///
/// The index prefix keeps every artefact's download apart, so a later
/// failed download never overwrites an earlier verified one.
fn staging_path(staging_dir: &Utf8Path, index: usize, filename: &str) -> Utf8PathBuf {
    staging_dir.join(format!("{index}-{filename}"))
}

/// Download one artefact to `path` and check its digest.
fn fetch_and_verify(
    resolved: &ResolvedArtefact,
    path: Utf8PathBuf,
    downloader: &dyn ArtefactDownloader,
    report: &mut ArtefactReport,
    options: &InstallOptions,
    stderr: &mut dyn Write,
) -> Result<Utf8PathBuf> {
    let artefact = &resolved.artefact;

    report.advance(InstallStage::Downloading);
    if !options.quiet {
        write_stderr_line(stderr, format!("Downloading {}...", artefact.filename()));
    }
    downloader
        .fetch(&resolved.url, path.as_std_path())
        .map_err(|source| InstallerError::Download {
            artefact: artefact.name().to_owned(),
            source,
        })?;

    let (matches, actual) = verify_file(path.as_std_path(), artefact.sha256())?;
    if !matches {
        report.advance(InstallStage::IntegrityError);
        return Err(InstallerError::Integrity {
            artefact: artefact.name().to_owned(),
            expected: artefact.sha256().to_string(),
            actual: actual.into_inner(),
        });
    }

    report.advance(InstallStage::Verified);
    Ok(path)
}

/// Map an upstream 404 for the primary executable to an unresolved version.
fn classify_failure(
    release: &ResolvedRelease,
    resolved: &ResolvedArtefact,
    err: InstallerError,
) -> InstallerError {
    match err {
        InstallerError::Download {
            source: DownloadError::NotFound { .. },
            ..
        } if resolved.artefact.is_primary() => InstallerError::UnresolvedVersion {
            version: release.version.to_string(),
            available: Vec::new(),
        },
        other => other,
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
