//! Install prefix layout and exclusive ownership.
//!
//! A prefix is the managed install root. Executables go to `bin/`, and
//! each shell's completion scripts go to the directory that shell searches
//! by default beneath the same root.

use crate::error::{InstallerError, Result};
use crate::formula::{Artefact, DestinationCategory, Shell};
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use log::{debug, warn};
use std::fs::{File, OpenOptions};

/// Name of the advisory lock file at the root of the prefix.
pub const LOCK_FILENAME: &str = ".vol-installer.lock";

/// The layout of an install prefix.
///
/// # Examples
///
/// ```
/// use vol_installer::formula::{DestinationCategory, Shell};
/// use vol_installer::prefix::InstallPrefix;
///
/// let prefix = InstallPrefix::new("/opt/vol");
/// assert_eq!(prefix.dir_for(DestinationCategory::Executable), "/opt/vol/bin");
/// assert_eq!(
///     prefix.dir_for(DestinationCategory::Completion(Shell::Bash)),
///     "/opt/vol/etc/bash_completion.d"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPrefix {
    root: Utf8PathBuf,
}

impl InstallPrefix {
    /// Create a prefix rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The prefix root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The executable directory.
    #[must_use]
    pub fn bin_dir(&self) -> Utf8PathBuf {
        self.root.join("bin")
    }

    /// The completion directory for `shell`.
    #[must_use]
    pub fn completion_dir(&self, shell: Shell) -> Utf8PathBuf {
        match shell {
            Shell::Zsh => self.root.join("share/zsh/site-functions"),
            Shell::Bash => self.root.join("etc/bash_completion.d"),
            Shell::Fish => self.root.join("share/fish/vendor_completions.d"),
        }
    }

    /// The directory for a destination category.
    #[must_use]
    pub fn dir_for(&self, category: DestinationCategory) -> Utf8PathBuf {
        match category {
            DestinationCategory::Executable => self.bin_dir(),
            DestinationCategory::Completion(shell) => self.completion_dir(shell),
        }
    }

    /// Where `artefact` lands once installed.
    #[must_use]
    pub fn destination_of(&self, artefact: &Artefact) -> Utf8PathBuf {
        self.dir_for(artefact.destination())
            .join(artefact.install_as())
    }

    /// Path of the advisory lock file.
    #[must_use]
    pub fn lock_path(&self) -> Utf8PathBuf {
        self.root.join(LOCK_FILENAME)
    }

    /// Take exclusive ownership of the prefix for one install.
    ///
    /// Creates the prefix root if needed. The lock is released when the
    /// returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::PrefixLocked`] when another process holds
    /// the lock, or [`InstallerError::PrefixUnavailable`] when the prefix or
    /// lock file cannot be created.
    pub fn lock(&self) -> Result<PrefixLock> {
        std::fs::create_dir_all(&self.root).map_err(|e| InstallerError::PrefixUnavailable {
            reason: format!("failed to create {}: {e}", self.root),
        })?;

        let path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| InstallerError::PrefixUnavailable {
                reason: format!("failed to open lock file {path}: {e}"),
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("acquired lock {path}");
                Ok(PrefixLock { file, path })
            }
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(InstallerError::PrefixLocked {
                    path: self.root.clone(),
                })
            }
            Err(e) => Err(InstallerError::PrefixUnavailable {
                reason: format!("failed to lock {path}: {e}"),
            }),
        }
    }
}

/// Guard holding the prefix lock.
#[derive(Debug)]
pub struct PrefixLock {
    file: File,
    path: Utf8PathBuf,
}

impl PrefixLock {
    /// Path of the locked file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for PrefixLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("failed to release lock {}: {e}", self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::formula_v2_0_23;
    use rstest::rstest;

    fn temp_prefix() -> (tempfile::TempDir, InstallPrefix) {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        (temp, InstallPrefix::new(root))
    }

    #[rstest]
    #[case(Shell::Zsh, "share/zsh/site-functions")]
    #[case(Shell::Bash, "etc/bash_completion.d")]
    #[case(Shell::Fish, "share/fish/vendor_completions.d")]
    fn completion_dirs_follow_shell_conventions(#[case] shell: Shell, #[case] relative: &str) {
        let prefix = InstallPrefix::new("/usr/local");
        assert!(prefix.completion_dir(shell).ends_with(relative));
    }

    #[test]
    fn bash_completion_destination_is_named_vol() {
        let prefix = InstallPrefix::new("/usr/local");
        let formula = formula_v2_0_23();
        let destinations: Vec<_> = formula
            .artefacts()
            .map(|artefact| prefix.destination_of(artefact))
            .collect();
        assert!(destinations.contains(&Utf8PathBuf::from("/usr/local/etc/bash_completion.d/vol")));
        assert!(destinations.contains(&Utf8PathBuf::from("/usr/local/bin/vol")));
    }

    #[test]
    fn second_lock_reports_prefix_locked() {
        let (_temp, prefix) = temp_prefix();
        let guard = prefix.lock().expect("first lock");

        let err = prefix.lock().expect_err("second lock contends");
        assert!(matches!(err, InstallerError::PrefixLocked { .. }));
        assert!(guard.path().ends_with(LOCK_FILENAME));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let (_temp, prefix) = temp_prefix();
        drop(prefix.lock().expect("first lock"));
        assert!(prefix.lock().is_ok());
    }

    #[test]
    fn lock_creates_missing_prefix() {
        let (_temp, parent) = temp_prefix();
        let prefix = InstallPrefix::new(parent.root().join("nested/prefix"));
        let _guard = prefix.lock().expect("lock creates root");
        assert!(prefix.root().is_dir());
    }
}
