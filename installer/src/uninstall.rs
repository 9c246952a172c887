//! Removal of installed files.
//!
//! Only the files a release places are removed. Directories, the lock file,
//! and anything else in the prefix are left alone.

use crate::error::{InstallerError, Result};
use crate::formula::Formula;
use crate::prefix::InstallPrefix;
use crate::scanner::scan_installed;
use camino::Utf8PathBuf;
use log::debug;

/// Remove every installed file of `formula` (or the conventional names when
/// `None`) from `prefix`, returning the removed paths.
///
/// # Errors
///
/// Returns [`InstallerError::PrefixLocked`] if an install currently owns
/// the prefix, or [`InstallerError::Placement`] if a file cannot be
/// removed.
pub fn uninstall(prefix: &InstallPrefix, formula: Option<&Formula>) -> Result<Vec<Utf8PathBuf>> {
    let scan = scan_installed(prefix, formula);
    if scan.is_empty() {
        return Ok(Vec::new());
    }

    let _lock = prefix.lock()?;
    let mut removed = Vec::new();
    for file in scan.present() {
        std::fs::remove_file(&file.path).map_err(|e| InstallerError::Placement {
            artefact: file.name.clone(),
            destination: file.path.clone(),
            reason: format!("failed to remove: {e}"),
        })?;
        debug!("removed {}", file.path);
        removed.push(file.path.clone());
    }
    Ok(removed)
}
