//! Directory resolution for platform-specific paths.
//!
//! The installer needs the user's home directory (for the default
//! `~/.local` prefix) and its own configuration directory. Both are
//! abstracted behind [`BaseDirs`] so tests can substitute fixed paths.

use directories_next::ProjectDirs;
use std::path::PathBuf;

/// Application name used for the configuration directory.
const APPLICATION: &str = "vol-installer";

/// Resolves base directories used by the installer.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The current user's home directory.
    fn home_dir(&self) -> Option<PathBuf>;

    /// The installer's configuration directory, e.g.
    /// `~/.config/vol-installer` on Linux.
    fn config_dir(&self) -> Option<PathBuf>;
}

/// Directory resolver backed by the host platform conventions.
///
/// # Examples
///
/// ```no_run
/// use vol_installer::dirs::{BaseDirs, SystemBaseDirs};
///
/// let dirs = SystemBaseDirs::new().expect("failed to initialise directories");
/// println!("home: {:?}", dirs.home_dir());
/// ```
#[derive(Debug, Clone)]
pub struct SystemBaseDirs {
    base: directories_next::BaseDirs,
    project: Option<ProjectDirs>,
}

impl SystemBaseDirs {
    /// Resolve the platform directories, or `None` when no home directory
    /// can be determined.
    #[must_use]
    pub fn new() -> Option<Self> {
        Some(Self {
            base: directories_next::BaseDirs::new()?,
            project: ProjectDirs::from("", "", APPLICATION),
        })
    }
}

impl BaseDirs for SystemBaseDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        Some(self.base.home_dir().to_path_buf())
    }

    fn config_dir(&self) -> Option<PathBuf> {
        self.project
            .as_ref()
            .map(|project| project.config_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_config_dir_names_the_application() {
        // Containers without a home directory cannot resolve anything.
        let Some(dirs) = SystemBaseDirs::new() else {
            return;
        };
        let Some(config) = dirs.config_dir() else {
            return;
        };
        assert!(config.to_string_lossy().contains(APPLICATION));
    }
}
