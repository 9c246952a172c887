//! Scanner for files installed into a prefix.
//!
//! The files to look for come from a descriptor when one is available;
//! otherwise the conventional names are used (`bin/vol`, `_vol`, `vol`
//! and `vol.fish` in the per-shell completion directories).

use crate::formula::{BINARY_NAME, DestinationCategory, Formula, Shell};
use crate::prefix::InstallPrefix;
use camino::Utf8PathBuf;

/// One file a release places, and whether it is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledFile {
    /// Logical artefact name.
    pub name: String,
    /// Destination category.
    pub category: DestinationCategory,
    /// Expected path inside the prefix.
    pub path: Utf8PathBuf,
    /// Whether the file currently exists.
    pub present: bool,
}

/// Scan result for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledFiles {
    /// The scanned prefix.
    pub prefix: Utf8PathBuf,
    /// Every expected file, primary first.
    pub files: Vec<InstalledFile>,
}

impl InstalledFiles {
    /// Returns true if none of the expected files is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.files.iter().any(|file| file.present)
    }

    /// The files that are present.
    pub fn present(&self) -> impl Iterator<Item = &InstalledFile> {
        self.files.iter().filter(|file| file.present)
    }
}

/// Report which of the expected files exist under `prefix`.
#[must_use]
pub fn scan_installed(prefix: &InstallPrefix, formula: Option<&Formula>) -> InstalledFiles {
    let files = expected_targets(formula)
        .into_iter()
        .map(|(name, category, install_as)| {
            let path = prefix.dir_for(category).join(install_as);
            InstalledFile {
                present: path.is_file(),
                name,
                category,
                path,
            }
        })
        .collect();

    InstalledFiles {
        prefix: prefix.root().to_owned(),
        files,
    }
}

fn expected_targets(formula: Option<&Formula>) -> Vec<(String, DestinationCategory, String)> {
    match formula {
        Some(formula) => formula
            .artefacts()
            .map(|a| (a.name().to_owned(), a.destination(), a.install_as().to_owned()))
            .collect(),
        None => std::iter::once((
            BINARY_NAME.to_owned(),
            DestinationCategory::Executable,
            BINARY_NAME.to_owned(),
        ))
        .chain(Shell::ALL.into_iter().map(|shell| {
            (
                format!("{shell}-completion"),
                DestinationCategory::Completion(shell),
                conventional_completion_name(shell).to_owned(),
            )
        }))
        .collect(),
    }
}

fn conventional_completion_name(shell: Shell) -> &'static str {
    match shell {
        Shell::Zsh => "_vol",
        Shell::Bash => BINARY_NAME,
        Shell::Fish => "vol.fish",
    }
}
