//! Output formatting for installed-file listing.
//!
//! This module provides utilities to format scan results for
//! human-readable or JSON output.

use serde::Serialize;

use crate::error::Result;
use crate::output::to_json;
use crate::scanner::InstalledFiles;

/// Format installed files for human-readable output.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use vol_installer::list_output::format_human;
/// use vol_installer::scanner::InstalledFiles;
///
/// let scan = InstalledFiles {
///     prefix: Utf8PathBuf::from("/opt/vol"),
///     files: Vec::new(),
/// };
/// let output = format_human(&scan);
/// assert!(output.contains("vol is not installed"));
/// ```
#[must_use]
pub fn format_human(scan: &InstalledFiles) -> String {
    if scan.is_empty() {
        return format!(
            "vol is not installed in {}.\n\nRun `vol-installer install` to install it.",
            scan.prefix
        );
    }

    let mut lines = vec![format!("Installed files in {}:", scan.prefix), String::new()];
    for file in &scan.files {
        let marker = if file.present { "" } else { " (missing)" };
        lines.push(format!("  {:<16} {}{marker}", file.name, file.path));
    }
    lines.join("\n")
}

/// Format installed files as JSON.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use vol_installer::list_output::format_json;
/// use vol_installer::scanner::InstalledFiles;
///
/// let scan = InstalledFiles {
///     prefix: Utf8PathBuf::from("/opt/vol"),
///     files: Vec::new(),
/// };
/// let json = format_json(&scan).expect("serialisable scan");
/// assert!(json.contains("\"files\""));
/// ```
///
/// # Errors
///
/// Returns [`crate::error::InstallerError::Json`] if serialisation fails.
pub fn format_json(scan: &InstalledFiles) -> Result<String> {
    to_json(&InstalledFilesJson::from(scan))
}

/// JSON-serializable representation of a scan.
#[derive(Debug, Serialize)]
pub struct InstalledFilesJson<'a> {
    /// The scanned prefix.
    pub prefix: &'a str,
    /// Whether any expected file is present.
    pub installed: bool,
    /// Every expected file.
    pub files: Vec<FileEntry<'a>>,
}

/// JSON entry for one file.
#[derive(Debug, Serialize)]
pub struct FileEntry<'a> {
    /// Logical artefact name.
    pub name: &'a str,
    /// Destination category.
    pub category: String,
    /// Expected path.
    pub path: &'a str,
    /// Whether the file exists.
    pub present: bool,
}

impl<'a> From<&'a InstalledFiles> for InstalledFilesJson<'a> {
    fn from(scan: &'a InstalledFiles) -> Self {
        Self {
            prefix: scan.prefix.as_str(),
            installed: !scan.is_empty(),
            files: scan
                .files
                .iter()
                .map(|file| FileEntry {
                    name: &file.name,
                    category: file.category.to_string(),
                    path: file.path.as_str(),
                    present: file.present,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{DestinationCategory, Shell};
    use crate::scanner::InstalledFile;
    use camino::Utf8PathBuf;

    fn sample_scan() -> InstalledFiles {
        InstalledFiles {
            prefix: Utf8PathBuf::from("/opt/vol"),
            files: vec![
                InstalledFile {
                    name: "vol".to_owned(),
                    category: DestinationCategory::Executable,
                    path: Utf8PathBuf::from("/opt/vol/bin/vol"),
                    present: true,
                },
                InstalledFile {
                    name: "fish-completion".to_owned(),
                    category: DestinationCategory::Completion(Shell::Fish),
                    path: Utf8PathBuf::from("/opt/vol/share/fish/vendor_completions.d/vol.fish"),
                    present: false,
                },
            ],
        }
    }

    #[test]
    fn human_output_marks_missing_files() {
        let output = format_human(&sample_scan());
        assert!(output.starts_with("Installed files in /opt/vol:"));
        assert!(output.contains("/opt/vol/bin/vol\n"));
        assert!(output.contains("vol.fish (missing)"));
    }

    #[test]
    fn json_output_is_valid_and_complete() {
        let json = format_json(&sample_scan()).expect("serialisable scan");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");

        assert_eq!(value["installed"], true);
        assert_eq!(value["files"][0]["category"], "executables");
        assert_eq!(value["files"][1]["present"], false);
    }
}
