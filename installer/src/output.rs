//! Output formatting for the installer CLI.
//!
//! User-facing progress and summaries go to an injected writer (stderr in
//! the binary) so tests can capture them.

use crate::catalog::ResolvedRelease;
use crate::error::Result;
use crate::pipeline::InstallReport;
use crate::prefix::InstallPrefix;
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Render `value` as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`crate::error::InstallerError::Json`] if `value` cannot be
/// represented in JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Format a success message after installation.
#[must_use]
pub fn success_message(report: &InstallReport) -> String {
    let count = report.placed().len();
    let plural = if count == 1 { "file" } else { "files" };
    let summary = format!(
        "Successfully installed vol {} ({count} {plural}) to {}",
        report.version, report.prefix
    );
    match report.warnings().len() {
        0 => summary,
        skipped => format!("{summary}; {skipped} completion(s) skipped"),
    }
}

/// Describes what an install would do, without side effects.
///
/// # Example
///
/// ```
/// use vol_installer::catalog::ResolvedRelease;
/// use vol_installer::formula::Formula;
/// use vol_installer::output::DryRunInfo;
/// use vol_installer::prefix::InstallPrefix;
///
/// let formula = Formula::parse(&format!(
///     concat!(
///         "description = \"Universal build tool\"\n",
///         "homepage = \"https://github.com/pluttan/volumes\"\n",
///         "version = \"2.0.0\"\n",
///         "license = \"MIT\"\n",
///         "[binary]\n",
///         "filename = \"vol\"\n",
///         "sha256 = \"{}\"\n",
///     ),
///     "0".repeat(64)
/// ))
/// .expect("valid formula");
/// let release = ResolvedRelease::from_formula(&formula);
/// let prefix = InstallPrefix::new("/opt/vol");
/// let info = DryRunInfo {
///     release: &release,
///     prefix: &prefix,
///     run_test: true,
/// };
///
/// let output = info.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("/opt/vol/bin/vol"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The resolved release.
    pub release: &'a ResolvedRelease,
    /// The destination prefix.
    pub prefix: &'a InstallPrefix,
    /// Whether the acceptance test would run.
    pub run_test: bool,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Version: {}", self.release.version),
            format!("Prefix: {}", self.prefix.root()),
            format!("Acceptance test: {}", if self.run_test { "yes" } else { "no" }),
            String::new(),
            "Artefacts:".to_owned(),
        ];
        for resolved in self.release.artefacts() {
            lines.push(format!("  - {}", resolved.artefact.name()));
            lines.push(format!("      from   {}", resolved.url));
            lines.push(format!("      sha256 {}", resolved.sha256()));
            lines.push(format!(
                "      to     {}",
                self.prefix.destination_of(&resolved.artefact)
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ArtefactReport, InstallStage};
    use crate::test_utils::formula_v2_0_23;
    use camino::Utf8PathBuf;

    fn report(warning: Option<&str>) -> InstallReport {
        InstallReport {
            version: "2.0.23".to_owned(),
            prefix: Utf8PathBuf::from("/opt/vol"),
            artefacts: vec![
                ArtefactReport {
                    name: "vol".to_owned(),
                    stage: InstallStage::Tested,
                    destination: Some(Utf8PathBuf::from("/opt/vol/bin/vol")),
                    warning: None,
                },
                ArtefactReport {
                    name: "zsh-completion".to_owned(),
                    stage: InstallStage::IntegrityError,
                    destination: None,
                    warning: warning.map(str::to_owned),
                },
            ],
        }
    }

    #[test]
    fn success_message_uses_singular_for_one_file() {
        let message = success_message(&report(None));
        assert_eq!(
            message,
            "Successfully installed vol 2.0.23 (1 file) to /opt/vol"
        );
    }

    #[test]
    fn success_message_mentions_skipped_completions() {
        let message = success_message(&report(Some("integrity check failed")));
        assert!(message.ends_with("; 1 completion(s) skipped"));
    }

    #[test]
    fn dry_run_lists_bash_destination_as_vol() {
        let release = ResolvedRelease::from_formula(&formula_v2_0_23());
        let prefix = InstallPrefix::new("/opt/vol");
        let text = DryRunInfo {
            release: &release,
            prefix: &prefix,
            run_test: false,
        }
        .display_text();

        assert!(text.contains("/opt/vol/etc/bash_completion.d/vol"));
        assert!(text.contains("/v2.0.23/vol.bash"));
        assert!(text.contains("Acceptance test: no"));
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "hello");
        assert_eq!(buffer, b"hello\n");
    }

    #[test]
    fn to_json_reports_unrepresentable_values() {
        let mut value = std::collections::BTreeMap::new();
        value.insert((1_u8, 2_u8), "tuple keys have no JSON form");

        let err = to_json(&value).expect_err("non-string map key");
        assert!(matches!(err, crate::error::InstallerError::Json(_)), "got {err:?}");
    }
}
