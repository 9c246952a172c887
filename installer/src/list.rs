//! List command implementation.
//!
//! This module provides the `run_list` command handler, which scans an
//! install prefix for the files a `vol` release places and formats the
//! result for display.

use std::io::Write;

use crate::cli::ListArgs;
use crate::config::InstallerConfig;
use crate::dirs::BaseDirs;
use crate::error::{InstallerError, Result};
use crate::list_output::{format_human, format_json};
use crate::prefix::InstallPrefix;
use crate::scanner::scan_installed;

/// Lists the `vol` files installed in the selected prefix.
///
/// Output is written to `stdout` (human-readable by default, JSON with
/// `--json`).
///
/// # Errors
///
/// Returns an error if:
/// - The configuration file is invalid
/// - No prefix can be determined
/// - The JSON output cannot be rendered
/// - Writing to stdout fails
pub fn run_list(args: &ListArgs, dirs: &dyn BaseDirs, stdout: &mut dyn Write) -> Result<()> {
    let config = InstallerConfig::load(dirs)?;
    run_list_with(args, &config, dirs, stdout)
}

/// Internal implementation with an injected configuration for testability.
fn run_list_with(
    args: &ListArgs,
    config: &InstallerConfig,
    dirs: &dyn BaseDirs,
    stdout: &mut dyn Write,
) -> Result<()> {
    let root = config.resolve_prefix(args.prefix.as_deref(), dirs)?;
    let installed = scan_installed(&InstallPrefix::new(root), None);

    let output = if args.json {
        format_json(&installed)?
    } else {
        format_human(&installed)
    };

    writeln!(stdout, "{output}").map_err(|e| InstallerError::WriteFailed { source: e })?;

    Ok(())
}
