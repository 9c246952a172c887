//! Install-flow helpers for the installer binary.
//!
//! This module keeps descriptor selection and the install, resolve, and
//! acceptance-test commands separate from CLI dispatch in `main.rs`.

use std::io::Write;
use vol_installer::acceptance::{SystemCommandRunner, run_acceptance_test, run_self_test};
use vol_installer::catalog::{Catalog, ResolvedRelease, ResolvedReleaseJson};
use vol_installer::cli::{FormulaArgs, InstallArgs, ResolveArgs, TestArgs};
use vol_installer::config::InstallerConfig;
use vol_installer::dirs::BaseDirs;
use vol_installer::error::{InstallerError, Result};
use vol_installer::formula::{BINARY_NAME, Formula, VERSION_FLAG};
use vol_installer::output::{DryRunInfo, to_json, write_stderr_line};
use vol_installer::pipeline::{InstallOptions, install_release};
use vol_installer::prefix::InstallPrefix;

/// Load the catalog named by the formula arguments: a single file, or every
/// descriptor in the formula directory.
pub(crate) fn load_catalog(
    args: &FormulaArgs,
    config: &InstallerConfig,
    dirs: &dyn BaseDirs,
) -> Result<Catalog> {
    if let Some(path) = &args.formula {
        return Catalog::from_file(path);
    }
    match config.resolve_formula_dir(args.formula_dir.as_deref(), dirs) {
        Some(dir) => Catalog::from_dir(&dir),
        None => Ok(Catalog::default()),
    }
}

/// Select the descriptor for the requested release, or the latest one.
pub(crate) fn select_formula(
    args: &FormulaArgs,
    config: &InstallerConfig,
    dirs: &dyn BaseDirs,
) -> Result<Formula> {
    let catalog = load_catalog(args, config, dirs)?;
    catalog.select(args.release.as_deref()).cloned()
}

/// Install the selected release, or describe the install with `--dry-run`.
pub(crate) fn run_install(
    args: &InstallArgs,
    config: &InstallerConfig,
    dirs: &dyn BaseDirs,
    stderr: &mut dyn Write,
) -> Result<()> {
    let formula = select_formula(&args.formula, config, dirs)?;
    let prefix = InstallPrefix::new(config.resolve_prefix(args.prefix.as_deref(), dirs)?);

    if args.dry_run {
        let release = ResolvedRelease::from_formula(&formula);
        let info = DryRunInfo {
            release: &release,
            prefix: &prefix,
            run_test: !args.skip_test,
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(());
    }

    let options = InstallOptions {
        prefix,
        completion_policy: config.completion_policy(args.strict_completions),
        run_test: !args.skip_test,
        test_timeout: config.test.timeout(),
        quiet: args.quiet,
    };
    install_release(&formula, &options, &config.network, stderr)?;
    Ok(())
}

/// Print the download plan of the selected release to `stdout`.
pub(crate) fn run_resolve(
    args: &ResolveArgs,
    config: &InstallerConfig,
    dirs: &dyn BaseDirs,
    stdout: &mut dyn Write,
) -> Result<()> {
    let formula = select_formula(&args.formula, config, dirs)?;
    let release = ResolvedRelease::from_formula(&formula);

    let output = if args.json {
        to_json(&ResolvedReleaseJson::from(&release))?
    } else {
        resolve_human(&release)
    };
    writeln!(stdout, "{output}").map_err(|e| InstallerError::WriteFailed { source: e })
}

fn resolve_human(release: &ResolvedRelease) -> String {
    let mut lines = vec![format!("vol {}", release.version)];
    for resolved in release.artefacts() {
        lines.push(format!("  {}", resolved.artefact.name()));
        lines.push(format!("    url    {}", resolved.url));
        lines.push(format!("    sha256 {}", resolved.sha256()));
    }
    lines.join("\n")
}

/// Run the acceptance test against an already installed prefix.
///
/// Without a selectable descriptor the conventional `bin/vol --version`
/// is run.
pub(crate) fn run_test(
    args: &TestArgs,
    config: &InstallerConfig,
    dirs: &dyn BaseDirs,
    stderr: &mut dyn Write,
) -> Result<()> {
    let prefix = InstallPrefix::new(config.resolve_prefix(args.prefix.as_deref(), dirs)?);
    let catalog = load_catalog(&args.formula, config, dirs)?;
    let timeout = config.test.timeout();

    if catalog.is_empty() && args.formula.release.is_none() {
        let program = prefix.bin_dir().join(BINARY_NAME);
        run_acceptance_test(
            &SystemCommandRunner,
            &program,
            &[VERSION_FLAG.to_owned()],
            timeout,
        )?;
    } else {
        let formula = catalog.select(args.formula.release.as_deref())?;
        run_self_test(&SystemCommandRunner, &prefix, formula, timeout)?;
    }

    write_stderr_line(
        stderr,
        format!("Acceptance test passed for vol in {}", prefix.root()),
    );
    Ok(())
}
