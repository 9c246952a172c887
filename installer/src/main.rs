//! vol installer CLI entrypoint.
//!
//! This binary resolves a `vol` release from its descriptor, downloads and
//! verifies every asset, installs the executable and shell completions into
//! a prefix, and runs the acceptance test.

mod install_flow;

use clap::Parser;
use log::LevelFilter;
use std::io::Write;
use vol_installer::artefact::sha256_digest::Sha256Digest;
use vol_installer::artefact::verification::verify_file;
use vol_installer::artefact::version::ReleaseVersion;
use vol_installer::authoring::{AuthorParams, author_formula, render};
use vol_installer::cli::{AuthorArgs, Cli, Command, UninstallArgs, VerifyArgs};
use vol_installer::config::InstallerConfig;
use vol_installer::dirs::{BaseDirs, SystemBaseDirs};
use vol_installer::error::{InstallerError, Result};
use vol_installer::list::run_list;
use vol_installer::output::write_stderr_line;
use vol_installer::prefix::InstallPrefix;
use vol_installer::uninstall::uninstall;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity);
    let mut stderr = std::io::stderr();
    let mut stdout = std::io::stdout();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Initialise `env_logger`, honouring `RUST_LOG` and raising the default
/// level with each `-v`.
fn init_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level_for_verbosity(verbosity))
        .format_timestamp(None)
        .parse_default_env();
    if builder.try_init().is_err() {
        // A logger is already installed; keep it.
    }
}

fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Some(Command::Verify(args)) => return run_verify(args, stderr),
        Some(Command::Author(args)) => return run_author(args, stdout),
        _ => {}
    }

    let dirs = system_dirs()?;
    if let Some(Command::List(args)) = &cli.command {
        return run_list(args, &dirs, stdout);
    }

    let config = InstallerConfig::load(&dirs)?;
    match &cli.command {
        Some(Command::Resolve(args)) => install_flow::run_resolve(args, &config, &dirs, stdout),
        Some(Command::Test(args)) => install_flow::run_test(args, &config, &dirs, stderr),
        Some(Command::Uninstall(args)) => run_uninstall(args, &config, &dirs, stderr),
        _ => install_flow::run_install(cli.install_args(), &config, &dirs, stderr),
    }
}

fn system_dirs() -> Result<SystemBaseDirs> {
    SystemBaseDirs::new().ok_or_else(|| InstallerError::PrefixUnavailable {
        reason: "could not determine home directory".to_owned(),
    })
}

/// Checks a local file against an expected digest.
fn run_verify(args: &VerifyArgs, stderr: &mut dyn Write) -> Result<()> {
    let expected = Sha256Digest::try_from(args.sha256.as_str())?;
    let (matches, actual) = verify_file(args.file.as_std_path(), &expected)?;
    if !matches {
        return Err(InstallerError::Integrity {
            artefact: args.file.to_string(),
            expected: expected.into_inner(),
            actual: actual.into_inner(),
        });
    }
    write_stderr_line(stderr, format!("{}: OK", args.file));
    Ok(())
}

/// Writes a descriptor for a release built from local files.
fn run_author(args: &AuthorArgs, stdout: &mut dyn Write) -> Result<()> {
    let version: ReleaseVersion = args.release.parse()?;
    let params = args.completions().into_iter().fold(
        AuthorParams::new(version, args.binary.clone()),
        |params, (shell, path)| params.with_completion(shell, path.to_owned()),
    );
    let text = render(&author_formula(params)?)?;

    match &args.output {
        Some(path) => std::fs::write(path, text)?,
        None => write!(stdout, "{text}").map_err(|e| InstallerError::WriteFailed { source: e })?,
    }
    Ok(())
}

/// Removes the installed `vol` files from the prefix.
fn run_uninstall(
    args: &UninstallArgs,
    config: &InstallerConfig,
    dirs: &dyn BaseDirs,
    stderr: &mut dyn Write,
) -> Result<()> {
    let prefix = InstallPrefix::new(config.resolve_prefix(args.prefix.as_deref(), dirs)?);
    let removed = uninstall(&prefix, None)?;

    if removed.is_empty() {
        write_stderr_line(stderr, format!("vol is not installed in {}", prefix.root()));
    }
    for path in &removed {
        write_stderr_line(stderr, format!("Removed {path}"));
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
