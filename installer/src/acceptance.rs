//! Post-install acceptance test.
//!
//! After placement the installed executable is run with the descriptor's
//! acceptance arguments (`--version` by default). Exit status zero accepts
//! the install; a non-zero exit, a spawn failure, or a timeout rejects it.

use crate::error::{InstallerError, Result};
use crate::formula::Formula;
use crate::prefix::InstallPrefix;
use camino::Utf8Path;
use log::debug;
use std::io;
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Result of running a command under a timeout.
#[derive(Debug)]
pub enum RunOutcome {
    /// The command exited within the timeout.
    Completed(Output),
    /// The command was killed after the timeout elapsed.
    TimedOut,
}

/// Abstraction for running the installed executable.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Run `program` with `args`, killing it after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while spawning or waiting.
    fn run(
        &self,
        program: &Utf8Path,
        args: &[String],
        timeout: Duration,
    ) -> io::Result<RunOutcome>;
}

/// Runs commands on the host system.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use std::time::Duration;
/// use vol_installer::acceptance::{CommandRunner, RunOutcome, SystemCommandRunner};
///
/// let outcome = SystemCommandRunner.run(
///     Utf8Path::new("/usr/local/bin/vol"),
///     &["--version".to_owned()],
///     Duration::from_secs(30),
/// )?;
/// assert!(matches!(outcome, RunOutcome::Completed(_)));
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(
        &self,
        program: &Utf8Path,
        args: &[String],
        timeout: Duration,
    ) -> io::Result<RunOutcome> {
        let mut child = Command::new(program.as_std_path())
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        match child.wait_timeout(timeout)? {
            Some(status) => {
                let stdout = child
                    .stdout
                    .take()
                    .map(io::read_to_string)
                    .transpose()?
                    .unwrap_or_default();
                let stderr = child
                    .stderr
                    .take()
                    .map(io::read_to_string)
                    .transpose()?
                    .unwrap_or_default();
                Ok(RunOutcome::Completed(Output {
                    status,
                    stdout: stdout.into_bytes(),
                    stderr: stderr.into_bytes(),
                }))
            }
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Ok(RunOutcome::TimedOut)
            }
        }
    }
}

/// Run `program args…` and require a zero exit status.
///
/// # Errors
///
/// Returns [`InstallerError::SmokeTest`] on a non-zero exit, spawn failure,
/// or timeout.
pub fn run_acceptance_test(
    runner: &dyn CommandRunner,
    program: &Utf8Path,
    args: &[String],
    timeout: Duration,
) -> Result<()> {
    let command = command_line(program, args);
    debug!("running acceptance test `{command}`");
    let failure = |reason: String| InstallerError::SmokeTest {
        command: command.clone(),
        reason,
    };

    match runner.run(program, args, timeout) {
        Ok(RunOutcome::Completed(output)) if output.status.success() => {
            debug!(
                "acceptance test output: {}",
                String::from_utf8_lossy(&output.stdout).trim()
            );
            Ok(())
        }
        Ok(RunOutcome::Completed(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let reason = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                format!("exited with {}: {stderr}", output.status)
            };
            Err(failure(reason))
        }
        Ok(RunOutcome::TimedOut) => Err(failure(format!(
            "timed out after {} seconds",
            timeout.as_secs()
        ))),
        Err(e) => Err(failure(format!("failed to start: {e}"))),
    }
}

/// Run the acceptance test for `formula` against the executable installed
/// in `prefix`.
///
/// # Errors
///
/// Returns [`InstallerError::SmokeTest`] when the installed executable
/// fails the test.
pub fn run_self_test(
    runner: &dyn CommandRunner,
    prefix: &InstallPrefix,
    formula: &Formula,
    timeout: Duration,
) -> Result<()> {
    let program = prefix.destination_of(formula.binary());
    run_acceptance_test(runner, &program, formula.acceptance_args(), timeout)
}

/// Return true iff the executable installed in `prefix` passes the
/// acceptance test for `formula`.
#[must_use]
pub fn self_test(
    runner: &dyn CommandRunner,
    prefix: &InstallPrefix,
    formula: &Formula,
    timeout: Duration,
) -> bool {
    run_self_test(runner, prefix, formula, timeout).is_ok()
}

fn command_line(program: &Utf8Path, args: &[String]) -> String {
    std::iter::once(program.as_str())
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
