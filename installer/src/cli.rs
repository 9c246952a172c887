//! CLI argument definitions for the vol installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::formula::Shell;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};

/// Fetch, verify, and install prebuilt releases of the vol build tool.
#[derive(Parser, Debug, Default)]
#[command(name = "vol-installer")]
#[command(version, about, disable_version_flag = true)]
#[command(long_about = concat!(
    "Fetch, verify, and install prebuilt releases of the vol build tool.\n\n",
    "Each release is described by a formula: a TOML file naming the release ",
    "assets, their SHA-256 digests, and where each one is installed. The ",
    "installer downloads every asset, refuses any whose digest differs, copies ",
    "the executable and shell completions into the prefix, and finally runs ",
    "`vol --version` to accept the install.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install the latest release described in the formula directory:\n",
    "    $ vol-installer\n\n",
    "  Install a specific formula into /usr/local:\n",
    "    $ vol-installer install --formula vol-2.0.23.toml --prefix /usr/local\n\n",
    "  Show the download plan without installing:\n",
    "    $ vol-installer resolve --version 2.0.23 --json\n\n",
    "  Write a formula for a new release:\n",
    "    $ vol-installer author --version 2.0.24 --binary dist/vol --bash dist/vol.bash\n\n",
    "For more information, see: https://github.com/pluttan/volumes",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Install arguments (used when no subcommand is given).
    #[command(flatten)]
    pub install: InstallArgs,

    /// Print the installer version.
    #[arg(short = 'V', long = "installer-version", action = clap::ArgAction::Version)]
    pub installer_version: Option<bool>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true
    )]
    pub verbosity: u8,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download, verify, install, and test a release (default).
    Install(InstallArgs),

    /// Print the download URLs and digests of a release.
    Resolve(ResolveArgs),

    /// Check a local file against a SHA-256 digest.
    Verify(VerifyArgs),

    /// Run the acceptance test against an installed prefix.
    Test(TestArgs),

    /// List installed files.
    List(ListArgs),

    /// Remove installed files.
    Uninstall(UninstallArgs),

    /// Print a formula for a release from its local files.
    Author(AuthorArgs),
}

/// Where formulae come from and which release to pick.
#[derive(Args, Debug, Clone, Default)]
pub struct FormulaArgs {
    /// Release version [default: latest known].
    #[arg(long = "version", value_name = "VERSION")]
    pub release: Option<String>,

    /// Use a single formula file.
    #[arg(long, value_name = "FILE", conflicts_with = "formula_dir")]
    pub formula: Option<Utf8PathBuf>,

    /// Directory of formula files [default: <config dir>/formulae].
    #[arg(long, value_name = "DIR")]
    pub formula_dir: Option<Utf8PathBuf>,
}

/// Arguments for the install command.
#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Formula selection.
    #[command(flatten)]
    pub formula: FormulaArgs,

    /// Install prefix [default: ~/.local].
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,

    /// Abort when any completion script fails to download or verify.
    #[arg(long)]
    pub strict_completions: bool,

    /// Skip the post-install acceptance test.
    #[arg(long)]
    pub skip_test: bool,

    /// Show what would be installed and exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the resolve command.
#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Formula selection.
    #[command(flatten)]
    pub formula: FormulaArgs,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the verify command.
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// File to check.
    #[arg(value_name = "FILE")]
    pub file: Utf8PathBuf,

    /// Expected lowercase hex SHA-256 digest.
    #[arg(long, value_name = "HEX")]
    pub sha256: String,
}

/// Arguments for the test command.
#[derive(Args, Debug, Clone, Default)]
pub struct TestArgs {
    /// Formula selection; only needed for non-default acceptance arguments.
    #[command(flatten)]
    pub formula: FormulaArgs,

    /// Install prefix [default: ~/.local].
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,
}

/// Arguments for the list command.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,

    /// Install prefix to scan [default: ~/.local].
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,
}

/// Arguments for the uninstall command.
#[derive(Args, Debug, Clone, Default)]
pub struct UninstallArgs {
    /// Install prefix [default: ~/.local].
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,
}

/// Arguments for the author command.
#[derive(Args, Debug, Clone)]
pub struct AuthorArgs {
    /// Version of the release being described.
    #[arg(long = "version", value_name = "VERSION")]
    pub release: String,

    /// Release executable.
    #[arg(long, value_name = "FILE")]
    pub binary: Utf8PathBuf,

    /// Zsh completion script.
    #[arg(long, value_name = "FILE")]
    pub zsh: Option<Utf8PathBuf>,

    /// Bash completion script.
    #[arg(long, value_name = "FILE")]
    pub bash: Option<Utf8PathBuf>,

    /// Fish completion script.
    #[arg(long, value_name = "FILE")]
    pub fish: Option<Utf8PathBuf>,

    /// Write the formula to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<Utf8PathBuf>,
}

impl AuthorArgs {
    /// Completion scripts given on the command line, in shell order.
    #[must_use]
    pub fn completions(&self) -> Vec<(Shell, &Utf8Path)> {
        [
            (Shell::Zsh, self.zsh.as_deref()),
            (Shell::Bash, self.bash.as_deref()),
            (Shell::Fish, self.fish.as_deref()),
        ]
        .into_iter()
        .filter_map(|(shell, path)| path.map(|path| (shell, path)))
        .collect()
    }
}

impl Cli {
    /// Returns the effective install arguments.
    ///
    /// If an `Install` subcommand was provided, returns those arguments.
    /// Otherwise returns the flattened install arguments.
    #[must_use]
    pub fn install_args(&self) -> &InstallArgs {
        match &self.command {
            Some(Command::Install(args)) => args,
            _ => &self.install,
        }
    }

    /// Whether progress output is suppressed.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        match &self.command {
            Some(Command::Install(args)) => args.quiet,
            None => self.install.quiet,
            Some(_) => false,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
