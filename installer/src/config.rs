//! Layered installer configuration.
//!
//! Settings come from, in decreasing precedence: command-line flags, the
//! `VOL_INSTALLER_PREFIX` environment variable (prefix only), the optional
//! `config.toml` in the installer's configuration directory, and built-in
//! defaults.
//!
//! ```toml
//! prefix = "/opt/vol"
//! formula_dir = "/etc/vol-installer/formulae"
//! completion_failure = "fail"
//!
//! [network]
//! timeout_secs = 60
//! retries = 3
//!
//! [test]
//! timeout_secs = 10
//! ```

use crate::artefact::download::{DEFAULT_DOWNLOAD_TIMEOUT, DEFAULT_RETRIES};
use crate::artefact::verification::CompletionFailurePolicy;
use crate::dirs::BaseDirs;
use crate::error::{InstallerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;
use std::time::Duration;

/// Environment variable overriding the install prefix.
pub const PREFIX_ENV: &str = "VOL_INSTALLER_PREFIX";

/// Name of the configuration file inside the configuration directory.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Default timeout for the post-install acceptance test.
pub const DEFAULT_ACCEPTANCE_TIMEOUT: Duration = Duration::from_secs(30);

const FORMULA_DIRNAME: &str = "formulae";

/// Network settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Timeout for a single download attempt, in seconds.
    pub timeout_secs: u64,
    /// Additional attempts after a transient failure.
    pub retries: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT.as_secs(),
            retries: DEFAULT_RETRIES,
        }
    }
}

impl NetworkConfig {
    /// The per-attempt download timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Acceptance-test settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AcceptanceConfig {
    /// How long the installed executable may run, in seconds.
    pub timeout_secs: u64,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_ACCEPTANCE_TIMEOUT.as_secs(),
        }
    }
}

impl AcceptanceConfig {
    /// The acceptance-test timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Contents of the configuration file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerConfig {
    /// Install prefix.
    pub prefix: Option<Utf8PathBuf>,
    /// Directory of descriptor files.
    pub formula_dir: Option<Utf8PathBuf>,
    /// How completion-script failures propagate.
    pub completion_failure: CompletionFailurePolicy,
    /// Network settings.
    pub network: NetworkConfig,
    /// Acceptance-test settings.
    pub test: AcceptanceConfig,
}

impl InstallerConfig {
    /// Load the configuration file from the installer's configuration
    /// directory. A missing directory or file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Config`] if the file exists but cannot be
    /// read or parsed.
    pub fn load(dirs: &dyn BaseDirs) -> Result<Self> {
        let Some(config_dir) = dirs.config_dir() else {
            debug!("no configuration directory; using defaults");
            return Ok(Self::default());
        };
        let path = Utf8PathBuf::try_from(config_dir.join(CONFIG_FILENAME)).map_err(|e| {
            InstallerError::Config {
                path: Utf8PathBuf::from(CONFIG_FILENAME),
                reason: format!("configuration path is not valid UTF-8: {e}"),
            }
        })?;
        Self::load_from(&path)
    }

    /// Load the configuration from an explicit path. A missing file yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Config`] if the file exists but cannot be
    /// read or parsed.
    pub fn load_from(path: &Utf8Path) -> Result<Self> {
        if !path.exists() {
            debug!("configuration file {path} not found; using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| InstallerError::Config {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        let config = toml::from_str(&text).map_err(|e| InstallerError::Config {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        debug!("loaded configuration from {path}");
        Ok(config)
    }

    /// Resolve the install prefix.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::PrefixUnavailable`] if no source names a
    /// prefix and the home directory is unknown or not valid UTF-8.
    pub fn resolve_prefix(
        &self,
        cli_prefix: Option<&Utf8Path>,
        dirs: &dyn BaseDirs,
    ) -> Result<Utf8PathBuf> {
        if let Some(prefix) = cli_prefix {
            return Ok(prefix.to_owned());
        }
        if let Some(prefix) = std::env::var(PREFIX_ENV).ok().filter(|v| !v.is_empty()) {
            debug!("using prefix from {PREFIX_ENV}");
            return Ok(Utf8PathBuf::from(prefix));
        }
        if let Some(prefix) = &self.prefix {
            return Ok(prefix.clone());
        }
        let home = dirs
            .home_dir()
            .ok_or_else(|| InstallerError::PrefixUnavailable {
                reason: "could not determine home directory".to_owned(),
            })?;
        let home = Utf8PathBuf::try_from(home).map_err(|e| InstallerError::PrefixUnavailable {
            reason: format!("home directory is not valid UTF-8: {e}"),
        })?;
        Ok(home.join(".local"))
    }

    /// Resolve the descriptor directory: the command-line value, then the
    /// configured one, then `formulae/` inside the configuration directory.
    #[must_use]
    pub fn resolve_formula_dir(
        &self,
        cli_dir: Option<&Utf8Path>,
        dirs: &dyn BaseDirs,
    ) -> Option<Utf8PathBuf> {
        cli_dir
            .map(Utf8Path::to_owned)
            .or_else(|| self.formula_dir.clone())
            .or_else(|| {
                dirs.config_dir()
                    .and_then(|dir| Utf8PathBuf::try_from(dir).ok())
                    .map(|dir| dir.join(FORMULA_DIRNAME))
            })
    }

    /// The completion-failure policy, with `--strict-completions` forcing
    /// [`CompletionFailurePolicy::Fail`].
    #[must_use]
    pub fn completion_policy(&self, strict: bool) -> CompletionFailurePolicy {
        if strict {
            CompletionFailurePolicy::Fail
        } else {
            self.completion_failure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirs::MockBaseDirs;
    use std::path::PathBuf;

    fn dirs_with_home(home: &str) -> MockBaseDirs {
        let mut dirs = MockBaseDirs::new();
        let home = PathBuf::from(home);
        dirs.expect_home_dir().returning(move || Some(home.clone()));
        dirs.expect_config_dir()
            .returning(|| Some(PathBuf::from("/home/user/.config/vol-installer")));
        dirs
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = InstallerConfig::default();
        assert_eq!(config.network.timeout(), Duration::from_secs(30));
        assert_eq!(config.network.retries, 2);
        assert_eq!(config.test.timeout(), DEFAULT_ACCEPTANCE_TIMEOUT);
        assert_eq!(config.completion_failure, CompletionFailurePolicy::Warn);
    }

    #[test]
    fn parses_partial_file() {
        let config: InstallerConfig = toml::from_str(concat!(
            "completion_failure = \"fail\"\n",
            "[network]\n",
            "retries = 5\n",
        ))
        .expect("valid config");
        assert_eq!(config.completion_failure, CompletionFailurePolicy::Fail);
        assert_eq!(config.network.retries, 5);
        assert_eq!(config.network.timeout_secs, 30);
    }

    #[test]
    fn load_from_missing_file_yields_defaults() {
        let config = InstallerConfig::load_from(Utf8Path::new("/nonexistent/config.toml"))
            .expect("missing file is fine");
        assert_eq!(config, InstallerConfig::default());
    }

    #[test]
    fn load_from_reports_unknown_keys() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(temp.path().join(CONFIG_FILENAME)).expect("UTF-8");
        std::fs::write(&path, "prefx = \"/opt\"\n").expect("write config");

        let err = InstallerConfig::load_from(&path).expect_err("typo rejected");
        assert!(matches!(err, InstallerError::Config { .. }));
    }

    #[test]
    fn load_uses_config_directory() {
        let temp = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            temp.path().join(CONFIG_FILENAME),
            "prefix = \"/opt/vol\"\n",
        )
        .expect("write config");
        let config_dir = temp.path().to_path_buf();
        let mut dirs = MockBaseDirs::new();
        dirs.expect_config_dir()
            .returning(move || Some(config_dir.clone()));

        let config = InstallerConfig::load(&dirs).expect("load config");
        assert_eq!(config.prefix.as_deref(), Some(Utf8Path::new("/opt/vol")));
    }

    #[test]
    fn cli_prefix_wins_over_everything() {
        let config = InstallerConfig {
            prefix: Some(Utf8PathBuf::from("/from/file")),
            ..InstallerConfig::default()
        };
        temp_env::with_var(PREFIX_ENV, Some("/from/env"), || {
            let prefix = config
                .resolve_prefix(Some(Utf8Path::new("/from/cli")), &dirs_with_home("/home/user"))
                .expect("prefix");
            assert_eq!(prefix, "/from/cli");
        });
    }

    #[test]
    fn env_prefix_wins_over_file() {
        let config = InstallerConfig {
            prefix: Some(Utf8PathBuf::from("/from/file")),
            ..InstallerConfig::default()
        };
        temp_env::with_var(PREFIX_ENV, Some("/from/env"), || {
            let prefix = config
                .resolve_prefix(None, &dirs_with_home("/home/user"))
                .expect("prefix");
            assert_eq!(prefix, "/from/env");
        });
    }

    #[test]
    fn file_prefix_wins_over_default() {
        let config = InstallerConfig {
            prefix: Some(Utf8PathBuf::from("/from/file")),
            ..InstallerConfig::default()
        };
        temp_env::with_var_unset(PREFIX_ENV, || {
            let prefix = config
                .resolve_prefix(None, &dirs_with_home("/home/user"))
                .expect("prefix");
            assert_eq!(prefix, "/from/file");
        });
    }

    #[test]
    fn default_prefix_is_home_local() {
        temp_env::with_var_unset(PREFIX_ENV, || {
            let prefix = InstallerConfig::default()
                .resolve_prefix(None, &dirs_with_home("/home/user"))
                .expect("prefix");
            assert_eq!(prefix, "/home/user/.local");
        });
    }

    #[test]
    fn missing_home_is_reported() {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_home_dir().returning(|| None);
        temp_env::with_var_unset(PREFIX_ENV, || {
            let err = InstallerConfig::default()
                .resolve_prefix(None, &dirs)
                .expect_err("no home");
            assert!(matches!(err, InstallerError::PrefixUnavailable { .. }));
        });
    }

    #[test]
    fn formula_dir_defaults_under_config_dir() {
        let dir = InstallerConfig::default()
            .resolve_formula_dir(None, &dirs_with_home("/home/user"))
            .expect("config dir known");
        assert_eq!(dir, "/home/user/.config/vol-installer/formulae");
    }

    #[test]
    fn strict_flag_forces_fail_policy() {
        let config = InstallerConfig::default();
        assert_eq!(config.completion_policy(true), CompletionFailurePolicy::Fail);
        assert_eq!(config.completion_policy(false), CompletionFailurePolicy::Warn);
    }
}
