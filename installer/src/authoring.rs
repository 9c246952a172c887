//! Descriptor authoring for version bumps.
//!
//! A new descriptor is written for every release. Given the release's
//! local executable and completion scripts, this module computes their
//! digests and produces the descriptor that the install pipeline will
//! later verify downloads against.

use crate::artefact::verification::digest_file;
use crate::artefact::version::ReleaseVersion;
use crate::formula::{Formula, FormulaError, FormulaParams, Shell};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

/// Summary used when none is given.
pub const DEFAULT_DESCRIPTION: &str = "Universal build tool with beautiful terminal output";

/// Project link used when none is given.
pub const DEFAULT_HOMEPAGE: &str = "https://github.com/pluttan/volumes";

/// Licence used when none is given.
pub const DEFAULT_LICENSE: &str = "MIT";

/// Input parameters for [`author_formula`].
#[derive(Debug, Clone)]
pub struct AuthorParams {
    /// The release being described.
    pub version: ReleaseVersion,
    /// Local copy of the release executable.
    pub binary: Utf8PathBuf,
    /// Local copies of the completion scripts, at most one per shell.
    pub completions: Vec<(Shell, Utf8PathBuf)>,
    /// Summary line.
    pub description: String,
    /// Project link.
    pub homepage: String,
    /// Licence identifier.
    pub license: String,
}

impl AuthorParams {
    /// Parameters with the project's default metadata.
    #[must_use]
    pub fn new(version: ReleaseVersion, binary: Utf8PathBuf) -> Self {
        Self {
            version,
            binary,
            completions: Vec::new(),
            description: DEFAULT_DESCRIPTION.to_owned(),
            homepage: DEFAULT_HOMEPAGE.to_owned(),
            license: DEFAULT_LICENSE.to_owned(),
        }
    }

    /// Add a completion script for `shell`.
    #[must_use]
    pub fn with_completion(mut self, shell: Shell, path: Utf8PathBuf) -> Self {
        self.completions.push((shell, path));
        self
    }
}

/// Errors arising from descriptor authoring.
#[derive(Debug, thiserror::Error)]
pub enum AuthoringError {
    /// An input file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The unreadable file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An input path has no file name to publish it under.
    #[error("{path} has no file name")]
    MissingFileName {
        /// The offending path.
        path: Utf8PathBuf,
    },

    /// The resulting descriptor is invalid.
    #[error(transparent)]
    Formula(#[from] FormulaError),
}

/// Build a descriptor for a release from its local files.
///
/// Asset filenames are the files' own names, so they must match the names
/// the files are published under.
///
/// # Errors
///
/// Returns [`AuthoringError::Read`] if a file cannot be hashed,
/// [`AuthoringError::MissingFileName`] for paths such as `/`, or
/// [`AuthoringError::Formula`] if the inputs violate a descriptor invariant
/// (for example two completions for one shell).
pub fn author_formula(params: AuthorParams) -> Result<Formula, AuthoringError> {
    let binary = hash_asset(&params.binary)?;
    let completions = params
        .completions
        .iter()
        .map(|(shell, path)| {
            let (filename, digest) = hash_asset(path)?;
            Ok((*shell, filename, digest))
        })
        .collect::<Result<Vec<_>, AuthoringError>>()?;

    let formula = Formula::try_from(FormulaParams {
        description: params.description,
        homepage: params.homepage,
        version: params.version,
        license: params.license,
        binary,
        completions,
    })?;
    Ok(formula)
}

/// Render a descriptor as TOML.
///
/// # Errors
///
/// Returns [`AuthoringError::Formula`] if serialization fails.
pub fn render(formula: &Formula) -> Result<String, AuthoringError> {
    Ok(formula.to_toml()?)
}

fn hash_asset(
    path: &Utf8Path,
) -> Result<(String, crate::artefact::sha256_digest::Sha256Digest), AuthoringError> {
    let filename = path
        .file_name()
        .ok_or_else(|| AuthoringError::MissingFileName {
            path: path.to_owned(),
        })?;
    let digest = digest_file(path.as_std_path()).map_err(|source| AuthoringError::Read {
        path: path.to_owned(),
        source,
    })?;
    debug!("{path}: sha256 {digest}");
    Ok((filename.to_owned(), digest))
}
