//! Package descriptors ("formulae") for `vol` releases.
//!
//! A descriptor declares, for exactly one release, where the primary
//! executable and its optional shell-completion resources are fetched from,
//! the SHA-256 digest each download must match, where each file lands in the
//! install prefix, and which command accepts the install afterwards.
//!
//! Descriptors are TOML documents:
//!
//! ```toml
//! description = "Universal build tool with beautiful terminal output"
//! homepage = "https://github.com/pluttan/volumes"
//! version = "2.0.23"
//! license = "MIT"
//!
//! [binary]
//! filename = "vol"
//! sha256 = "…"
//!
//! [[resource]]
//! name = "bash-completion"
//! filename = "vol.bash"
//! shell = "bash"
//! sha256 = "…"
//! ```

use crate::artefact::error::ArtefactError;
use crate::artefact::sha256_digest::Sha256Digest;
use crate::artefact::version::ReleaseVersion;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Base URL under which release tags are published.
pub const DEFAULT_RELEASE_BASE: &str = "https://github.com/pluttan/volumes/releases/download";

/// Prefix placed before the version to form a release tag.
pub const DEFAULT_TAG_PREFIX: &str = "v";

/// Name of the installed executable, and of the bash completion file.
pub const BINARY_NAME: &str = "vol";

/// Flag passed to the installed executable by the default acceptance test.
pub const VERSION_FLAG: &str = "--version";

/// Shell families that ship completion scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
    /// Z shell; completions are `_<command>` functions on `fpath`.
    Zsh,
    /// Bash; the completion loader looks files up by command name.
    Bash,
    /// Fish; completions are `<command>.fish` files.
    Fish,
}

impl Shell {
    /// All supported shells in install order.
    pub const ALL: [Self; 3] = [Self::Zsh, Self::Bash, Self::Fish];

    /// The name the completion file takes when the descriptor gives none.
    ///
    /// Bash is the exception: `bash-completion` loads completions lazily
    /// by looking up a file named after the command, so the script is
    /// always installed as [`BINARY_NAME`].
    fn default_install_name(self, source_filename: &str) -> String {
        match self {
            Self::Bash => BINARY_NAME.to_owned(),
            Self::Zsh | Self::Fish => source_filename.to_owned(),
        }
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zsh => write!(f, "zsh"),
            Self::Bash => write!(f, "bash"),
            Self::Fish => write!(f, "fish"),
        }
    }
}

/// Where in the install prefix an artefact is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DestinationCategory {
    /// The executable search-path directory.
    Executable,
    /// The completion directory for one shell.
    Completion(Shell),
}

impl fmt::Display for DestinationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Executable => write!(f, "executables"),
            Self::Completion(shell) => write!(f, "{shell} completions"),
        }
    }
}

/// One downloadable file declared by a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artefact {
    name: String,
    filename: String,
    sha256: Sha256Digest,
    destination: DestinationCategory,
    install_as: String,
}

impl Artefact {
    /// Logical name (`vol` for the primary binary, the resource name
    /// otherwise).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filename of the release asset.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Expected digest of the release asset.
    #[must_use]
    pub fn sha256(&self) -> &Sha256Digest {
        &self.sha256
    }

    /// Destination category inside the prefix.
    #[must_use]
    pub fn destination(&self) -> DestinationCategory {
        self.destination
    }

    /// Filename the artefact takes once installed.
    #[must_use]
    pub fn install_as(&self) -> &str {
        &self.install_as
    }

    /// Return true for the primary executable.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.destination == DestinationCategory::Executable
    }

    /// Return true when the installed name differs from the asset name.
    #[must_use]
    pub fn is_renamed(&self) -> bool {
        self.filename != self.install_as
    }
}

/// An ordered placement rule derived from a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallAction {
    /// Logical name of the source artefact.
    pub source: String,
    /// Destination category inside the prefix.
    pub destination: DestinationCategory,
    /// Set when the file is renamed on install.
    pub rename_to: Option<String>,
}

/// Errors arising from loading or validating descriptors.
#[derive(Debug, thiserror::Error)]
pub enum FormulaError {
    /// The descriptor file could not be read.
    #[error("failed to read formula {path}: {source}")]
    Read {
        /// Path of the descriptor.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The descriptor is not valid TOML or misses required fields.
    #[error("invalid formula: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field value violates a descriptor invariant.
    #[error("invalid formula: {reason}")]
    Invalid {
        /// Description of the violated invariant.
        reason: String,
    },

    /// A version, digest, or filename failed validation.
    #[error(transparent)]
    Artefact(#[from] ArtefactError),

    /// The descriptor could not be rendered as TOML.
    #[error("failed to render formula: {0}")]
    Render(#[from] toml::ser::Error),
}

/// A validated package descriptor for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    description: String,
    homepage: String,
    version: ReleaseVersion,
    license: String,
    release_base: String,
    tag_prefix: String,
    acceptance_args: Vec<String>,
    binary: Artefact,
    resources: Vec<Artefact>,
}

impl Formula {
    /// Parse and validate a descriptor from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError`] when the TOML is malformed, a field fails
    /// newtype validation, or a descriptor invariant is violated (duplicate
    /// resource names, two resources for one shell, unsafe filenames).
    pub fn parse(text: &str) -> Result<Self, FormulaError> {
        let document: FormulaDocument = toml::from_str(text)?;
        Self::from_document(document)
    }

    /// Read and validate a descriptor file.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::Read`] if the file cannot be read, otherwise
    /// the same errors as [`Formula::parse`].
    pub fn from_path(path: &Utf8Path) -> Result<Self, FormulaError> {
        let text = std::fs::read_to_string(path).map_err(|source| FormulaError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Render the descriptor back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::Render`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, FormulaError> {
        Ok(toml::to_string_pretty(&self.to_document())?)
    }

    /// Human-readable one-line summary.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Project reference link.
    #[must_use]
    pub fn homepage(&self) -> &str {
        &self.homepage
    }

    /// Release identifier.
    #[must_use]
    pub fn version(&self) -> &ReleaseVersion {
        &self.version
    }

    /// Licence identifier.
    #[must_use]
    pub fn license(&self) -> &str {
        &self.license
    }

    /// Base URL for release assets.
    #[must_use]
    pub fn release_base(&self) -> &str {
        &self.release_base
    }

    /// Prefix placed before the version in the release tag.
    #[must_use]
    pub fn tag_prefix(&self) -> &str {
        &self.tag_prefix
    }

    /// The release tag, e.g. `v2.0.23`.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("{}{}", self.tag_prefix, self.version)
    }

    /// Arguments passed to the installed executable by the acceptance test.
    #[must_use]
    pub fn acceptance_args(&self) -> &[String] {
        &self.acceptance_args
    }

    /// The primary executable.
    #[must_use]
    pub fn binary(&self) -> &Artefact {
        &self.binary
    }

    /// Optional completion resources, in declaration order.
    #[must_use]
    pub fn resources(&self) -> &[Artefact] {
        &self.resources
    }

    /// The primary executable followed by every resource.
    pub fn artefacts(&self) -> impl Iterator<Item = &Artefact> {
        std::iter::once(&self.binary).chain(self.resources.iter())
    }

    /// Ordered placement rules: source artefact to destination category,
    /// with the rename applied where the installed name differs.
    #[must_use]
    pub fn install_actions(&self) -> Vec<InstallAction> {
        self.artefacts()
            .map(|artefact| InstallAction {
                source: artefact.name.clone(),
                destination: artefact.destination,
                rename_to: artefact
                    .is_renamed()
                    .then(|| artefact.install_as.clone()),
            })
            .collect()
    }

    fn from_document(document: FormulaDocument) -> Result<Self, FormulaError> {
        let release_base = document
            .release_base
            .unwrap_or_else(|| DEFAULT_RELEASE_BASE.to_owned())
            .trim_end_matches('/')
            .to_owned();
        if release_base.is_empty() {
            return Err(invalid("release_base must not be empty"));
        }

        let binary = binary_artefact(document.binary)?;
        let resources = document
            .resources
            .into_iter()
            .map(resource_artefact)
            .collect::<Result<Vec<_>, _>>()?;
        check_resources_unique(&binary, &resources)?;

        let acceptance_args = document
            .test
            .map_or_else(|| vec![VERSION_FLAG.to_owned()], |spec| spec.args);

        Ok(Self {
            description: document.description,
            homepage: document.homepage,
            version: document.version,
            license: document.license,
            release_base,
            tag_prefix: document
                .tag_prefix
                .unwrap_or_else(|| DEFAULT_TAG_PREFIX.to_owned()),
            acceptance_args,
            binary,
            resources,
        })
    }

    fn to_document(&self) -> FormulaDocument {
        FormulaDocument {
            description: self.description.clone(),
            homepage: self.homepage.clone(),
            version: self.version.clone(),
            license: self.license.clone(),
            release_base: (self.release_base != DEFAULT_RELEASE_BASE)
                .then(|| self.release_base.clone()),
            tag_prefix: (self.tag_prefix != DEFAULT_TAG_PREFIX).then(|| self.tag_prefix.clone()),
            binary: BinarySpec {
                filename: self.binary.filename.clone(),
                sha256: self.binary.sha256.clone(),
                install_as: self
                    .binary
                    .is_renamed()
                    .then(|| self.binary.install_as.clone()),
            },
            resources: self.resources.iter().filter_map(resource_spec).collect(),
            test: (self.acceptance_args != [VERSION_FLAG]).then(|| AcceptanceSpec {
                args: self.acceptance_args.clone(),
            }),
        }
    }
}

/// Builder-style inputs for constructing a descriptor in code.
#[derive(Debug, Clone)]
pub struct FormulaParams {
    /// Human-readable one-line summary.
    pub description: String,
    /// Project reference link.
    pub homepage: String,
    /// Release identifier.
    pub version: ReleaseVersion,
    /// Licence identifier.
    pub license: String,
    /// Asset filename and digest of the primary executable.
    pub binary: (String, Sha256Digest),
    /// Completion scripts: shell, asset filename, digest.
    pub completions: Vec<(Shell, String, Sha256Digest)>,
}

impl TryFrom<FormulaParams> for Formula {
    type Error = FormulaError;

    fn try_from(params: FormulaParams) -> Result<Self, FormulaError> {
        let (filename, sha256) = params.binary;
        let document = FormulaDocument {
            description: params.description,
            homepage: params.homepage,
            version: params.version,
            license: params.license,
            release_base: None,
            tag_prefix: None,
            binary: BinarySpec {
                filename,
                sha256,
                install_as: None,
            },
            resources: params
                .completions
                .into_iter()
                .map(|(shell, filename, sha256)| ResourceSpec {
                    name: format!("{shell}-completion"),
                    filename,
                    shell,
                    sha256,
                    install_as: None,
                })
                .collect(),
            test: None,
        };
        Self::from_document(document)
    }
}

/// Reject filenames that could escape their destination directory.
///
/// # Errors
///
/// Returns [`ArtefactError::InvalidFilename`] for empty names, `.`, `..`,
/// and names containing a path separator or NUL byte.
pub fn validate_filename(value: &str) -> Result<(), ArtefactError> {
    let reason = if value.is_empty() {
        Some("filename must not be empty")
    } else if value == "." || value == ".." {
        Some("filename must not be a relative directory reference")
    } else if value.contains(['/', '\\']) {
        Some("filename must not contain a path separator")
    } else if value.contains('\0') {
        Some("filename must not contain NUL")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ArtefactError::InvalidFilename {
            value: value.to_owned(),
            reason: reason.to_owned(),
        }),
        None => Ok(()),
    }
}

fn binary_artefact(spec: BinarySpec) -> Result<Artefact, FormulaError> {
    validate_filename(&spec.filename)?;
    let install_as = spec.install_as.unwrap_or_else(|| BINARY_NAME.to_owned());
    validate_filename(&install_as)?;
    Ok(Artefact {
        name: BINARY_NAME.to_owned(),
        filename: spec.filename,
        sha256: spec.sha256,
        destination: DestinationCategory::Executable,
        install_as,
    })
}

fn resource_artefact(spec: ResourceSpec) -> Result<Artefact, FormulaError> {
    if spec.name.trim().is_empty() {
        return Err(invalid("resource name must not be empty"));
    }
    validate_filename(&spec.filename)?;
    let install_as = spec
        .install_as
        .unwrap_or_else(|| spec.shell.default_install_name(&spec.filename));
    validate_filename(&install_as)?;
    Ok(Artefact {
        name: spec.name,
        filename: spec.filename,
        sha256: spec.sha256,
        destination: DestinationCategory::Completion(spec.shell),
        install_as,
    })
}

fn resource_spec(artefact: &Artefact) -> Option<ResourceSpec> {
    let DestinationCategory::Completion(shell) = artefact.destination else {
        return None;
    };
    let default_name = shell.default_install_name(&artefact.filename);
    Some(ResourceSpec {
        name: artefact.name.clone(),
        filename: artefact.filename.clone(),
        shell,
        sha256: artefact.sha256.clone(),
        install_as: (artefact.install_as != default_name).then(|| artefact.install_as.clone()),
    })
}

fn check_resources_unique(binary: &Artefact, resources: &[Artefact]) -> Result<(), FormulaError> {
    let mut names = HashSet::new();
    let mut destinations = HashSet::new();
    let mut filenames = HashSet::from([binary.filename.as_str()]);
    for resource in resources {
        if !filenames.insert(resource.filename.as_str()) {
            return Err(invalid(&format!(
                "more than one artefact is published as \"{}\"",
                resource.filename
            )));
        }
        if resource.name == BINARY_NAME || !names.insert(resource.name.as_str()) {
            return Err(invalid(&format!(
                "duplicate resource name \"{}\"",
                resource.name
            )));
        }
        if !destinations.insert(resource.destination) {
            return Err(invalid(&format!(
                "more than one resource targets {}",
                resource.destination
            )));
        }
    }
    Ok(())
}

fn invalid(reason: &str) -> FormulaError {
    FormulaError::Invalid {
        reason: reason.to_owned(),
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct FormulaDocument {
    description: String,
    homepage: String,
    version: ReleaseVersion,
    license: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    release_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag_prefix: Option<String>,
    binary: BinarySpec,
    #[serde(default, rename = "resource", skip_serializing_if = "Vec::is_empty")]
    resources: Vec<ResourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    test: Option<AcceptanceSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BinarySpec {
    filename: String,
    sha256: Sha256Digest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    install_as: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceSpec {
    name: String,
    filename: String,
    shell: Shell,
    sha256: Sha256Digest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    install_as: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct AcceptanceSpec {
    args: Vec<String>,
}

#[cfg(test)]
#[path = "formula_tests.rs"]
mod tests;
