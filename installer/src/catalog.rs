//! Descriptor catalog and version resolution.
//!
//! A catalog holds one descriptor per release. Resolving a version yields
//! the deterministic download URL of every artefact the release declares,
//! following `<release_base>/<tag_prefix><version>/<filename>`.

use crate::artefact::sha256_digest::Sha256Digest;
use crate::artefact::version::ReleaseVersion;
use crate::error::{InstallerError, Result};
use crate::formula::{Artefact, Formula};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

/// Construct the release asset URL for a given tag and filename.
///
/// # Examples
///
/// ```
/// use vol_installer::catalog::asset_url;
///
/// let url = asset_url(
///     "https://github.com/pluttan/volumes/releases/download",
///     "v2.0.0",
///     "vol",
/// );
/// assert_eq!(
///     url,
///     "https://github.com/pluttan/volumes/releases/download/v2.0.0/vol"
/// );
/// ```
#[must_use]
pub fn asset_url(release_base: &str, tag: &str, filename: &str) -> String {
    format!("{}/{tag}/{filename}", release_base.trim_end_matches('/'))
}

/// One artefact with its resolved download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtefact {
    /// The declared artefact.
    pub artefact: Artefact,
    /// Where to download it from.
    pub url: String,
}

impl ResolvedArtefact {
    /// Expected digest of the download.
    #[must_use]
    pub fn sha256(&self) -> &Sha256Digest {
        self.artefact.sha256()
    }
}

/// The download plan for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelease {
    /// The release version.
    pub version: ReleaseVersion,
    /// The primary executable.
    pub primary: ResolvedArtefact,
    /// Completion resources, in declaration order.
    pub resources: Vec<ResolvedArtefact>,
}

impl ResolvedRelease {
    /// Resolve every artefact of `formula` to its download URL.
    #[must_use]
    pub fn from_formula(formula: &Formula) -> Self {
        let tag = formula.tag();
        let resolve = |artefact: &Artefact| ResolvedArtefact {
            url: asset_url(formula.release_base(), &tag, artefact.filename()),
            artefact: artefact.clone(),
        };
        Self {
            version: formula.version().clone(),
            primary: resolve(formula.binary()),
            resources: formula.resources().iter().map(resolve).collect(),
        }
    }

    /// The primary artefact followed by every resource.
    pub fn artefacts(&self) -> impl Iterator<Item = &ResolvedArtefact> {
        std::iter::once(&self.primary).chain(self.resources.iter())
    }
}

/// JSON view of a resolved release for `resolve --json`.
#[derive(Debug, Serialize)]
pub struct ResolvedReleaseJson<'a> {
    /// The release version.
    pub version: &'a str,
    /// Every artefact, primary first.
    pub artefacts: Vec<ResolvedArtefactJson<'a>>,
}

/// JSON view of one resolved artefact.
#[derive(Debug, Serialize)]
pub struct ResolvedArtefactJson<'a> {
    /// Logical name.
    pub name: &'a str,
    /// Download URL.
    pub url: &'a str,
    /// Expected SHA-256 digest.
    pub sha256: &'a str,
    /// Filename once installed.
    pub install_as: &'a str,
}

impl<'a> From<&'a ResolvedRelease> for ResolvedReleaseJson<'a> {
    fn from(release: &'a ResolvedRelease) -> Self {
        Self {
            version: release.version.as_str(),
            artefacts: release
                .artefacts()
                .map(|resolved| ResolvedArtefactJson {
                    name: resolved.artefact.name(),
                    url: &resolved.url,
                    sha256: resolved.sha256().as_str(),
                    install_as: resolved.artefact.install_as(),
                })
                .collect(),
        }
    }
}

/// A set of descriptors keyed by release version.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    formulae: BTreeMap<ReleaseVersion, (Formula, Option<Utf8PathBuf>)>,
}

impl Catalog {
    /// Build a catalog from descriptors already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::DuplicateFormula`] if two descriptors declare
    /// the same version.
    pub fn from_formulae(formulae: impl IntoIterator<Item = Formula>) -> Result<Self> {
        let mut catalog = Self::default();
        for formula in formulae {
            catalog.insert(formula, None)?;
        }
        Ok(catalog)
    }

    /// Load every `*.toml` descriptor in `dir`.
    ///
    /// A missing directory yields an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read, a descriptor is
    /// invalid, or two descriptors declare the same version.
    pub fn from_dir(dir: &Utf8Path) -> Result<Self> {
        let mut catalog = Self::default();
        if !dir.is_dir() {
            debug!("formula directory {dir} does not exist");
            return Ok(catalog);
        }

        let mut paths: Vec<Utf8PathBuf> = dir
            .read_dir_utf8()?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.into_path())
            .filter(|path| path.extension() == Some("toml") && path.is_file())
            .collect();
        paths.sort();

        for path in paths {
            debug!("loading formula {path}");
            let formula = Formula::from_path(&path)?;
            catalog.insert(formula, Some(path))?;
        }
        Ok(catalog)
    }

    /// Load a single descriptor file as a one-entry catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor cannot be read or is invalid.
    pub fn from_file(path: &Utf8Path) -> Result<Self> {
        let mut catalog = Self::default();
        catalog.insert(Formula::from_path(path)?, Some(path.to_owned()))?;
        Ok(catalog)
    }

    fn insert(&mut self, formula: Formula, path: Option<Utf8PathBuf>) -> Result<()> {
        let version = formula.version().clone();
        if let Some((_, existing)) = self.formulae.get(&version) {
            return Err(InstallerError::DuplicateFormula {
                version,
                first: existing.clone().unwrap_or_default(),
                second: path.unwrap_or_default(),
            });
        }
        self.formulae.insert(version, (formula, path));
        Ok(())
    }

    /// Return true when the catalog holds no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formulae.is_empty()
    }

    /// Known versions in ascending order.
    #[must_use]
    pub fn versions(&self) -> Vec<ReleaseVersion> {
        self.formulae.keys().cloned().collect()
    }

    /// The descriptor for the newest release.
    #[must_use]
    pub fn latest(&self) -> Option<&Formula> {
        self.formulae.values().next_back().map(|(formula, _)| formula)
    }

    /// Look up the descriptor for `version`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnresolvedVersion`] when the version is
    /// malformed or no descriptor declares it.
    pub fn formula(&self, version: &str) -> Result<&Formula> {
        let unresolved = || InstallerError::UnresolvedVersion {
            version: version.to_owned(),
            available: self.versions(),
        };
        let parsed: ReleaseVersion = version.parse().map_err(|_| unresolved())?;
        self.formulae
            .get(&parsed)
            .map(|(formula, _)| formula)
            .ok_or_else(unresolved)
    }

    /// Select the descriptor for `version`, or the latest when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnresolvedVersion`] when the version is
    /// unknown or the catalog is empty.
    pub fn select(&self, version: Option<&str>) -> Result<&Formula> {
        match version {
            Some(version) => self.formula(version),
            None => self
                .latest()
                .ok_or_else(|| InstallerError::UnresolvedVersion {
                    version: "latest".to_owned(),
                    available: Vec::new(),
                }),
        }
    }

    /// Resolve `version` to its download plan.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnresolvedVersion`] when no descriptor
    /// declares the version.
    pub fn resolve(&self, version: &str) -> Result<ResolvedRelease> {
        self.formula(version).map(ResolvedRelease::from_formula)
    }
}
