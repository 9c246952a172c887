//! Artefact download logic for release retrieval.
//!
//! Provides a trait-based abstraction for downloading release assets to
//! disk, enabling dependency injection for testing.

use log::{debug, warn};
use std::path::Path;
use std::time::Duration;

/// Default network timeout for a single download attempt.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of additional attempts after a transient failure.
pub const DEFAULT_RETRIES: u32 = 2;

/// Trait for downloading release assets.
///
/// Abstractions allow tests to mock HTTP behaviour without network access.
///
/// # Examples
///
/// ```
/// use vol_installer::artefact::download::HttpDownloader;
///
/// let downloader = HttpDownloader::default();
/// // Use downloader.fetch(url, dest) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactDownloader {
    /// Download the asset at `url` into the file at `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::NotFound`] when the asset does not exist
    /// upstream, [`DownloadError::HttpError`] for other transport failures,
    /// and [`DownloadError::Io`] if the destination cannot be written.
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;
}

/// Errors arising from artefact download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested artefact was not found (HTTP 404).
    #[error("artefact not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Return true when another attempt could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::HttpError { .. })
    }
}

/// HTTP-based downloader using `ureq`.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    agent: ureq::Agent,
    retries: u32,
}

impl HttpDownloader {
    /// Build a downloader with the given per-attempt timeout and retry count.
    #[must_use]
    pub fn new(timeout: Duration, retries: u32) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            retries,
        }
    }

    fn fetch_once(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let mut file = std::fs::File::create(dest)?;
        std::io::copy(&mut response.into_body().as_reader(), &mut file).map_err(|e| {
            DownloadError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            }
        })?;
        Ok(())
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNLOAD_TIMEOUT, DEFAULT_RETRIES)
    }
}

impl ArtefactDownloader for HttpDownloader {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let mut attempt = 0;
        loop {
            debug!("fetching {url} (attempt {})", attempt + 1);
            match self.fetch_once(url, dest) {
                Err(err) if err.is_transient() && attempt < self.retries => {
                    warn!("retrying {url}: {err}");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
