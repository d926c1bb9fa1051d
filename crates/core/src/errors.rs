//! Error types for bootstrap operations.
//!
//! Every pipeline stage terminates with exactly one of these kinds. None of
//! them is recoverable at this layer: there is no retry policy, and a failed
//! stage prevents every later stage from running.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for bootstrap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while bootstrapping the Pulumi CLI.
#[derive(Error, Debug)]
pub enum Error {
    /// Host operating system has no published distribution.
    #[error(
        "Unsupported operating system '{0}' - the Pulumi CLI is only released for Darwin, Linux and Windows"
    )]
    UnsupportedPlatform(String),

    /// No released version satisfies the requested range.
    #[error("No Pulumi release satisfies '{0}'")]
    VersionNotFound(String),

    /// Version resolution failed before a concrete version was chosen.
    #[error("Version resolution failed: {0}")]
    ResolutionFailed(String),

    /// Archive download failed, returned a non-success status, or was
    /// truncated mid-transfer.
    #[error("Failed to download '{url}': {message}")]
    DownloadFailed {
        /// The URL the fetch was issued against.
        url: String,
        /// Error message.
        message: String,
    },

    /// Removing a previous installation failed with a real I/O error.
    ///
    /// "Path already absent" is not an error and never produces this kind.
    #[error("Failed to remove previous installation at '{}': {source}", path.display())]
    CleanupFailed {
        /// The path being purged.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Unpacking the distribution archive failed.
    #[error("Failed to extract '{}' into '{}': {message}", archive.display(), dest.display())]
    ExtractionFailed {
        /// The archive being unpacked.
        archive: PathBuf,
        /// The extraction destination.
        dest: PathBuf,
        /// Error message.
        message: String,
    },

    /// Moving the extracted tree into its canonical location failed.
    #[error("Failed to move '{}' to '{}': {source}", from.display(), to.display())]
    LayoutNormalizationFailed {
        /// The extracted directory being moved.
        from: PathBuf,
        /// The canonical destination.
        to: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Registering the installed directory in the tool cache failed.
    ///
    /// Fatal: a tool later steps cannot locate is not installed.
    #[error("Failed to register installation in the tool cache: {0}")]
    CacheRegistrationFailed(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a resolution failed error.
    #[must_use]
    pub fn resolution_failed(message: impl Into<String>) -> Self {
        Self::ResolutionFailed(message.into())
    }

    /// Create a download failed error.
    #[must_use]
    pub fn download_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a cleanup failed error.
    #[must_use]
    pub fn cleanup_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CleanupFailed {
            path: path.into(),
            source,
        }
    }

    /// Create an extraction failed error.
    #[must_use]
    pub fn extraction_failed(
        archive: impl Into<PathBuf>,
        dest: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self::ExtractionFailed {
            archive: archive.into(),
            dest: dest.into(),
            message: message.into(),
        }
    }

    /// Create a layout normalization failed error.
    #[must_use]
    pub fn layout_failed(
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::LayoutNormalizationFailed {
            from: from.into(),
            to: to.into(),
            source,
        }
    }

    /// Create a cache registration failed error.
    #[must_use]
    pub fn cache_registration_failed(message: impl Into<String>) -> Self {
        Self::CacheRegistrationFailed(message.into())
    }
}
