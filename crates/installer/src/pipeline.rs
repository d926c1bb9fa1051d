//! The linear bootstrap pipeline.
//!
//! Stages run strictly in order: platform, version, download, install,
//! cache. Each stage's output is the next stage's sole input and no stage
//! re-enters an earlier one. The first failure is final - there is no retry
//! and no partial success is ever reported - and version resolution happens
//! before any filesystem mutation, so a failed resolution leaves the
//! installation root untouched.

use std::path::PathBuf;
use tracing::info;

use pulumi_bootstrap_core::{DistributionKey, Result, TOOL_NAME, VersionResolver};

use crate::cache::ToolCache;
use crate::download::ArchiveFetcher;
use crate::install::{self, InstallationRoot};

/// Options for a bootstrap run.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Custom installation root (default `<home>/.pulumi`).
    pub root: Option<PathBuf>,
    /// Custom tool cache directory.
    pub cache_dir: Option<PathBuf>,
}

impl InstallOptions {
    /// Create options with the default root and cache locations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the installation root.
    #[must_use]
    pub fn with_root(mut self, path: PathBuf) -> Self {
        self.root = Some(path);
        self
    }

    /// Set the tool cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, path: PathBuf) -> Self {
        self.cache_dir = Some(path);
        self
    }

    fn installation_root(&self) -> Result<InstallationRoot> {
        self.root
            .clone()
            .map_or_else(InstallationRoot::in_home_dir, |path| {
                Ok(InstallationRoot::new(path))
            })
    }

    fn tool_cache(&self) -> ToolCache {
        self.cache_dir.clone().map_or_else(ToolCache::default, ToolCache::new)
    }
}

/// A completed installation, ready to publish.
#[derive(Debug, Clone)]
pub struct InstalledTool {
    /// Tool name the cache entry is keyed by.
    pub name: String,
    /// Concrete installed version.
    pub version: String,
    /// Cached executable directory. Publishing means prepending this path
    /// to the environment's search path; that belongs to the orchestration
    /// layer, not this crate.
    pub bin_dir: PathBuf,
}

/// Run the full pipeline, resolving the distribution key from a raw host
/// operating-system identifier (`linux`, `darwin` or `win32`).
///
/// # Errors
///
/// Returns [`pulumi_bootstrap_core::Error::UnsupportedPlatform`] before
/// anything else runs when the identifier is outside the released set, or
/// whatever single stage error terminated the pipeline.
pub async fn bootstrap_for_host(
    range: &str,
    host_os: &str,
    resolver: &dyn VersionResolver,
    options: &InstallOptions,
) -> Result<InstalledTool> {
    let key = DistributionKey::from_host_os(host_os)?;
    bootstrap(range, key, resolver, options).await
}

/// Run the full pipeline for an explicit distribution key.
///
/// # Errors
///
/// Returns the error kind of the first stage that failed; later stages do
/// not execute.
pub async fn bootstrap(
    range: &str,
    key: DistributionKey,
    resolver: &dyn VersionResolver,
    options: &InstallOptions,
) -> Result<InstalledTool> {
    info!(%range, %key, "Configured range");

    let resolved = resolver.resolve(range).await?;
    let url = resolved.download_url(key)?;
    let archive = ArchiveFetcher::new().fetch(url).await?;

    let root = options.installation_root()?;
    info!(destination = %root.path().display(), "Install destination");
    let bin_dir = install::install(archive.path(), key, &root)?;

    let cached = options
        .tool_cache()
        .register(&bin_dir, TOOL_NAME, &resolved.version)?;
    info!(version = %resolved.version, path = %cached.display(), "Pulumi CLI installed");

    Ok(InstalledTool {
        name: TOOL_NAME.to_string(),
        version: resolved.version,
        bin_dir: cached,
    })
}
