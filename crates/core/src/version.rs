//! Version resolution data model and the resolver seam.
//!
//! The pipeline consumes version resolution through the [`VersionResolver`]
//! trait: callers hand it an opaque range string and get back one concrete
//! version plus the download URL for every published distribution. The
//! stock implementation lives in `pulumi-bootstrap-installer`; tests swap in
//! stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{Error, Result};
use crate::platform::DistributionKey;

/// A concrete release chosen from a version range.
///
/// Produced once per run by a [`VersionResolver`] and consumed exactly once
/// by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedVersion {
    /// Concrete version identifier (e.g. "3.2.1").
    pub version: String,
    /// Download URL for each published distribution.
    pub downloads: HashMap<DistributionKey, String>,
}

impl ResolvedVersion {
    /// Select the download URL for one distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolutionFailed`] when the resolver's download map
    /// has no entry for `key` - the resolver promised a platform set it did
    /// not deliver.
    pub fn download_url(&self, key: DistributionKey) -> Result<&str> {
        self.downloads.get(&key).map(String::as_str).ok_or_else(|| {
            Error::resolution_failed(format!(
                "resolved version {} has no download for {key}",
                self.version
            ))
        })
    }
}

/// Resolves a version range to a concrete release.
///
/// The range string is opaque to the pipeline; its grammar belongs entirely
/// to the implementation. Implementations fail with
/// [`Error::VersionNotFound`] when the range matches no release and
/// [`Error::ResolutionFailed`] on transport or parse problems; the pipeline
/// propagates both unchanged and touches no filesystem state first.
#[async_trait]
pub trait VersionResolver: Send + Sync {
    /// Resolve `range` to a concrete version and its download map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VersionNotFound`] or [`Error::ResolutionFailed`].
    async fn resolve(&self, range: &str) -> Result<ResolvedVersion>;
}
