//! GitHub-releases-backed version resolver.
//!
//! The stock [`VersionResolver`]: matches a semver range against the
//! `pulumi/pulumi` release list and derives the SDK download URL for every
//! distribution key from the matched version.

use async_trait::async_trait;
use reqwest::Client;
use semver::{Version, VersionReq};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

use pulumi_bootstrap_core::{
    ArchiveFormat, DistributionKey, Error, ResolvedVersion, Result, VersionResolver,
};

const RELEASES_URL: &str = "https://api.github.com/repos/pulumi/pulumi/releases?per_page=100";
const SDK_BASE_URL: &str = "https://get.pulumi.com/releases/sdk";

/// GitHub release metadata from the API.
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    draft: bool,
}

/// Version resolver backed by the `pulumi/pulumi` GitHub release list.
///
/// The range grammar is the `semver` crate's `VersionReq` plus the literal
/// `latest`, which selects the highest published version.
pub struct GithubVersionResolver {
    client: Client,
    releases_url: String,
}

impl Default for GithubVersionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl GithubVersionResolver {
    /// Create a resolver against the public GitHub API.
    ///
    /// # Panics
    ///
    /// `reqwest::Client::builder().build()` only fails when the TLS backend
    /// cannot initialize, which indicates a fundamental environment issue.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_releases_url(RELEASES_URL)
    }

    /// Create a resolver against an alternate release listing endpoint.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_releases_url(releases_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent("pulumi-bootstrap")
                .build()
                .expect("Failed to create HTTP client - TLS backend initialization failed"),
            releases_url: releases_url.into(),
        }
    }

    /// Fetch the release list from the GitHub API.
    async fn fetch_releases(&self) -> Result<Vec<Release>> {
        debug!(url = %self.releases_url, "Fetching release list");

        let mut request = self.client.get(&self.releases_url);

        // Add auth token if available to avoid rate limiting
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            request = request.header("Authorization", format!("Bearer {token}"));
        } else if let Ok(token) = std::env::var("GH_TOKEN") {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::resolution_failed(format!("Failed to fetch releases: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::resolution_failed(format!(
                "Release listing failed (HTTP {})",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::resolution_failed(format!("Failed to parse release list: {e}")))
    }
}

#[async_trait]
impl VersionResolver for GithubVersionResolver {
    async fn resolve(&self, range: &str) -> Result<ResolvedVersion> {
        let releases = self.fetch_releases().await?;
        let version = select_version(&releases, range)?;
        info!(%range, %version, "Matched version");

        Ok(ResolvedVersion {
            version: version.to_string(),
            downloads: sdk_downloads(&version),
        })
    }
}

/// Pick the highest released version satisfying `range`.
///
/// Drafts, prereleases, and tags that are not `v<semver>` are skipped.
fn select_version(releases: &[Release], range: &str) -> Result<Version> {
    let req = if range == "latest" {
        None
    } else {
        Some(VersionReq::parse(range).map_err(|e| {
            Error::resolution_failed(format!("invalid version range '{range}': {e}"))
        })?)
    };

    releases
        .iter()
        .filter(|release| !release.draft && !release.prerelease)
        .filter_map(|release| Version::parse(release.tag_name.trim_start_matches('v')).ok())
        .filter(|version| version.pre.is_empty())
        .filter(|version| req.as_ref().is_none_or(|req| req.matches(version)))
        .max()
        .ok_or_else(|| Error::VersionNotFound(range.to_string()))
}

/// SDK download URLs for every distribution of `version`.
fn sdk_downloads(version: &Version) -> HashMap<DistributionKey, String> {
    DistributionKey::all()
        .into_iter()
        .map(|key| {
            let ext = match key.archive_format() {
                ArchiveFormat::TarGz => "tar.gz",
                ArchiveFormat::Zip => "zip",
            };
            (key, format!("{SDK_BASE_URL}/pulumi-v{version}-{key}.{ext}"))
        })
        .collect()
}
