//! Install resolution and layout pipeline for the Pulumi CLI.
//!
//! Given a version range, this crate resolves a concrete release, downloads
//! the distribution archive for the host platform, normalizes it into the
//! canonical `<home>/.pulumi/bin` layout, and registers the result in a tool
//! cache keyed by (tool, version).
//!
//! # Example
//!
//! ```ignore
//! use pulumi_bootstrap_installer::{bootstrap_for_host, GithubVersionResolver, InstallOptions};
//!
//! let resolver = GithubVersionResolver::new();
//! let installed = bootstrap_for_host("^3.0.0", "linux", &resolver, &InstallOptions::new()).await?;
//!
//! // The orchestration layer prepends this to the executable search path.
//! println!("{}", installed.bin_dir.display());
//! ```

#![warn(missing_docs)]

pub mod cache;
pub mod download;
pub mod install;
pub mod pipeline;
pub mod resolve;

pub use cache::ToolCache;
pub use download::{ArchiveFetcher, DownloadedArchive};
pub use install::{InstallationRoot, install};
pub use pipeline::{InstallOptions, InstalledTool, bootstrap, bootstrap_for_host};
pub use resolve::GithubVersionResolver;
