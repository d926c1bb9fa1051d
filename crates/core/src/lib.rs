//! Core types for the Pulumi CLI bootstrap pipeline.
//!
//! This crate defines the vocabulary shared by every stage of the installer:
//! - The closed set of [`DistributionKey`]s the CLI is released for
//! - The [`ResolvedVersion`] produced by a [`VersionResolver`]
//! - The [`Error`] kinds each pipeline stage can terminate with
//!
//! The installer, fetcher, and cache themselves live in
//! `pulumi-bootstrap-installer`; this crate carries no I/O.

#![warn(missing_docs)]

pub mod errors;
pub mod platform;
pub mod version;

pub use errors::{Error, Result};
pub use platform::{ArchiveFormat, DistributionKey};
pub use version::{ResolvedVersion, VersionResolver};

/// Name under which the CLI is registered in the tool cache.
pub const TOOL_NAME: &str = "pulumi";

/// Directory under the invoking user's home that holds the installation.
pub const INSTALL_DIR_NAME: &str = ".pulumi";
