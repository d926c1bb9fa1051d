//! Host platform detection and distribution keys.
//!
//! The Pulumi CLI is released for a fixed set of (OS, architecture) targets.
//! Each target is one [`DistributionKey`]; the key is derived once per run
//! from the host operating system and drives every later branch in the
//! installer, so the set is a closed enum rather than a string table.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{Error, Result};

/// Archive format a distribution ships as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball (Linux and Darwin SDK archives).
    TarGz,
    /// Zip archive (Windows SDK archive).
    Zip,
}

/// One platform-specific distribution published for the Pulumi CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistributionKey {
    /// Linux on x86_64.
    #[serde(rename = "linux-x64")]
    LinuxX64,
    /// macOS on x86_64.
    #[serde(rename = "darwin-x64")]
    DarwinX64,
    /// Windows on x86_64.
    #[serde(rename = "windows-x64")]
    WindowsX64,
}

impl DistributionKey {
    /// Map a raw host operating-system identifier to its distribution key.
    ///
    /// Accepts exactly `linux`, `darwin` and `win32` (the identifiers CI
    /// runners report). Anything else is [`Error::UnsupportedPlatform`];
    /// there is no fallback or best-effort guess.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] for any other identifier.
    pub fn from_host_os(host_os: &str) -> Result<Self> {
        match host_os {
            "linux" => Ok(Self::LinuxX64),
            "darwin" => Ok(Self::DarwinX64),
            "win32" => Ok(Self::WindowsX64),
            other => Err(Error::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Detect the distribution key for the process's own host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] when the host OS is not one
    /// the CLI is released for.
    pub fn current() -> Result<Self> {
        match std::env::consts::OS {
            "linux" => Ok(Self::LinuxX64),
            "macos" => Ok(Self::DarwinX64),
            "windows" => Ok(Self::WindowsX64),
            other => Err(Error::UnsupportedPlatform(other.to_string())),
        }
    }

    /// The key as it appears in download maps and archive names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LinuxX64 => "linux-x64",
            Self::DarwinX64 => "darwin-x64",
            Self::WindowsX64 => "windows-x64",
        }
    }

    /// Archive format this distribution ships as.
    #[must_use]
    pub fn archive_format(self) -> ArchiveFormat {
        match self {
            Self::LinuxX64 | Self::DarwinX64 => ArchiveFormat::TarGz,
            Self::WindowsX64 => ArchiveFormat::Zip,
        }
    }

    /// All distribution keys the CLI is released for.
    #[must_use]
    pub fn all() -> [Self; 3] {
        [Self::LinuxX64, Self::DarwinX64, Self::WindowsX64]
    }
}

impl fmt::Display for DistributionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
