//! Tool path cache keyed by (tool, version).
//!
//! After a successful install the normalized `bin` directory is copied into
//! the cache under `<root>/<tool>/<version>` and marked complete. The cached
//! path is what the orchestration layer adds to the executable search path;
//! an installation that cannot be registered here is not installed.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use pulumi_bootstrap_core::{Error, Result};

/// Registry mapping (tool, version) to an installed directory.
///
/// Default location: `~/.cache/pulumi-bootstrap/tools/`
///
/// Structure:
/// ```text
/// ~/.cache/pulumi-bootstrap/tools/
/// └── pulumi/
///     ├── 3.2.1/            # copied bin tree
///     │   └── pulumi
///     └── 3.2.1.complete    # written last; entry is valid only with it
/// ```
#[derive(Debug, Clone)]
pub struct ToolCache {
    root: PathBuf,
}

impl Default for ToolCache {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("pulumi-bootstrap")
            .join("tools");
        Self::new(cache_dir)
    }
}

impl ToolCache {
    /// Create a cache at the specified root directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a cache entry occupies.
    #[must_use]
    pub fn entry_dir(&self, tool: &str, version: &str) -> PathBuf {
        self.root.join(tool).join(version)
    }

    fn marker_path(&self, tool: &str, version: &str) -> PathBuf {
        self.root.join(tool).join(format!("{version}.complete"))
    }

    /// Get a cached entry if it was fully registered.
    #[must_use]
    pub fn lookup(&self, tool: &str, version: &str) -> Option<PathBuf> {
        let dir = self.entry_dir(tool, version);
        if dir.is_dir() && self.marker_path(tool, version).is_file() {
            trace!(tool, version, path = %dir.display(), "Cache hit");
            Some(dir)
        } else {
            trace!(tool, version, "Cache miss");
            None
        }
    }

    /// Copy `bin_dir` into the cache under (tool, version).
    ///
    /// Re-registration replaces the previous entry. The completion marker is
    /// written only after the copy finishes, so a partially copied entry is
    /// never observed as cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheRegistrationFailed`] when the cache store
    /// cannot be written.
    pub fn register(&self, bin_dir: &Path, tool: &str, version: &str) -> Result<PathBuf> {
        let dest = self.entry_dir(tool, version);
        let marker = self.marker_path(tool, version);

        let result = (|| -> io::Result<()> {
            match std::fs::remove_file(&marker) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
            match std::fs::remove_dir_all(&dest) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
            copy_dir(bin_dir, &dest)?;
            std::fs::write(&marker, b"")?;
            Ok(())
        })();

        result.map_err(|e| Error::cache_registration_failed(format!("{tool} {version}: {e}")))?;

        debug!(tool, version, path = %dest.display(), "Registered installation in tool cache");
        Ok(dest)
    }
}

/// Recursively copy a directory tree, preserving file permissions.
fn copy_dir(source: &Path, dest: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
