//! Installation root purge, extraction, and layout normalization.
//!
//! Upstream SDK archives are not laid out consistently across platforms: the
//! tarballs carry a top-level `pulumi/` folder holding the binaries, while
//! the Windows zip carries a `Pulumi/` folder that already contains a `bin`
//! subdirectory. Both branches here converge on the same post-condition -
//! `root/bin` exists and holds the executable tree - so callers see one
//! stable path regardless of host OS.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, info};

use pulumi_bootstrap_core::{DistributionKey, Error, INSTALL_DIR_NAME, Result, TOOL_NAME};

/// The canonical directory the CLI is installed under.
///
/// Installation is destructive-replace: at any time at most one live set of
/// binaries exists under `bin_dir()`, and each install run purges whatever
/// the previous run left there.
#[derive(Debug, Clone)]
pub struct InstallationRoot {
    root: PathBuf,
}

impl InstallationRoot {
    /// Use an explicit root directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The default root, `<home>/.pulumi`.
    ///
    /// # Errors
    ///
    /// Fails when the home directory cannot be determined.
    pub fn in_home_dir() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "home directory not found",
            ))
        })?;
        Ok(Self::new(home.join(INSTALL_DIR_NAME)))
    }

    /// The root directory itself.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// The canonical executable directory, `root/bin`.
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }
}

/// Install a downloaded archive under `root`, returning the `bin` directory.
///
/// Removes any prior installation first, extracts with the format the
/// distribution ships as, then normalizes the extracted tree so `root/bin`
/// holds the executables.
///
/// # Errors
///
/// Returns [`Error::CleanupFailed`] when purging a previous installation
/// fails with anything other than "path does not exist",
/// [`Error::ExtractionFailed`] when unpacking fails, and
/// [`Error::LayoutNormalizationFailed`] when the extracted tree cannot be
/// moved into its canonical location.
pub fn install(archive: &Path, key: DistributionKey, root: &InstallationRoot) -> Result<PathBuf> {
    purge_bin(root)?;

    match key {
        DistributionKey::WindowsX64 => install_from_zip(archive, root)?,
        DistributionKey::LinuxX64 | DistributionKey::DarwinX64 => {
            install_from_tar_gz(archive, root)?;
        }
    }

    // Both branches must converge here; claiming success without a bin
    // directory would strand every later step.
    let bin = root.bin_dir();
    if !bin.is_dir() {
        return Err(Error::extraction_failed(
            archive,
            root.path(),
            "archive produced no bin directory",
        ));
    }

    info!(bin = %bin.display(), "Installed Pulumi CLI");
    Ok(bin)
}

/// Remove `root/bin` from a previous run.
///
/// A missing path is success. Any other failure is surfaced rather than
/// swallowed: a purge that silently fails would let stale binaries shadow
/// the new installation.
fn purge_bin(root: &InstallationRoot) -> Result<()> {
    let bin = root.bin_dir();
    match std::fs::remove_dir_all(&bin) {
        Ok(()) => {
            debug!(path = %bin.display(), "Removed pre-existing bin directory");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::cleanup_failed(bin, e)),
    }
}

/// Tarball branch: unpack into `root`, then rename `root/pulumi` to
/// `root/bin`.
fn install_from_tar_gz(archive_path: &Path, root: &InstallationRoot) -> Result<()> {
    std::fs::create_dir_all(root.path())
        .map_err(|e| Error::extraction_failed(archive_path, root.path(), e.to_string()))?;

    let file = File::open(archive_path)
        .map_err(|e| Error::extraction_failed(archive_path, root.path(), e.to_string()))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive
        .unpack(root.path())
        .map_err(|e| Error::extraction_failed(archive_path, root.path(), e.to_string()))?;
    debug!(dest = %root.path().display(), "Extracted tarball");

    let extracted = root.path().join(TOOL_NAME);
    let bin = root.bin_dir();
    std::fs::rename(&extracted, &bin).map_err(|e| Error::layout_failed(extracted, bin, e))?;
    Ok(())
}

/// Zip branch: extract into a staging directory beside `root`, then replace
/// `root` with the single top-level folder the archive carries.
///
/// The staging directory lives on the same filesystem as `root` so the
/// final move is one rename, and it is dropped on failure so nothing stray
/// is left next to the installation.
fn install_from_zip(archive_path: &Path, root: &InstallationRoot) -> Result<()> {
    let parent = root.path().parent().ok_or_else(|| {
        Error::extraction_failed(
            archive_path,
            root.path(),
            "installation root has no parent directory",
        )
    })?;
    std::fs::create_dir_all(parent)
        .map_err(|e| Error::extraction_failed(archive_path, parent, e.to_string()))?;

    let staging = tempfile::Builder::new()
        .prefix(".pulumi-extract")
        .tempdir_in(parent)
        .map_err(|e| Error::extraction_failed(archive_path, parent, e.to_string()))?;

    extract_zip(archive_path, staging.path())?;

    // The upstream zip carries one top-level folder (`Pulumi`) whose name
    // does not match the canonical root name.
    let extracted = single_top_level_dir(staging.path())
        .map_err(|e| Error::extraction_failed(archive_path, staging.path(), e.to_string()))?
        .ok_or_else(|| {
            Error::extraction_failed(
                archive_path,
                staging.path(),
                "archive does not contain a single top-level directory",
            )
        })?;

    match std::fs::remove_dir_all(root.path()) {
        Ok(()) => debug!(path = %root.path().display(), "Removed previous installation root"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::cleanup_failed(root.path(), e)),
    }

    std::fs::rename(&extracted, root.path())
        .map_err(|e| Error::layout_failed(extracted, root.path(), e))?;
    Ok(())
}

/// Extract a zip archive into `dest`, preserving unix modes where recorded.
fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let result = (|| -> io::Result<()> {
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(io::Error::other)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(io::Error::other)?;
            let Some(relative) = entry.enclosed_name() else {
                continue;
            };
            let outpath = dest.join(relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&outpath)?;
            } else {
                if let Some(parent) = outpath.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&outpath)?;
                io::copy(&mut entry, &mut out)?;

                #[cfg(unix)]
                if let Some(mode) = entry.unix_mode() {
                    use std::os::unix::fs::PermissionsExt;
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
                }
            }
        }
        Ok(())
    })();

    result.map_err(|e| Error::extraction_failed(archive_path, dest, e.to_string()))
}

/// The single directory entry of `dir`, if that is all `dir` contains.
fn single_top_level_dir(dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut found = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() || found.is_some() {
            return Ok(None);
        }
        found = Some(entry.path());
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    /// Build a gzip tarball holding `files`, each with mode 0755.
    fn create_tar_gz(dir: &Path, files: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join("sdk.tar.gz");
        let file = File::create(&path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(content.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append(&header, &content[..]).unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    /// Build a zip holding `files`.
    fn create_zip(dir: &Path, files: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join("sdk.zip");
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default().unix_permissions(0o755);

        for (name, content) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }

        writer.finish().unwrap();
        path
    }

    fn relative_files(dir: &Path) -> Vec<String> {
        fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    walk(base, &path, out);
                } else {
                    out.push(
                        path.strip_prefix(base)
                            .unwrap()
                            .to_string_lossy()
                            .into_owned(),
                    );
                }
            }
        }
        let mut out = Vec::new();
        walk(dir, dir, &mut out);
        out.sort();
        out
    }

    #[test]
    fn test_tar_branch_normalizes_to_bin() {
        let temp = TempDir::new().unwrap();
        let archive = create_tar_gz(
            temp.path(),
            &[
                ("pulumi/pulumi", b"cli".as_slice()),
                ("pulumi/pulumi-language-go", b"lang".as_slice()),
            ],
        );
        let root = InstallationRoot::new(temp.path().join(".pulumi"));

        let bin = install(&archive, DistributionKey::LinuxX64, &root).unwrap();

        assert_eq!(bin, root.bin_dir());
        assert!(bin.join("pulumi").is_file());
        assert!(bin.join("pulumi-language-go").is_file());
        // The archive's top-level folder must not survive.
        assert!(!root.path().join("pulumi").exists());
    }

    #[test]
    fn test_zip_branch_normalizes_to_bin() {
        let temp = TempDir::new().unwrap();
        let archive = create_zip(
            temp.path(),
            &[("Pulumi/bin/pulumi.exe", b"cli".as_slice())],
        );
        let root = InstallationRoot::new(temp.path().join(".pulumi"));

        let bin = install(&archive, DistributionKey::WindowsX64, &root).unwrap();

        assert_eq!(bin, root.bin_dir());
        assert!(bin.join("pulumi.exe").is_file());
        // The staging directory must be gone.
        let leftovers: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(".pulumi-extract"))
            .collect();
        assert!(leftovers.is_empty(), "staging left behind: {leftovers:?}");
    }

    #[test]
    fn test_branches_converge_on_identical_layout() {
        let temp = TempDir::new().unwrap();
        let files: &[(&str, &[u8])] =
            &[("pulumi", b"cli".as_slice()), ("pulumi-watch", b"w".as_slice())];

        let tar_files: Vec<(String, &[u8])> = files
            .iter()
            .map(|(name, content)| (format!("pulumi/{name}"), *content))
            .collect();
        let tar_refs: Vec<(&str, &[u8])> = tar_files
            .iter()
            .map(|(name, content)| (name.as_str(), *content))
            .collect();
        let tarball = create_tar_gz(temp.path(), &tar_refs);

        let zip_files: Vec<(String, &[u8])> = files
            .iter()
            .map(|(name, content)| (format!("Pulumi/bin/{name}"), *content))
            .collect();
        let zip_refs: Vec<(&str, &[u8])> = zip_files
            .iter()
            .map(|(name, content)| (name.as_str(), *content))
            .collect();
        let zipball = create_zip(temp.path(), &zip_refs);

        let tar_root = InstallationRoot::new(temp.path().join("tar-root"));
        let zip_root = InstallationRoot::new(temp.path().join("zip-root"));

        let tar_bin = install(&tarball, DistributionKey::LinuxX64, &tar_root).unwrap();
        let zip_bin = install(&zipball, DistributionKey::WindowsX64, &zip_root).unwrap();

        assert_eq!(relative_files(&tar_bin), relative_files(&zip_bin));
    }

    #[test]
    fn test_reinstall_purges_stale_files() {
        let temp = TempDir::new().unwrap();
        let archive = create_tar_gz(temp.path(), &[("pulumi/pulumi", b"cli".as_slice())]);
        let root = InstallationRoot::new(temp.path().join(".pulumi"));

        let bin = install(&archive, DistributionKey::LinuxX64, &root).unwrap();
        std::fs::write(bin.join("stale-plugin"), b"old").unwrap();

        let bin = install(&archive, DistributionKey::LinuxX64, &root).unwrap();
        assert!(bin.join("pulumi").is_file());
        assert!(!bin.join("stale-plugin").exists());
    }

    #[test]
    fn test_zip_reinstall_replaces_whole_root() {
        let temp = TempDir::new().unwrap();
        let root = InstallationRoot::new(temp.path().join(".pulumi"));

        let first = create_zip(
            temp.path(),
            &[
                ("Pulumi/bin/pulumi.exe", b"v1".as_slice()),
                ("Pulumi/bin/extra.dll", b"lib".as_slice()),
            ],
        );
        install(&first, DistributionKey::WindowsX64, &root).unwrap();

        let temp2 = TempDir::new().unwrap();
        let second = create_zip(temp2.path(), &[("Pulumi/bin/pulumi.exe", b"v2".as_slice())]);
        let bin = install(&second, DistributionKey::WindowsX64, &root).unwrap();

        assert_eq!(std::fs::read(bin.join("pulumi.exe")).unwrap(), b"v2");
        assert!(!bin.join("extra.dll").exists());
    }

    #[test]
    fn test_purge_failure_is_surfaced_not_swallowed() {
        let temp = TempDir::new().unwrap();
        let archive = create_tar_gz(temp.path(), &[("pulumi/pulumi", b"cli".as_slice())]);
        let root = InstallationRoot::new(temp.path().join(".pulumi"));

        // A regular file where the bin directory is expected makes the
        // purge fail with a real I/O error (not "path does not exist"),
        // which must surface as CleanupFailed rather than being ignored.
        std::fs::create_dir_all(root.path()).unwrap();
        std::fs::write(root.bin_dir(), b"not a directory").unwrap();

        let err = install(&archive, DistributionKey::LinuxX64, &root).unwrap_err();
        assert!(matches!(err, Error::CleanupFailed { ref path, .. } if path == &root.bin_dir()));
    }

    #[test]
    fn test_missing_prior_installation_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let archive = create_tar_gz(temp.path(), &[("pulumi/pulumi", b"cli".as_slice())]);
        let root = InstallationRoot::new(temp.path().join("never-existed").join(".pulumi"));

        assert!(install(&archive, DistributionKey::LinuxX64, &root).is_ok());
    }

    #[test]
    fn test_tarball_without_expected_folder_fails_normalization() {
        let temp = TempDir::new().unwrap();
        let archive = create_tar_gz(temp.path(), &[("elsewhere/pulumi", b"cli".as_slice())]);
        let root = InstallationRoot::new(temp.path().join(".pulumi"));

        let err = install(&archive, DistributionKey::LinuxX64, &root).unwrap_err();
        assert!(matches!(err, Error::LayoutNormalizationFailed { .. }));
    }

    #[test]
    fn test_zip_without_single_top_level_dir_fails() {
        let temp = TempDir::new().unwrap();
        let archive = create_zip(
            temp.path(),
            &[
                ("Pulumi/bin/pulumi.exe", b"cli".as_slice()),
                ("Other/readme.txt", b"hi".as_slice()),
            ],
        );
        let root = InstallationRoot::new(temp.path().join(".pulumi"));

        let err = install(&archive, DistributionKey::WindowsX64, &root).unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed { .. }));
    }

    #[test]
    fn test_corrupt_archive_fails_extraction() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("sdk.tar.gz");
        std::fs::write(&archive, b"not a tarball").unwrap();
        let root = InstallationRoot::new(temp.path().join(".pulumi"));

        let err = install(&archive, DistributionKey::LinuxX64, &root).unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_extraction_preserves_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let archive = create_tar_gz(temp.path(), &[("pulumi/pulumi", b"cli".as_slice())]);
        let root = InstallationRoot::new(temp.path().join(".pulumi"));

        let bin = install(&archive, DistributionKey::LinuxX64, &root).unwrap();
        let mode = std::fs::metadata(bin.join("pulumi"))
            .unwrap()
            .permissions()
            .mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[test]
    fn test_single_top_level_dir_propagates_io_errors() {
        let temp = TempDir::new().unwrap();
        let err = single_top_level_dir(&temp.path().join("gone")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_installation_root_paths() {
        let root = InstallationRoot::new("/home/runner/.pulumi");
        assert_eq!(root.path(), Path::new("/home/runner/.pulumi"));
        assert_eq!(root.bin_dir(), PathBuf::from("/home/runner/.pulumi/bin"));
    }
}
