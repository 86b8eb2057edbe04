// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Reads package archives. Manages the extraction directory and provides API for accessing
//! package files, ELF files, and the package metadata.

mod elf;
mod extractor;
mod files;
mod pacman;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use thiserror::Error;

use crate::package::{FileEntry, MetadataError, Package};
pub use elf::{Elf, ElfClass, ElfError, ElfType};
use extractor::PackageExtractor;
pub use files::{ArchiveEntry, ArchiveFile};
use pacman::PacmanExtractor;

/// Entries of an archive keyed by their package-relative path, in path order.
pub type ArchiveEntries = BTreeMap<PathBuf, ArchiveEntry>;

/// Result type for archive operations.
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// Errors that can occur while reading a package archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to create/delete temporary directory")]
    TempDirFailed {
        #[source]
        source: std::io::Error,
    },
    #[error("Command not found: {command} (package: {path:?})")]
    CommandNotFound { command: String, path: PathBuf },
    #[error("Command failed: {command} (package: {path:?})")]
    CommandFailed {
        command: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Command timed out after {timeout:?}: {command} (package: {path:?})")]
    CommandTimeout {
        command: String,
        path: PathBuf,
        timeout: Duration,
    },
    #[error("Extraction failed for package {path:?}: {reason}")]
    ExtractionFailed { path: PathBuf, reason: String },
    #[error("Failed to walk extracted directory: {path:?}")]
    WalkDirFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("Unsupported package type: {path:?}")]
    UnsupportedPackageType { path: PathBuf },
    #[error("Failed to read file metadata: {path:?}")]
    MetadataFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read symlink: {path:?}")]
    ReadSymlinkFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read .PKGINFO of package {path:?}")]
    ReadPkgInfoFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Package has no .PKGINFO: {path:?}")]
    MissingPkgInfo { path: PathBuf },
    #[error("Invalid .PKGINFO in package {path:?}")]
    InvalidPkgInfo {
        path: PathBuf,
        #[source]
        source: MetadataError,
    },
}

/// A package archive with all of its entries inspected.
#[derive(Debug, Clone)]
pub struct Archive {
    path: PathBuf,
    entries: ArchiveEntries,
    pkginfo: Option<String>,
}

impl Archive {
    /// Extract and inspect the archive at `path`. The extraction directory is removed before
    /// this returns.
    ///
    /// # Errors
    /// Returns an error if the package type is unsupported or extraction fails.
    pub fn open(path: &Path) -> ArchiveResult<Self> {
        if !PacmanExtractor::handles(path) {
            return Err(ArchiveError::UnsupportedPackageType {
                path: path.to_path_buf(),
            });
        }

        let dest = TempDir::new().map_err(|e| ArchiveError::TempDirFailed { source: e })?;
        tracing::debug!(package = %path.display(), dest = %dest.path().display(), "Extracting package");
        let result = PacmanExtractor::extract(path, &dest);
        // Explicitly close the temporary directory to prevent any errors from being hidden.
        dest.close()
            .map_err(|e| ArchiveError::TempDirFailed { source: e })?;
        let extracted = result?;

        Ok(Self {
            path: path.to_path_buf(),
            entries: extracted.entries,
            pkginfo: extracted.pkginfo,
        })
    }

    /// Build an archive from entries that were inspected elsewhere.
    #[must_use]
    pub fn from_files(path: PathBuf, entries: ArchiveEntries, pkginfo: Option<String>) -> Self {
        Self {
            path,
            entries,
            pkginfo,
        }
    }

    /// Get the path to the archive.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the entries of the archive, without the archive bookkeeping files.
    #[must_use]
    pub fn entries(&self) -> &ArchiveEntries {
        &self.entries
    }

    /// Get the raw `.PKGINFO` text, if the archive has one.
    #[must_use]
    pub fn pkginfo(&self) -> Option<&str> {
        self.pkginfo.as_deref()
    }

    /// Get the ELF objects in path order.
    pub fn elfs(&self) -> impl Iterator<Item = (&Path, &Elf)> {
        self.entries
            .iter()
            .filter_map(|(path, entry)| entry.elf().map(|elf| (path.as_path(), elf)))
    }

    /// Build the package metadata from `.PKGINFO` with the archive contents as file list.
    ///
    /// # Errors
    /// Returns an error if `.PKGINFO` is missing or cannot be parsed.
    pub fn package(&self) -> ArchiveResult<Package> {
        let pkginfo = self
            .pkginfo
            .as_deref()
            .ok_or_else(|| ArchiveError::MissingPkgInfo {
                path: self.path.clone(),
            })?;
        let package =
            Package::from_pkginfo(pkginfo).map_err(|source| ArchiveError::InvalidPkgInfo {
                path: self.path.clone(),
                source,
            })?;

        let files = self
            .entries
            .iter()
            .map(|(path, entry)| {
                FileEntry::with_metadata(path.to_string_lossy(), entry.size(), entry.mode())
            })
            .collect();
        Ok(package.with_files(files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(file: ArchiveFile) -> ArchiveEntry {
        ArchiveEntry::new(file, 1024, 0o755)
    }

    fn sample_elf() -> Elf {
        Elf::new(
            ElfClass::Elf64,
            ElfType::Executable,
            vec!["libc.so.6".to_string()],
            None,
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn test_unsupported_package_type() {
        assert!(matches!(
            Archive::open(Path::new("foo_1.0_amd64.deb")),
            Err(ArchiveError::UnsupportedPackageType { .. })
        ));
    }

    #[test]
    fn test_elfs_in_path_order() {
        let mut entries = ArchiveEntries::new();
        entries.insert(PathBuf::from("usr/lib/libz.so.1"), entry(ArchiveFile::Elf(sample_elf())));
        entries.insert(PathBuf::from("usr/bin/foo"), entry(ArchiveFile::Elf(sample_elf())));
        entries.insert(PathBuf::from("usr/share/doc/README"), entry(ArchiveFile::File));
        entries.insert(
            PathBuf::from("usr/lib/libz.so"),
            entry(ArchiveFile::Symlink(PathBuf::from("usr/lib/libz.so.1"))),
        );
        let archive = Archive::from_files(PathBuf::from("foo.pkg.tar.zst"), entries, None);

        let paths: Vec<&Path> = archive.elfs().map(|(path, _)| path).collect();
        assert_eq!(
            paths,
            vec![Path::new("usr/bin/foo"), Path::new("usr/lib/libz.so.1")]
        );
    }

    #[test]
    fn test_package_from_pkginfo() {
        let mut entries = ArchiveEntries::new();
        entries.insert(PathBuf::from("usr/bin/foo"), entry(ArchiveFile::Elf(sample_elf())));
        let archive = Archive::from_files(
            PathBuf::from("foo-1.0-1-x86_64.pkg.tar.zst"),
            entries,
            Some("pkgname = foo\npkgver = 1.0-1\ndepend = glibc>=2.38\n".to_string()),
        );

        let package = archive.package().unwrap();
        assert_eq!(package.name(), "foo");
        assert_eq!(package.depends(), ["glibc"]);
        assert_eq!(package.files().len(), 1);
        assert_eq!(package.files()[0].path(), "usr/bin/foo");
        assert_eq!(package.files()[0].size(), Some(1024));
        assert_eq!(package.files()[0].mode(), Some(0o755));
    }

    #[test]
    fn test_package_without_pkginfo() {
        let archive = Archive::from_files(
            PathBuf::from("foo.pkg.tar.zst"),
            ArchiveEntries::new(),
            None,
        );
        assert!(matches!(
            archive.package(),
            Err(ArchiveError::MissingPkgInfo { .. })
        ));
    }

    #[test]
    fn test_package_with_invalid_pkginfo() {
        let archive = Archive::from_files(
            PathBuf::from("foo.pkg.tar.zst"),
            ArchiveEntries::new(),
            Some("pkgver = 1.0-1\n".to_string()),
        );
        assert!(matches!(
            archive.package(),
            Err(ArchiveError::InvalidPkgInfo { .. })
        ));
    }
}
