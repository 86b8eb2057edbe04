// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Defines the `PackageExtractor` trait and the shared machinery for running extraction tools.

use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Child;
use std::time::Duration;
use tempfile::TempDir;
use wait_timeout::ChildExt;
use walkdir::WalkDir;

use super::files::ArchiveEntry;
use super::{ArchiveEntries, ArchiveError, ArchiveResult};

/// Default timeout for package extraction commands (30 seconds).
pub(crate) const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Name of the metadata file at the root of every pacman package.
pub(crate) const PKGINFO: &str = ".PKGINFO";

// Bookkeeping files at the archive root that are not part of the installed file list.
const METADATA_FILES: [&str; 5] = [PKGINFO, ".BUILDINFO", ".MTREE", ".INSTALL", ".CHANGELOG"];

/// Contents of an extracted package: its file entries and the raw `.PKGINFO` text.
pub(crate) struct Extracted {
    pub(crate) entries: ArchiveEntries,
    pub(crate) pkginfo: Option<String>,
}

/// Wait for a child process to complete with a timeout.
///
/// Uses platform-specific APIs (SIGCHLD on Unix) to wait for the process without polling.
/// If the timeout is reached, the process is killed.
///
/// # Returns
/// - `Ok(ExitStatus)` if the process completed within the timeout
/// - `Err(ArchiveError::CommandTimeout)` if the process timed out
/// - `Err(ArchiveError::CommandFailed)` if there was an error waiting for the process
pub(crate) fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    command: &str,
    package_path: &Path,
) -> ArchiveResult<std::process::ExitStatus> {
    if let Some(status) = child
        .wait_timeout(timeout)
        .map_err(|e| ArchiveError::CommandFailed {
            command: command.to_string(),
            path: package_path.to_path_buf(),
            source: e,
        })?
    {
        if status.code().is_some() {
            Ok(status)
        } else if let Some(signal) = status.signal() {
            Err(ArchiveError::CommandFailed {
                command: command.to_string(),
                path: package_path.to_path_buf(),
                source: std::io::Error::other(format!("Process terminated by signal: {signal}")),
            })
        } else {
            Err(ArchiveError::CommandFailed {
                command: command.to_string(),
                path: package_path.to_path_buf(),
                source: std::io::Error::other("Unknown process termination"),
            })
        }
    } else {
        // Timeout has been reached - kill the process
        let _ = child.kill();
        let _ = child.wait();
        Err(ArchiveError::CommandTimeout {
            command: command.to_string(),
            path: package_path.to_path_buf(),
            timeout,
        })
    }
}

/// Represents a file extracted from the package.
pub(crate) struct ExtractedFile<'a> {
    extraction_directory: &'a Path, // Paths within the package are relative to this directory.
    extracted_path: &'a Path,
}

impl<'a> ExtractedFile<'a> {
    pub(crate) fn new(extraction_directory: &'a Path, extracted_path: &'a Path) -> Self {
        Self {
            extraction_directory,
            extracted_path,
        }
    }

    /// Get the path of the file within the extraction directory.
    pub(crate) fn path(&self) -> &Path {
        self.extracted_path
    }

    /// Get the package-relative path of the file (`usr/bin/foo`), as pacman file lists spell it.
    pub(crate) fn package_path(&self) -> PathBuf {
        // WalkDir only yields entries below the extraction directory.
        self.extracted_path
            .strip_prefix(self.extraction_directory)
            .unwrap_or(self.extracted_path)
            .to_path_buf()
    }
}

/// Trait for package extractors that perform the actual extraction logic.
pub(crate) trait PackageExtractor {
    /// Name of the external tool doing the extraction.
    const COMMAND: &'static str;

    /// Whether the extractor handles the file at `package`.
    fn handles(package: &Path) -> bool;

    /// Extract package contents to a destination directory.
    ///
    /// # Errors
    /// Returns an error if extraction fails.
    fn extract(package: &Path, dest: &TempDir) -> ArchiveResult<Extracted>;

    /// Walk the extracted directory, inspect every file, and capture `.PKGINFO`.
    ///
    /// # Errors
    /// Returns an error if walking the directory fails or no files are found.
    fn process(dest: &TempDir, package: &Path) -> ArchiveResult<Extracted> {
        let mut entries = ArchiveEntries::new();
        let mut pkginfo = None;
        for entry in WalkDir::new(dest.path()).min_depth(1) {
            let e = entry.map_err(|e| ArchiveError::WalkDirFailed {
                path: package.to_path_buf(),
                source: e,
            })?;
            if !(e.file_type().is_file() || e.file_type().is_symlink()) {
                continue;
            }
            let extracted_file = ExtractedFile::new(dest.path(), e.path());
            let package_path = extracted_file.package_path();

            if e.depth() == 1 && package_path.as_os_str() == PKGINFO {
                let text = fs::read_to_string(e.path()).map_err(|source| {
                    ArchiveError::ReadPkgInfoFailed {
                        path: package.to_path_buf(),
                        source,
                    }
                })?;
                pkginfo = Some(text);
                continue;
            }
            if e.depth() == 1
                && METADATA_FILES
                    .iter()
                    .any(|name| package_path.as_os_str() == *name)
            {
                continue;
            }

            entries.insert(package_path, ArchiveEntry::from_extracted(&extracted_file)?);
        }

        if entries.is_empty() && pkginfo.is_none() {
            Err(ArchiveError::ExtractionFailed {
                path: package.to_path_buf(),
                reason: "Extraction completed but no files were found".to_string(),
            })
        } else {
            Ok(Extracted { entries, pkginfo })
        }
    }
}
