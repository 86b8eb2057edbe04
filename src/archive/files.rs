// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Defines types for the entries of a package archive (ELF, Symlink, Other).

use path_clean::PathClean;
use serde::Serialize;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use super::elf::{Elf, ElfError};
use super::extractor::ExtractedFile;
use super::{ArchiveError, ArchiveResult};

/// Kind of a file in a package archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArchiveFile {
    File,
    Symlink(PathBuf), // Stores the normalized, package-relative target path of the symlink.
    Elf(Elf),
}

/// A file in a package archive together with its size and permission bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    file: ArchiveFile,
    size: u64,
    mode: u32,
}

impl ArchiveEntry {
    #[must_use]
    pub fn new(file: ArchiveFile, size: u64, mode: u32) -> Self {
        Self { file, size, mode }
    }

    /// Inspect an extracted file.
    ///
    /// Objects that look like ELF but cannot be parsed are kept as plain files.
    ///
    /// # Errors
    /// Returns an error if the file metadata or symlink target cannot be read.
    pub(crate) fn from_extracted(extracted_file: &ExtractedFile) -> ArchiveResult<Self> {
        let path = extracted_file.path();
        let metadata = fs::symlink_metadata(path).map_err(|e| ArchiveError::MetadataFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let size = metadata.len();
        let mode = metadata.permissions().mode() & 0o7777;

        if metadata.file_type().is_symlink() {
            let target = fs::read_link(path).map_err(|e| ArchiveError::ReadSymlinkFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
            // Absolute targets are rebased onto the package root, relative ones onto the
            // directory holding the link.
            let resolved_target = match target.strip_prefix("/") {
                Ok(stripped) => stripped.to_path_buf(),
                Err(_) => extracted_file
                    .package_path()
                    .parent()
                    .unwrap_or_else(|| Path::new(""))
                    .join(&target),
            };
            return Ok(Self::new(
                ArchiveFile::Symlink(resolved_target.clean()),
                size,
                mode,
            ));
        }

        let file = match Elf::from_path(path) {
            Ok(elf) => ArchiveFile::Elf(elf),
            Err(ElfError::NotElfFile { .. } | ElfError::FileTooSmall { .. }) => ArchiveFile::File,
            Err(e) => {
                tracing::warn!(
                    file = %extracted_file.package_path().display(),
                    error = %e,
                    "Treating unreadable ELF object as a plain file"
                );
                ArchiveFile::File
            }
        };
        Ok(Self::new(file, size, mode))
    }

    #[must_use]
    pub fn file(&self) -> &ArchiveFile {
        &self.file
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn mode(&self) -> u32 {
        self.mode
    }

    #[must_use]
    pub fn elf(&self) -> Option<&Elf> {
        match &self.file {
            ArchiveFile::Elf(elf) => Some(elf),
            _ => None,
        }
    }
}
