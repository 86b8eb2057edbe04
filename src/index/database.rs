// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Loads a pacman-layout package database (`<name>-<version>/desc` and `files`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{IndexError, IndexResult, MemoryIndex, PackageIndex};
use crate::package::Package;

/// A package index read from a pacman database directory, e.g. `/var/lib/pacman/local`.
///
/// The whole database is read once when opened.
#[derive(Debug, Clone)]
pub struct DatabaseIndex {
    path: PathBuf,
    packages: MemoryIndex,
}

impl DatabaseIndex {
    /// Read every package entry below `path`.
    ///
    /// A database directory that does not exist yields an empty index. Entries that cannot be
    /// read or parsed are skipped.
    ///
    /// # Errors
    /// Returns an error if the database directory exists but cannot be listed.
    pub fn open(path: &Path) -> IndexResult<Self> {
        let dir = match fs::read_dir(path) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(dbpath = %path.display(), "Package database not found, using an empty index");
                return Ok(Self {
                    path: path.to_path_buf(),
                    packages: MemoryIndex::default(),
                });
            }
            Err(e) => {
                return Err(IndexError::ReadDirFailed {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let mut entries = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| IndexError::ReadDirFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
            // Skip ALPM_DB_VERSION and other plain files.
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                entries.push(entry.path());
            }
        }
        entries.sort();

        let mut packages = MemoryIndex::default();
        for entry in entries {
            match Self::read_entry(&entry) {
                Ok(package) => packages.insert(package),
                Err(error) => {
                    tracing::warn!(entry = %entry.display(), error = %error, "Skipping unreadable database entry");
                }
            }
        }
        tracing::debug!(dbpath = %path.display(), packages = packages.len(), "Loaded package database");

        Ok(Self {
            path: path.to_path_buf(),
            packages,
        })
    }

    /// Get the database directory this index was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entry(entry: &Path) -> anyhow::Result<Package> {
        let mut text = fs::read_to_string(entry.join("desc"))?;
        // Repository databases carry no file lists.
        match fs::read_to_string(entry.join("files")) {
            Ok(files) => {
                text.push('\n');
                text.push_str(&files);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(Package::from_db_entry(&text)?)
    }
}

impl PackageIndex for DatabaseIndex {
    fn lookup(&self, name: &str) -> Option<&Package> {
        self.packages.lookup(name)
    }

    fn lookup_provider(&self, name: &str) -> Option<&Package> {
        self.packages.lookup_provider(name)
    }

    fn all_installed(&self) -> Vec<&Package> {
        self.packages.all_installed()
    }
}
