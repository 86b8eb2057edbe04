// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Read-only lookup of installed packages by name and by provided name.

mod database;

pub use database::DatabaseIndex;

use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::package::Package;

/// Result type for package index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Errors that can occur when loading a package index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to read package database: {path:?}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Lookup of packages known to the system.
///
/// Shared read-only by every analysis pass of a run, hence `Sync`.
pub trait PackageIndex: Sync {
    /// Find the package registered under exactly `name`.
    fn lookup(&self, name: &str) -> Option<&Package>;

    /// Find a package whose (version-stripped) `provides` contains `name`.
    fn lookup_provider(&self, name: &str) -> Option<&Package>;

    /// All installed packages, in name order.
    fn all_installed(&self) -> Vec<&Package>;

    /// Find the package for `name`, falling back to a provider when no package has that name.
    fn resolve(&self, name: &str) -> Option<&Package> {
        self.lookup(name).or_else(|| self.lookup_provider(name))
    }
}

/// A package index held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    packages: BTreeMap<String, Package>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new(packages: impl IntoIterator<Item = Package>) -> Self {
        let mut index = Self::default();
        for package in packages {
            index.insert(package);
        }
        index
    }

    /// Add a package, replacing any package of the same name.
    pub fn insert(&mut self, package: Package) {
        self.packages.insert(package.name().to_string(), package);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl PackageIndex for MemoryIndex {
    fn lookup(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    fn lookup_provider(&self, name: &str) -> Option<&Package> {
        self.packages
            .values()
            .find(|package| package.provides().iter().any(|provide| provide == name))
    }

    fn all_installed(&self) -> Vec<&Package> {
        self.packages.values().collect()
    }
}
