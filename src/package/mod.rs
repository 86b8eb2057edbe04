// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Normalized package metadata, built from `.PKGINFO` files, package database entries,
//! or plain key/value pairs.
//!
//! Every constructor goes through [`Package::from_raw`], which resolves key aliases once and
//! strips version constraints off `depends`, `makedepends`, `optdepends`, and `provides`. The
//! raw strings stay available through the `orig_*` accessors for diagnostics that need to show
//! real version strings.

mod depends;
mod detected;

pub use depends::strip_depend_info;
pub use detected::{DependencyReason, DetectedDependencies};

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;

/// Errors that make package metadata unusable.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Invalid dependency specification: {value:?}")]
    MalformedDependency { value: String },
    #[error("Package metadata has no {field} field")]
    MissingField { field: &'static str },
}

/// Raw metadata as read from the input, keyed by canonical field name.
type RawFields = BTreeMap<String, Vec<String>>;

/// One entry of a package file list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    path: String,
    size: Option<u64>,
    mode: Option<u32>,
}

impl FileEntry {
    /// A file list entry where only the path is known (package database file lists).
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: None,
            mode: None,
        }
    }

    #[must_use]
    pub fn with_metadata(path: impl Into<String>, size: u64, mode: u32) -> Self {
        Self {
            path: path.into(),
            size: Some(size),
            mode: Some(mode),
        }
    }

    /// Package-relative path, e.g. `usr/lib/libfoo.so.1`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    #[must_use]
    pub fn mode(&self) -> Option<u32> {
        self.mode
    }
}

/// Metadata of a single package.
#[derive(Debug, Clone, Default)]
pub struct Package {
    name: String,
    base: Option<String>,
    version: Option<String>,
    description: Option<String>,
    url: Option<String>,
    packager: Option<String>,
    arch: Vec<String>,
    licenses: Vec<String>,
    groups: Vec<String>,
    depends: Vec<String>,
    makedepends: Vec<String>,
    optdepends: Vec<String>,
    provides: Vec<String>,
    conflicts: Vec<String>,
    replaces: Vec<String>,
    backup: Vec<String>,
    orig_depends: Vec<String>,
    orig_makedepends: Vec<String>,
    orig_optdepends: Vec<String>,
    orig_provides: Vec<String>,
    files: Vec<FileEntry>,
    is_split: bool,
    subpackages: Vec<Package>,
    detected: DetectedDependencies,
}

impl Package {
    /// Build a package from key/value pairs. Keys may use any of the accepted aliases
    /// (`pkgname`, `depend`, `optdepend`, ...). Values of `files` are package-relative paths.
    ///
    /// # Errors
    /// Returns an error if there is no name or a dependency string cannot be parsed.
    pub fn from_fields<K, I, V>(fields: impl IntoIterator<Item = (K, I)>) -> MetadataResult<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let mut raw = RawFields::new();
        for (key, values) in fields {
            raw.entry(canonical_varname(key.as_ref()).to_string())
                .or_default()
                .extend(values.into_iter().map(Into::into));
        }
        Self::from_raw(raw)
    }

    /// Parse the contents of a `.PKGINFO` file (`key = value` lines).
    ///
    /// # Errors
    /// Returns an error if there is no `pkgname` or a dependency string cannot be parsed.
    pub fn from_pkginfo(pkginfo: &str) -> MetadataResult<Self> {
        let mut raw = RawFields::new();
        for line in pkginfo.lines() {
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(" = ") else {
                continue;
            };
            let value = value.trim_end();
            if value.is_empty() {
                continue;
            }
            raw.entry(canonical_varname(key.trim()).to_string())
                .or_default()
                .push(value.to_string());
        }
        Self::from_raw(raw)
    }

    /// Parse a package database entry (`%SECTION%` headers followed by one value per line).
    ///
    /// Records separated by `\0` describe a split package: the first record is the base and
    /// every following record becomes one of its [`subpackages`](Self::subpackages).
    ///
    /// # Errors
    /// Returns an error if a record has no `%NAME%` or a dependency string cannot be parsed.
    pub fn from_db_entry(entry: &str) -> MetadataResult<Self> {
        let mut records = entry.split('\0');
        let base = records.next().unwrap_or_default();
        let subpackages = records
            .map(Self::from_db_entry)
            .collect::<MetadataResult<Vec<_>>>()?;

        let mut raw = RawFields::new();
        let mut section: Option<String> = None;
        for line in base.lines() {
            if line.starts_with('%') {
                let key = line.trim().trim_matches('%').to_lowercase();
                section = Some(canonical_varname(&key).to_string());
            } else if let Some(section) = section.as_ref().filter(|_| !line.trim().is_empty()) {
                raw.entry(section.clone()).or_default().push(line.to_string());
            }
        }

        let mut package = Self::from_raw(raw)?;
        if !subpackages.is_empty() {
            package.is_split = true;
            package.subpackages = subpackages;
        }
        Ok(package)
    }

    /// Attach a file list carrying size and mode, e.g. read from the package archive itself.
    #[must_use]
    pub fn with_files(mut self, files: Vec<FileEntry>) -> Self {
        self.files = files;
        self
    }

    fn from_raw(mut raw: RawFields) -> MetadataResult<Self> {
        let name =
            take_scalar(&mut raw, "name").ok_or(MetadataError::MissingField { field: "name" })?;

        let orig_depends = take_list(&mut raw, "depends");
        let orig_makedepends = take_list(&mut raw, "makedepends");
        let orig_optdepends = take_list(&mut raw, "optdepends");
        let orig_provides = take_list(&mut raw, "provides");

        Ok(Self {
            name,
            base: take_scalar(&mut raw, "base"),
            version: take_scalar(&mut raw, "version"),
            description: take_scalar(&mut raw, "description"),
            url: take_scalar(&mut raw, "url"),
            packager: take_scalar(&mut raw, "packager"),
            arch: take_list(&mut raw, "arch"),
            licenses: take_list(&mut raw, "licenses"),
            groups: take_list(&mut raw, "groups"),
            depends: strip_all(&orig_depends)?,
            makedepends: strip_all(&orig_makedepends)?,
            optdepends: strip_all(&orig_optdepends)?,
            provides: strip_all(&orig_provides)?,
            conflicts: take_list(&mut raw, "conflicts"),
            replaces: take_list(&mut raw, "replaces"),
            backup: take_list(&mut raw, "backup"),
            orig_depends,
            orig_makedepends,
            orig_optdepends,
            orig_provides,
            files: take_list(&mut raw, "files")
                .into_iter()
                .map(FileEntry::new)
                .collect(),
            is_split: false,
            subpackages: Vec::new(),
            detected: DetectedDependencies::default(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[must_use]
    pub fn packager(&self) -> Option<&str> {
        self.packager.as_deref()
    }

    #[must_use]
    pub fn arch(&self) -> &[String] {
        &self.arch
    }

    #[must_use]
    pub fn licenses(&self) -> &[String] {
        &self.licenses
    }

    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Runtime dependencies with version constraints stripped.
    #[must_use]
    pub fn depends(&self) -> &[String] {
        &self.depends
    }

    #[must_use]
    pub fn makedepends(&self) -> &[String] {
        &self.makedepends
    }

    /// Optional dependencies with version constraints and descriptions stripped.
    #[must_use]
    pub fn optdepends(&self) -> &[String] {
        &self.optdepends
    }

    #[must_use]
    pub fn provides(&self) -> &[String] {
        &self.provides
    }

    #[must_use]
    pub fn conflicts(&self) -> &[String] {
        &self.conflicts
    }

    #[must_use]
    pub fn replaces(&self) -> &[String] {
        &self.replaces
    }

    #[must_use]
    pub fn backup(&self) -> &[String] {
        &self.backup
    }

    #[must_use]
    pub fn orig_depends(&self) -> &[String] {
        &self.orig_depends
    }

    #[must_use]
    pub fn orig_makedepends(&self) -> &[String] {
        &self.orig_makedepends
    }

    #[must_use]
    pub fn orig_optdepends(&self) -> &[String] {
        &self.orig_optdepends
    }

    #[must_use]
    pub fn orig_provides(&self) -> &[String] {
        &self.orig_provides
    }

    #[must_use]
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    #[must_use]
    pub fn is_split(&self) -> bool {
        self.is_split
    }

    #[must_use]
    pub fn subpackages(&self) -> &[Package] {
        &self.subpackages
    }

    /// Dependencies found so far by the inspection passes.
    #[must_use]
    pub fn detected(&self) -> &DetectedDependencies {
        &self.detected
    }

    /// Inspection passes add their findings here, one pass at a time.
    pub fn detected_mut(&mut self) -> &mut DetectedDependencies {
        &mut self.detected
    }

    /// Whether this is a split-off debug symbols package.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|desc| desc.starts_with("Detached debugging symbols for "))
    }
}

/// Map the spellings used by `.PKGINFO`, PKGBUILDs and the package database to one name.
fn canonical_varname(varname: &str) -> &str {
    match varname {
        "pkgname" => "name",
        "pkgbase" => "base",
        "pkgver" => "version",
        "pkgdesc" | "desc" => "description",
        "depend" => "depends",
        "makedepend" => "makedepends",
        "optdepend" => "optdepends",
        "license" => "licenses",
        "group" => "groups",
        "conflict" => "conflicts",
        other => other,
    }
}

fn take_scalar(raw: &mut RawFields, key: &str) -> Option<String> {
    raw.remove(key).and_then(|values| values.into_iter().next())
}

fn take_list(raw: &mut RawFields, key: &str) -> Vec<String> {
    raw.remove(key).unwrap_or_default()
}

fn strip_all(values: &[String]) -> MetadataResult<Vec<String>> {
    values.iter().map(|value| strip_depend_info(value)).collect()
}
