// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Finds the packages providing the shared libraries that the ELF objects of a package link
//! against, and checks the soname-level `depends` and `provides` of the package.

use path_clean::PathClean;
use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::diagnostics::{Diagnostics, Tag};
use super::libcache::LibraryCache;
use crate::archive::{Archive, Elf};
use crate::index::PackageIndex;
use crate::package::{DependencyReason, Package};

// Version numbers after a matched library path: `libgpm.so.1` + `.19.0`.
static SO_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\.\d+)*$").expect("valid regex"));

const SO: &str = ".so";

/// Reason recorded on the package for every library-owning package found.
pub const LIBRARIES_NEEDED: &str = "libraries-needed";

/// Reduce a soname to its unversioned form: `libfoo.so.1.2` becomes `libfoo.so`.
#[must_use]
pub fn canonical_soname(soname: &str) -> String {
    match soname.find(SO) {
        Some(idx) => format!("{}{SO}", &soname[..idx]),
        None => format!("{soname}{SO}"),
    }
}

/// The soname named by a `depends` or `provides` entry, if it names one.
///
/// Both the plain form (`libfoo.so`) and the versioned form (`libfoo.so=1-64`) are accepted.
fn declared_soname(entry: &str) -> Option<&str> {
    let soname = entry.split_once('=').map_or(entry, |(soname, _)| soname);
    soname.ends_with(SO).then_some(soname)
}

fn declares(entries: &[String], soname: &str) -> bool {
    entries
        .iter()
        .any(|entry| declared_soname(entry) == Some(soname))
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// How the shared library inspection treats library paths.
#[derive(Debug, Clone, Copy)]
pub struct SharedLibraryOptions {
    /// Resolve symlinks of library paths on the host before matching them against file lists.
    pub host_symlinks: bool,
}

impl Default for SharedLibraryOptions {
    fn default() -> Self {
        Self {
            host_symlinks: true,
        }
    }
}

/// Libraries referenced by the ELF objects of one archive.
#[derive(Debug, Default)]
struct LibraryReferences {
    /// Resolved library path (package-relative, or a bare soname if unresolved) to the files
    /// needing it.
    libraries: BTreeMap<String, BTreeSet<String>>,
    /// Canonical soname to the files needing it.
    depends: BTreeMap<String, BTreeSet<String>>,
    /// Canonical soname to the files providing it.
    provides: BTreeMap<String, BTreeSet<String>>,
}

impl LibraryReferences {
    fn scan(archive: &Archive, cache: &LibraryCache) -> Self {
        let mut references = Self::default();
        let so_files: Vec<PathBuf> = archive
            .entries()
            .keys()
            .filter(|path| path.to_string_lossy().contains(SO))
            .map(|path| Path::new("/").join(path))
            .collect();

        for (path, elf) in archive.elfs() {
            let file = path.to_string_lossy().to_string();
            let bundled = Self::bundled_libraries(path, elf, &so_files);

            if let Some(soname) = elf.soname().filter(|soname| !soname.ends_with(SO)) {
                references
                    .provides
                    .entry(canonical_soname(soname))
                    .or_default()
                    .insert(file.clone());
            }

            for needed in elf.needed() {
                references
                    .depends
                    .entry(canonical_soname(needed))
                    .or_default()
                    .insert(file.clone());

                let library = if let Some(bundled) = bundled.get(needed.as_str()) {
                    relative(bundled)
                } else if let Some(system) = cache.lookup(elf.class(), needed) {
                    relative(&system.clean())
                } else {
                    // Unknown library, reported as having no owner later on.
                    needed.clone()
                };
                references
                    .libraries
                    .entry(library)
                    .or_default()
                    .insert(file.clone());
            }
        }
        references
    }

    /// Libraries shipped in the archive below one of the search paths of `elf`, keyed by
    /// file name.
    fn bundled_libraries<'a>(
        path: &Path,
        elf: &Elf,
        so_files: &'a [PathBuf],
    ) -> HashMap<&'a str, &'a Path> {
        let origin = Path::new("/").join(path);
        let origin = origin.parent().unwrap_or_else(|| Path::new("/"));
        let search_paths = elf.search_paths(origin);
        if search_paths.is_empty() {
            return HashMap::new();
        }
        so_files
            .iter()
            .filter(|file| search_paths.iter().any(|dir| file.starts_with(dir)))
            .filter_map(|file| {
                let name = file.file_name()?.to_str()?;
                Some((name, file.as_path()))
            })
            .collect()
    }
}

fn relative(path: &Path) -> String {
    path.strip_prefix("/")
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

/// One installed file matched to a referenced library.
struct Attribution<'a> {
    package: &'a Package,
    library: &'a str,
    soname: String,
    has_provides: bool,
}

/// Match the referenced libraries against the file lists of all installed packages.
fn attribute<'a>(
    libraries: &'a BTreeMap<String, BTreeSet<String>>,
    index: &'a dyn PackageIndex,
    options: SharedLibraryOptions,
) -> Vec<Attribution<'a>> {
    let actual_paths: Vec<(&str, String)> = libraries
        .keys()
        .map(|library| {
            let actual = if options.host_symlinks {
                fs::canonicalize(Path::new("/").join(library))
                    .map_or_else(|_| library.clone(), |path| relative(&path))
            } else {
                library.clone()
            };
            (library.as_str(), actual)
        })
        .collect();

    let installed = index.all_installed();
    let found: Vec<Vec<Attribution<'a>>> = installed
        .par_iter()
        .map(|&package| {
            let mut found = Vec::new();
            for file in package.files() {
                let file = file.path();
                if !file.contains(SO) {
                    continue;
                }
                for &(library, ref actual) in &actual_paths {
                    let matches = file == actual
                        || file
                            .strip_prefix(actual.as_str())
                            .is_some_and(|suffix| SO_SUFFIX_RE.is_match(suffix));
                    if !matches {
                        continue;
                    }
                    let name = Path::new(library)
                        .file_name()
                        .map_or_else(|| library.into(), |name| name.to_string_lossy());
                    let soname = canonical_soname(&name);
                    found.push(Attribution {
                        package,
                        library,
                        has_provides: declares(package.provides(), &soname),
                        soname,
                    });
                }
            }
            found
        })
        .collect();
    found.into_iter().flatten().collect()
}

/// Inspect the shared libraries used and provided by the ELF objects in `archive`.
///
/// Every installed package owning a needed library is recorded as a detected dependency of
/// `package` with a `libraries-needed` reason.
pub fn inspect_shared_libraries(
    package: &mut Package,
    archive: &Archive,
    index: &dyn PackageIndex,
    cache: &LibraryCache,
    options: SharedLibraryOptions,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();
    let references = LibraryReferences::scan(archive, cache);
    let attributions = attribute(&references.libraries, index, options);

    // Owning package name to the libraries it provides.
    let mut owners: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    // Canonical soname to the first package owning it, split by whether it declares it.
    let mut matching_provides: BTreeMap<&str, &str> = BTreeMap::new();
    let mut missing_provides: BTreeMap<&str, &str> = BTreeMap::new();
    let mut found: BTreeSet<&str> = BTreeSet::new();
    for attribution in &attributions {
        owners
            .entry(attribution.package.name())
            .or_default()
            .insert(attribution.library.to_string());
        found.insert(attribution.library);
        let sonames = if attribution.has_provides {
            &mut matching_provides
        } else {
            &mut missing_provides
        };
        sonames
            .entry(attribution.soname.as_str())
            .or_insert_with(|| attribution.package.name());
    }

    for library in references.libraries.keys() {
        if !found.contains(library.as_str()) {
            diagnostics.warning(Tag::LibraryNoPackageAssociated, vec![library.clone()]);
        }
    }
    for (soname, owner) in &matching_provides {
        diagnostics.info(
            Tag::LibdependsMatchingProvides,
            vec![(*soname).to_string(), (*owner).to_string()],
        );
    }
    for (soname, owner) in &missing_provides {
        diagnostics.info(
            Tag::LibdependsMissingProvides,
            vec![(*soname).to_string(), (*owner).to_string()],
        );
    }

    for (owner, libraries) in &owners {
        let needing: BTreeSet<&String> = libraries
            .iter()
            .filter_map(|library| references.libraries.get(library))
            .flatten()
            .collect();
        package.detected_mut().add(
            *owner,
            DependencyReason::new(
                LIBRARIES_NEEDED,
                vec![join(libraries), join(needing)],
            ),
        );
        diagnostics.info(
            Tag::LinkLevelDependence,
            vec![(*owner).to_string(), join(libraries)],
        );
    }

    check_declared_depends(package, &references, &matching_provides, &mut diagnostics);
    check_declared_provides(package, &references, &mut diagnostics);
    diagnostics
}

/// Soname-level checks of `depends` against the libraries owned by other packages.
fn check_declared_depends(
    package: &Package,
    references: &LibraryReferences,
    matching_provides: &BTreeMap<&str, &str>,
    diagnostics: &mut Diagnostics,
) {
    let libdepends: BTreeMap<&str, &str> = matching_provides
        .iter()
        .filter(|(_, owner)| **owner != package.name())
        .map(|(soname, owner)| (*soname, *owner))
        .collect();

    for (soname, owner) in &libdepends {
        let files = references.depends.get(*soname).map(join).unwrap_or_default();
        let args = vec![(*soname).to_string(), (*owner).to_string(), files];
        if declares(package.depends(), soname) {
            diagnostics.info(Tag::LibdependsDetectedSatisfied, args);
        } else if declares(package.optdepends(), soname) {
            diagnostics.warning(Tag::LibdependsDetectedButOptional, args);
        } else {
            diagnostics.warning(Tag::LibdependsDetectedNotIncluded, args);
        }
    }

    for depend in package.depends() {
        if declared_soname(depend).is_some_and(|soname| !libdepends.contains_key(soname)) {
            diagnostics.warning(Tag::LibdependsNotNeeded, vec![depend.clone()]);
        }
    }
    diagnostics.info(
        Tag::LibdependsBySight,
        vec![libdepends.keys().copied().collect::<Vec<_>>().join(" ")],
    );
}

/// Soname-level checks of `provides` against the libraries shipped in the archive.
fn check_declared_provides(
    package: &Package,
    references: &LibraryReferences,
    diagnostics: &mut Diagnostics,
) {
    for (soname, files) in &references.provides {
        let args = vec![soname.clone(), join(files)];
        if declares(package.provides(), soname) {
            diagnostics.info(Tag::LibprovidesSatisfied, args);
        } else {
            diagnostics.warning(Tag::LibprovidesUnsatisfied, args);
        }
    }

    for provide in package.provides() {
        if declared_soname(provide).is_some_and(|soname| !references.provides.contains_key(soname))
        {
            diagnostics.error(Tag::LibprovidesMissing, vec![provide.clone()]);
        }
    }
    diagnostics.info(
        Tag::LibprovidesBySight,
        vec![references
            .provides
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")],
    );
}
