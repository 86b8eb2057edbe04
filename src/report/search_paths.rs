// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Checks that RPATH and RUNPATH entries only point to trusted library directories.

use std::path::Path;

use super::diagnostics::{Diagnostics, Severity, Tag};
use crate::archive::Archive;

/// Entries that are accepted as-is or as a prefix of a deeper directory.
const ALLOWED: [&str; 5] = ["/usr/lib", "/usr/lib32", "/lib", "$ORIGIN", "${ORIGIN}"];

/// Entries that are questionable but not outright dangerous.
const TOLERATED: [&str; 1] = ["/usr/local/lib"];

/// How an RPATH or RUNPATH entry is judged.
fn severity(entry: &str) -> Option<Severity> {
    let allowed = ALLOWED.iter().any(|allowed| {
        entry == *allowed
            || entry
                .strip_prefix(allowed)
                .is_some_and(|rest| rest.starts_with('/'))
    });
    if allowed {
        None
    } else if TOLERATED.contains(&entry) {
        Some(Severity::Warning)
    } else {
        Some(Severity::Error)
    }
}

fn check_entries(diagnostics: &mut Diagnostics, tag: Tag, entries: &[String], file: &Path) {
    for entry in entries {
        if let Some(severity) = severity(entry) {
            diagnostics.push(
                severity,
                tag,
                vec![entry.clone(), file.to_string_lossy().to_string()],
            );
        }
    }
}

/// Report every RPATH and RUNPATH entry of the ELF objects in `archive` that is outside the
/// trusted directories.
pub fn check_search_paths(archive: &Archive) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();
    for (path, elf) in archive.elfs() {
        check_entries(&mut diagnostics, Tag::InsecureRpath, elf.rpath(), path);
        check_entries(&mut diagnostics, Tag::InsecureRunpath, elf.runpath(), path);
    }
    diagnostics
}
