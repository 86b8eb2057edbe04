// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Report struct and public API for checking the dependencies of a package.

mod classifier;
mod closure;
mod console;
mod diagnostics;
mod libcache;
mod search_paths;
mod sodepends;
mod totals;
mod validate;

pub use classifier::classify;
pub use closure::{closure_of, covered};
pub use console::summarize_report;
pub use diagnostics::{Diagnostic, Diagnostics, Severity, Tag};
pub use libcache::LibraryCache;
pub use search_paths::check_search_paths;
pub use sodepends::{
    canonical_soname, inspect_shared_libraries, SharedLibraryOptions, LIBRARIES_NEEDED,
};
pub use validate::validate_report;

use serde::Serialize;

use crate::archive::Archive;
use crate::index::PackageIndex;
use crate::package::{DetectedDependencies, Package};
use totals::ReportTotals;

/// Settings for building a report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub shared_libraries: SharedLibraryOptions,
}

#[derive(Debug, Serialize)]
pub struct Report {
    package: String,
    archive: String,
    totals: ReportTotals,
    diagnostics: Diagnostics,
    detected: DetectedDependencies,
}

impl Report {
    /// Run all checks on `package`, whose contents are `archive`.
    ///
    /// The passes run one after another on the same package: shared libraries first, as they
    /// record detected dependencies, then search paths, then the classification of all
    /// detected dependencies.
    #[must_use]
    pub fn new(
        mut package: Package,
        archive: &Archive,
        index: &dyn PackageIndex,
        cache: &LibraryCache,
        options: ReportOptions,
    ) -> Self {
        let mut diagnostics = inspect_shared_libraries(
            &mut package,
            archive,
            index,
            cache,
            options.shared_libraries,
        );
        tracing::debug!(
            package = package.name(),
            detected = package.detected().len(),
            "Inspected shared libraries"
        );
        diagnostics.extend(check_search_paths(archive));
        diagnostics.extend(classify(&package, index));

        let totals = ReportTotals::new(archive, &diagnostics, package.detected());
        Self {
            package: package.name().to_string(),
            archive: archive
                .path()
                .canonicalize()
                .unwrap_or_else(|_| archive.path().to_path_buf())
                .to_string_lossy()
                .to_string(),
            totals,
            diagnostics,
            detected: package.detected().clone(),
        }
    }

    /// Name of the checked package.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Dependencies detected while checking, with the reasons they were detected.
    #[must_use]
    pub fn detected(&self) -> &DetectedDependencies {
        &self.detected
    }
}
