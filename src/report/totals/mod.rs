// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Statistics calculation modules for ELF files and findings.

mod diagnostics;
mod elf;

use serde::Serialize;

use crate::archive::{Archive, Elf};
use crate::package::DetectedDependencies;
use crate::report::diagnostics::Diagnostics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ReportTotals {
    pub(crate) files: usize,
    pub(crate) elfs: elf::Totals,
    pub(crate) diagnostics: diagnostics::Totals,
}

impl ReportTotals {
    #[must_use]
    pub(crate) fn new(
        archive: &Archive,
        diagnostics: &Diagnostics,
        detected: &DetectedDependencies,
    ) -> Self {
        let elfs: Vec<&Elf> = archive.elfs().map(|(_, elf)| elf).collect();
        Self {
            files: archive.entries().len(),
            elfs: elf::Totals::calculate(&elfs),
            diagnostics: diagnostics::Totals::calculate(diagnostics, detected),
        }
    }
}
