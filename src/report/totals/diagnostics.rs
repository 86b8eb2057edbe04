// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
use serde::Serialize;

use crate::package::DetectedDependencies;
use crate::report::diagnostics::Diagnostics;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Totals {
    pub(crate) errors: usize,
    pub(crate) warnings: usize,
    pub(crate) infos: usize,
    pub(crate) detected: usize,
    pub(crate) total: usize,
}

impl Totals {
    pub(crate) fn calculate(diagnostics: &Diagnostics, detected: &DetectedDependencies) -> Self {
        Self {
            errors: diagnostics.errors().len(),
            warnings: diagnostics.warnings().len(),
            infos: diagnostics.infos().len(),
            detected: detected.len(),
            total: diagnostics.len(),
        }
    }
}
