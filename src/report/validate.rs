// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Validates reports and returns an error if any finding is an error.

use super::Report;
use anyhow::Result;

/// Validate the report.
///
/// # Errors
/// Returns an error if the report contains error findings.
pub fn validate_report(report: &Report) -> Result<()> {
    let errors = report.diagnostics.errors();
    if !errors.is_empty() {
        for diagnostic in errors {
            tracing::error!(package = %report.package, "{diagnostic}");
        }
        return Err(anyhow::anyhow!(
            "Errors found in the report: {} error(s) for package {}",
            errors.len(),
            report.package
        ));
    }
    Ok(())
}
