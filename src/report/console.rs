// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Formats and prints report summaries to the console.

use comfy_table::{Cell, Table};

use super::{Diagnostic, Report, Severity};

/// Summarize the report to the console.
///
/// Prints one line per finding (infos only if `show_infos` is set), followed by ELF
/// statistics, finding statistics, and the detected dependencies.
pub fn summarize_report(report: &Report, show_infos: bool) {
    for line in diagnostic_lines(report, show_infos) {
        println!("{line}");
    }
    println!();

    println!("Package: {}", report.package);
    println!("Archive: {}", report.archive);
    println!("Total files: {}\n", report.totals.files);

    println!("{}\n", elf_table(report));
    println!("{}\n", diagnostics_table(report));
    if !report.detected.is_empty() {
        println!("{}", detected_table(report));
    }
}

/// Format a finding as `<package> <E|W|I>: <tag> <args...>`.
fn diagnostic_line(package: &str, severity: Severity, diagnostic: &Diagnostic) -> String {
    format!("{package} {}: {diagnostic}", severity.marker())
}

fn diagnostic_lines(report: &Report, show_infos: bool) -> Vec<String> {
    report
        .diagnostics
        .iter()
        .filter(|(severity, _)| show_infos || *severity != Severity::Info)
        .map(|(severity, diagnostic)| diagnostic_line(&report.package, severity, diagnostic))
        .collect()
}

/// Create a table with the default preset styling.
fn default_table_preset() -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL_CONDENSED)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
    table
}

/// Create a table showing ELF file type statistics.
fn elf_table(report: &Report) -> Table {
    let elfs = &report.totals.elfs;
    let mut table = default_table_preset();
    table
        .set_header(vec![
            Cell::new("ELF Type").add_attribute(comfy_table::Attribute::Bold),
            Cell::new("Count").add_attribute(comfy_table::Attribute::Bold),
        ])
        .add_row(vec![Cell::new("Binaries"), Cell::new(elfs.binaries)])
        .add_row(vec![
            Cell::new("Shared libraries"),
            Cell::new(elfs.shared_libraries),
        ])
        .add_row(vec![Cell::new("Relocatable"), Cell::new(elfs.relocatable)])
        .add_row(vec![Cell::new("Core"), Cell::new(elfs.core)])
        .add_row(vec![Cell::new("None"), Cell::new(elfs.none)])
        .add_row(vec![Cell::new("32-bit"), Cell::new(elfs.elf32)])
        .add_row(vec![Cell::new("64-bit"), Cell::new(elfs.elf64)])
        .add_row(vec![
            Cell::new("With RPATH/RUNPATH"),
            Cell::new(elfs.with_search_paths),
        ])
        .add_row(vec![
            Cell::new("Total").add_attribute(comfy_table::Attribute::Bold),
            Cell::new(elfs.total).add_attribute(comfy_table::Attribute::Bold),
        ]);
    table
}

/// Create a table showing how many findings of each severity were made.
fn diagnostics_table(report: &Report) -> Table {
    let totals = &report.totals.diagnostics;
    let mut table = default_table_preset();
    table
        .set_header(vec![
            Cell::new("Findings").add_attribute(comfy_table::Attribute::Bold),
            Cell::new("Count").add_attribute(comfy_table::Attribute::Bold),
        ])
        .add_row(vec![Cell::new("Errors"), Cell::new(totals.errors)])
        .add_row(vec![Cell::new("Warnings"), Cell::new(totals.warnings)])
        .add_row(vec![Cell::new("Infos"), Cell::new(totals.infos)])
        .add_row(vec![
            Cell::new("Total").add_attribute(comfy_table::Attribute::Bold),
            Cell::new(totals.total).add_attribute(comfy_table::Attribute::Bold),
        ]);
    table
}

/// Create a table listing the detected dependencies and why they were detected.
fn detected_table(report: &Report) -> Table {
    let mut table = default_table_preset();
    table.set_header(vec![
        Cell::new("Detected Dependency").add_attribute(comfy_table::Attribute::Bold),
        Cell::new("Reasons").add_attribute(comfy_table::Attribute::Bold),
    ]);
    for (name, reasons) in &report.detected {
        let reasons: Vec<String> = reasons.iter().map(ToString::to_string).collect();
        table.add_row(vec![Cell::new(name), Cell::new(reasons.join("\n"))]);
    }
    table
}
