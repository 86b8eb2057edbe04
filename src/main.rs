// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
mod args;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::Path;

use args::Args;
use depends_validator::archive::Archive;
use depends_validator::index::DatabaseIndex;
use depends_validator::report::{
    summarize_report, validate_report, LibraryCache, Report, ReportOptions,
    SharedLibraryOptions,
};

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let archive = extract_package(&args.package)?;
    let package = archive
        .package()
        .with_context(|| format!("Failed to read package metadata: {}", args.package.display()))?;
    let index = DatabaseIndex::open(&args.dbpath)
        .with_context(|| format!("Failed to open package database: {}", args.dbpath.display()))?;
    let cache = LibraryCache::from_ldconfig();
    let options = ReportOptions {
        shared_libraries: SharedLibraryOptions {
            host_symlinks: !args.no_host_symlinks,
        },
    };

    let report = Report::new(package, &archive, &index, &cache, options);
    if let Some(dest) = &args.report {
        write_report_to_file(&report, dest)?;
    }
    summarize_report(&report, args.info);
    validate_report(&report)
}

/// Log to stderr, `info` and up unless `RUST_LOG` says otherwise. stdout carries the findings.
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Get the package from a filepath.
///
/// # Errors
/// Returns an error if the package type is unsupported or extraction fails.
fn extract_package(path: &Path) -> Result<Archive> {
    tracing::info!(package = %path.display(), "Extracting package");

    let archive = Archive::open(path)
        .with_context(|| format!("Failed to extract package: {}", path.display()))?;

    tracing::info!(
        package = %path.display(),
        files = archive.entries().len(),
        elfs = archive.elfs().count(),
        "Extraction completed"
    );
    Ok(archive)
}

/// Write the report to a file.
///
/// # Errors
/// Returns an error if the report cannot be serialized to JSON or if the file cannot be created.
fn write_report_to_file(report: &Report, dest: &Path) -> Result<()> {
    tracing::info!(file = %dest.display(), "Writing report to file");
    let file = File::create(dest)
        .with_context(|| format!("Failed to create JSON output file: {}", dest.display()))?;
    serde_json::to_writer_pretty(file, report)
        .with_context(|| format!("Failed to serialize report to JSON: {}", dest.display()))?;
    Ok(())
}
