// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "depends_validator")]
#[command(version)]
#[command(about = "Checks the declared dependencies of a pacman package against the ones it needs")]
pub(crate) struct Args {
    /// Path to the package file (*.pkg.tar.*) to check.
    pub package: PathBuf,

    /// Path to the file to write the results in JSON format.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Path to the database of installed packages.
    #[arg(long, env = "DEPENDS_VALIDATOR_DBPATH", default_value = "/var/lib/pacman/local")]
    pub dbpath: PathBuf,

    /// Also print informational findings.
    #[arg(long)]
    pub info: bool,

    #[arg(
        long,
        long_help = "Match library paths literally against package file lists.\n\
                By default library paths are resolved through symlinks on this host first."
    )]
    pub no_host_symlinks: bool,
}
