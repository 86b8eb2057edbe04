// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Implements pacman package (`*.pkg.tar*`) extraction using `bsdtar`.

use std::path::Path;
use tempfile::TempDir;

use super::extractor::{
    wait_with_timeout, Extracted, PackageExtractor, DEFAULT_EXTRACTION_TIMEOUT,
};
use super::{ArchiveError, ArchiveResult};

pub(crate) struct PacmanExtractor;

impl PackageExtractor for PacmanExtractor {
    const COMMAND: &'static str = "bsdtar";

    fn handles(package: &Path) -> bool {
        package
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains(".pkg.tar"))
    }

    /// Extract a pacman package into a temporary directory.
    ///
    /// # Errors
    /// Returns an error if the package cannot be extracted.
    ///
    /// # Timeout
    /// This function enforces a timeout of 30 seconds for the `bsdtar` subprocess.
    /// If extraction takes longer, the process will be killed and a `CommandTimeout`
    /// error will be returned.
    fn extract(package: &Path, dest: &TempDir) -> ArchiveResult<Extracted> {
        let mut child = match std::process::Command::new(Self::COMMAND)
            .arg("-xf")
            .arg(package)
            .arg("-C")
            .arg(dest.path())
            .stdout(std::process::Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    return Err(ArchiveError::CommandNotFound {
                        command: Self::COMMAND.to_string(),
                        path: package.to_path_buf(),
                    });
                }
                return Err(ArchiveError::CommandFailed {
                    command: Self::COMMAND.to_string(),
                    path: package.to_path_buf(),
                    source: e,
                });
            }
        };

        let exit_status =
            wait_with_timeout(&mut child, DEFAULT_EXTRACTION_TIMEOUT, Self::COMMAND, package)?;

        if exit_status.success() {
            Self::process(dest, package)
        } else {
            Err(ArchiveError::ExtractionFailed {
                path: package.to_path_buf(),
                reason: format!(
                    "bsdtar exited with non-zero status: {}",
                    exit_status.code().unwrap_or(-1)
                ),
            })
        }
    }
}
