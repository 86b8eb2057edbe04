// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! A tool for checking that the dependencies of a pacman package match what it needs.
//!
//! This crate provides functionality to:
//! - Read package metadata from `.PKGINFO` files and pacman databases
//! - Extract packages and parse their ELF binaries for needed and provided libraries
//! - Attribute needed libraries to the installed packages owning them
//! - Compare detected dependencies with declared `depends`/`optdepends`, following
//!   transitive dependencies through a package index
//! - Check RPATH/RUNPATH entries against trusted library directories

pub mod archive;
pub mod index;
pub mod package;
pub mod report;

// Re-export key types for convenience
pub use archive::{Archive, ArchiveEntry, ArchiveFile, Elf, ElfClass, ElfType};
pub use index::{DatabaseIndex, MemoryIndex, PackageIndex};
pub use package::{strip_depend_info, DependencyReason, DetectedDependencies, Package};
pub use report::{LibraryCache, Report, ReportOptions};
