// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Parses ELF files to extract `DT_NEEDED`, `DT_SONAME`, `RPATH`, and `RUNPATH` entries. Uses
//! the `goblin` crate for ELF parsing; nothing outside this module depends on it.

use goblin::elf::Elf as GoblinElf;
use path_clean::PathClean;
use serde::Serialize;
use std::fs;
use std::io;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

type Result<T> = std::result::Result<T, ElfError>;

// ELF magic bytes: 0x7f followed by ASCII "ELF" (e_ident[EI_MAG0..EI_MAG3]).
const ELF_MAGIC: [u8; 4] = [0x7f, 0x45, 0x4c, 0x46];

// Size of the smallest (32-bit) ELF header.
const MIN_ELF_SIZE: u64 = 52;

/// Errors that can occur when parsing ELF files.
#[derive(Debug, thiserror::Error)]
pub enum ElfError {
    #[error("File is too small to be an ELF file: {path:?}")]
    FileTooSmall { path: PathBuf },
    #[error("File is not an ELF file: {path:?}")]
    NotElfFile { path: PathBuf },
    #[error("Failed to open file: {path:?}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read file: {path:?}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse ELF file: {path:?}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: goblin::error::Error,
    },
    #[error("Unknown ELF type in file: {path:?}")]
    UnknownElfType { path: PathBuf },
}

/// ELF file type (wrapper around `goblin::elf::header::e_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElfType {
    None,
    Relocatable,
    Executable,
    SharedObject,
    Core,
}

/// Word size of an ELF object, which selects the library cache bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ElfClass {
    #[serde(rename = "i686")]
    Elf32,
    #[serde(rename = "x86-64")]
    Elf64,
}

/// Parsed ELF file information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Elf {
    class: ElfClass,
    kind: ElfType,
    needed: Vec<String>,
    soname: Option<String>,
    rpath: Vec<String>,
    runpath: Vec<String>,
}

impl Elf {
    /// Describe an already-inspected ELF object.
    #[must_use]
    pub fn new(
        class: ElfClass,
        kind: ElfType,
        needed: Vec<String>,
        soname: Option<String>,
        rpath: Vec<String>,
        runpath: Vec<String>,
    ) -> Self {
        Self {
            class,
            kind,
            needed,
            soname,
            rpath,
            runpath,
        }
    }

    /// Parse an ELF file from a path.
    ///
    /// # Errors
    /// Returns an error if the file is not an ELF file or cannot be read or parsed.
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let bytes = Self::read(path)?;
        Self::parse(path, &bytes)
    }

    #[must_use]
    pub fn class(&self) -> ElfClass {
        self.class
    }

    /// Get the ELF file type (executable, shared object, etc.).
    #[must_use]
    pub fn kind(&self) -> ElfType {
        self.kind
    }

    /// Get the list of required libraries (`DT_NEEDED` entries).
    #[must_use]
    pub fn needed(&self) -> &[String] {
        &self.needed
    }

    /// Get the library identity this object provides (`DT_SONAME` entry).
    #[must_use]
    pub fn soname(&self) -> Option<&str> {
        self.soname.as_deref()
    }

    /// Get the RPATH entries from the ELF file.
    #[must_use]
    pub fn rpath(&self) -> &[String] {
        &self.rpath
    }

    /// Get the RUNPATH entries from the ELF file.
    #[must_use]
    pub fn runpath(&self) -> &[String] {
        &self.runpath
    }

    /// Normalize and resolve RPATH and RUNPATH entries into absolute directories.
    ///
    /// 1. **`$ORIGIN` substitution**: `$ORIGIN` and `${ORIGIN}` are replaced with `origin`,
    ///    the directory containing the object.
    /// 2. **Absolute paths** are kept and cleaned (`..` and `.` components are folded).
    /// 3. **Relative paths without `$ORIGIN`** are dropped. The dynamic linker resolves them
    ///    against the working directory of the process, which is unknown at analysis time.
    ///
    /// If both are present RUNPATH wins and RPATH is ignored, as the dynamic linker does.
    #[must_use]
    pub fn search_paths(&self, origin: &Path) -> Vec<PathBuf> {
        let paths = if self.runpath.is_empty() {
            &self.rpath
        } else {
            &self.runpath
        };
        // Order matters here, the linker searches these in order of definition.
        paths
            .iter()
            .filter_map(|path| Self::normalize_path(origin, path))
            .collect()
    }

    fn normalize_path(origin: &Path, path: &str) -> Option<PathBuf> {
        // The patterns $ORIGIN and ${ORIGIN} are mutually exclusive (different chars after $).
        let resolved = if path.contains("${ORIGIN}") {
            path.replace("${ORIGIN}", &origin.to_string_lossy())
        } else if path.contains("$ORIGIN") {
            path.replace("$ORIGIN", &origin.to_string_lossy())
        } else {
            path.to_string()
        };

        if resolved.starts_with('/') {
            return Some(PathBuf::from(resolved).clean());
        }
        // Still relative after substitution: either no $ORIGIN at all, or something in front of it.
        None
    }

    /// Reads the entire file at path into bytes if the file is an ELF file.
    ///
    /// # Errors
    /// Returns an error if the file is not an ELF file or cannot be read.
    fn read(path: &Path) -> Result<Vec<u8>> {
        let metadata = fs::metadata(path).map_err(|e| ElfError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        if metadata.len() < MIN_ELF_SIZE {
            return Err(ElfError::FileTooSmall {
                path: path.to_path_buf(),
            });
        }

        let mut file = fs::File::open(path).map_err(|e| ElfError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)
            .map_err(|e| ElfError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        if magic != ELF_MAGIC {
            return Err(ElfError::NotElfFile {
                path: path.to_path_buf(),
            });
        }

        // goblin requires the full file, but non-ELF files have been filtered out by now.
        file.seek(io::SeekFrom::Start(0))
            .map_err(|e| ElfError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| ElfError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(bytes)
    }

    fn parse(path: &Path, bytes: &[u8]) -> Result<Self> {
        let elf = GoblinElf::parse(bytes).map_err(|e| ElfError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut needed = Vec::new();
        let mut soname = None;
        let mut rpath = Vec::new();
        let mut runpath = Vec::new();

        let string_at = |value: u64| {
            usize::try_from(value)
                .ok()
                .and_then(|idx| elf.dynstrtab.get_at(idx))
        };

        if let Some(dynamic) = &elf.dynamic {
            for dyn_entry in &dynamic.dyns {
                match dyn_entry.d_tag {
                    goblin::elf::dynamic::DT_NEEDED => {
                        if let Some(name) = string_at(dyn_entry.d_val) {
                            needed.push(name.to_string());
                        }
                    }
                    goblin::elf::dynamic::DT_SONAME => {
                        soname = string_at(dyn_entry.d_val).map(ToString::to_string);
                    }
                    goblin::elf::dynamic::DT_RPATH => {
                        if let Some(paths) = string_at(dyn_entry.d_val) {
                            rpath.extend(split_search_path(paths));
                        }
                    }
                    goblin::elf::dynamic::DT_RUNPATH => {
                        if let Some(paths) = string_at(dyn_entry.d_val) {
                            runpath.extend(split_search_path(paths));
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(Self {
            class: if elf.is_64 {
                ElfClass::Elf64
            } else {
                ElfClass::Elf32
            },
            kind: match elf.header.e_type {
                goblin::elf::header::ET_NONE => ElfType::None,
                goblin::elf::header::ET_REL => ElfType::Relocatable,
                goblin::elf::header::ET_EXEC => ElfType::Executable,
                goblin::elf::header::ET_DYN => ElfType::SharedObject,
                goblin::elf::header::ET_CORE => ElfType::Core,
                _ => {
                    return Err(ElfError::UnknownElfType {
                        path: path.to_path_buf(),
                    });
                }
            },
            needed,
            soname,
            rpath,
            runpath,
        })
    }
}

/// Split a colon-separated RPATH/RUNPATH value. Empty components are kept: the dynamic
/// linker reads them as the working directory.
fn split_search_path(paths: &str) -> Vec<String> {
    paths.split(':').map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn elf_with_paths(rpath: &[&str], runpath: &[&str]) -> Elf {
        Elf::new(
            ElfClass::Elf64,
            ElfType::Executable,
            Vec::new(),
            None,
            rpath.iter().map(ToString::to_string).collect(),
            runpath.iter().map(ToString::to_string).collect(),
        )
    }

    #[test]
    fn test_normalize_path_absolute() {
        let origin = Path::new("/usr/bin");
        assert_eq!(
            Elf::normalize_path(origin, "/usr/lib"),
            Some(PathBuf::from("/usr/lib"))
        );
    }

    #[test]
    fn test_normalize_path_relative() {
        let origin = Path::new("/usr/bin");
        assert_eq!(Elf::normalize_path(origin, "../lib"), None);
        assert_eq!(Elf::normalize_path(origin, "lib"), None);
    }

    #[test]
    fn test_normalize_path_origin_not_at_start() {
        let origin = Path::new("/usr/bin");
        assert_eq!(Elf::normalize_path(origin, "../$ORIGIN/lib"), None);
        assert_eq!(Elf::normalize_path(origin, "./$ORIGIN/lib"), None);
        assert_eq!(Elf::normalize_path(origin, "../${ORIGIN}/lib"), None);
        assert_eq!(Elf::normalize_path(origin, "prefix/$ORIGIN/lib"), None);
    }

    #[test]
    fn test_normalize_path_origin() {
        let origin = Path::new("/usr/bin");
        assert_eq!(
            Elf::normalize_path(origin, "$ORIGIN/../lib"),
            Some(PathBuf::from("/usr/lib"))
        );
        assert_eq!(
            Elf::normalize_path(origin, "${ORIGIN}/../lib/foo"),
            Some(PathBuf::from("/usr/lib/foo"))
        );
    }

    #[test]
    fn test_search_paths_runpath_wins() {
        let origin = Path::new("/usr/bin");
        let elf = elf_with_paths(&["/usr/lib"], &["/opt/lib", "$ORIGIN/../lib/foo"]);
        assert_eq!(
            elf.search_paths(origin),
            vec![PathBuf::from("/opt/lib"), PathBuf::from("/usr/lib/foo")]
        );

        let elf = elf_with_paths(&["/usr/lib", "../lib"], &[]);
        assert_eq!(elf.search_paths(origin), vec![PathBuf::from("/usr/lib")]);

        let elf = elf_with_paths(&[], &[]);
        assert!(elf.search_paths(origin).is_empty());
    }

    #[test]
    fn test_split_search_path_keeps_empty_components() {
        assert_eq!(split_search_path("/usr/lib"), vec!["/usr/lib"]);
        assert_eq!(split_search_path("/usr/lib:"), vec!["/usr/lib", ""]);
        assert_eq!(split_search_path(":/usr/lib"), vec!["", "/usr/lib"]);
        assert_eq!(split_search_path("/a::/b"), vec!["/a", "", "/b"]);
    }

    #[test]
    fn test_search_paths_skip_empty_components() {
        let elf = elf_with_paths(&["/usr/lib", ""], &[]);
        assert_eq!(
            elf.search_paths(Path::new("/usr/bin")),
            vec![PathBuf::from("/usr/lib")]
        );
    }

    /// Helper to skip tests when fixture files are missing.
    fn require_fixture(name: &str) -> Option<PathBuf> {
        let path = get_fixtures_dir().join(name);
        if path.exists() {
            Some(path)
        } else {
            eprintln!(
                "Skipping test: fixture '{name}' not found. It is generated by build.rs when gcc and patchelf are available."
            );
            None
        }
    }

    #[test]
    fn test_elf_absolute_rpath() {
        let Some(elf_path) = require_fixture("test-elf-absolute-rpath.elf") else {
            return;
        };
        let elf = Elf::from_path(&elf_path).expect("Should parse ELF with absolute RPATH");
        assert!(
            elf.rpath().iter().any(|p| p == "/usr/lib"),
            "RPATH should contain '/usr/lib', got: {:?}",
            elf.rpath()
        );
        assert_eq!(elf.kind(), ElfType::Executable);
    }

    #[test]
    fn test_elf_origin_rpath() {
        let Some(elf_path) = require_fixture("test-elf-origin-rpath.elf") else {
            return;
        };
        let elf = Elf::from_path(&elf_path).expect("Should parse ELF with $ORIGIN RPATH");
        assert!(
            elf.rpath().iter().any(|p| p == "$ORIGIN/../lib"),
            "RPATH should contain '$ORIGIN/../lib', got: {:?}",
            elf.rpath()
        );
    }

    #[test]
    fn test_elf_runpath() {
        let Some(elf_path) = require_fixture("test-elf-runpath.elf") else {
            return;
        };
        let elf = Elf::from_path(&elf_path).expect("Should parse ELF with RUNPATH");
        assert!(
            elf.runpath().iter().any(|p| p == "/opt/lib"),
            "RUNPATH should contain '/opt/lib', got: {:?}",
            elf.runpath()
        );
    }

    #[test]
    fn test_elf_insecure_rpath_is_still_parsed() {
        let Some(elf_path) = require_fixture("test-elf-insecure-rpath.elf") else {
            return;
        };
        let elf = Elf::from_path(&elf_path).expect("Should parse ELF with an insecure RPATH");
        assert!(elf.rpath().iter().any(|p| p == "/home/evil/lib"));
    }

    #[test]
    fn test_elf_trailing_empty_rpath_component() {
        let Some(elf_path) = require_fixture("test-elf-empty-rpath-component.elf") else {
            return;
        };
        let elf = Elf::from_path(&elf_path).expect("Should parse ELF with RPATH '/usr/lib:'");
        assert_eq!(elf.rpath(), ["/usr/lib", ""]);
    }

    #[test]
    fn test_elf_shared_library_soname() {
        let Some(elf_path) = require_fixture("libhello.so.1") else {
            return;
        };
        let elf = Elf::from_path(&elf_path).expect("Should parse shared library");
        assert_eq!(elf.kind(), ElfType::SharedObject);
        assert_eq!(elf.soname(), Some("libhello.so.1"));
    }

    #[test]
    fn test_elf_needed() {
        let Some(elf_path) = require_fixture("hello") else {
            return;
        };
        let elf = Elf::from_path(&elf_path).expect("Should parse binary");
        assert!(elf.needed().iter().any(|n| n == "libhello.so.1"));
        assert!(elf.needed().iter().any(|n| n.starts_with("libc.so")));
    }

    #[test]
    fn test_elf_file_too_small() {
        let elf_path = get_fixtures_dir().join("test-elf-file-too-small");
        match Elf::from_path(&elf_path) {
            Err(ElfError::FileTooSmall { .. } | ElfError::NotElfFile { .. }) => {}
            Ok(_) => panic!("Expected FileTooSmall or NotElfFile error"),
            Err(e) => panic!("Unexpected error: {e:?}"),
        }
    }

    #[test]
    fn test_elf_not_elf_file() {
        let elf_path = get_fixtures_dir().join("test-elf-not-elf-file");
        match Elf::from_path(&elf_path) {
            Err(ElfError::NotElfFile { .. } | ElfError::FileTooSmall { .. }) => {}
            Ok(_) => panic!("Expected NotElfFile or FileTooSmall error"),
            Err(e) => panic!("Unexpected error: {e:?}"),
        }
    }

    #[test]
    fn test_parse_garbage_after_magic() {
        let mut bytes = ELF_MAGIC.to_vec();
        bytes.extend([0u8; 60]);
        assert!(matches!(
            Elf::parse(Path::new("garbage"), &bytes),
            Err(ElfError::ParseFailed { .. })
        ));
    }
}
