// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Resolves sonames to absolute paths using the dynamic linker cache (`ldconfig -p`).

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use crate::archive::ElfClass;

// `\tlibz.so.1 (libc6,x86-64) => /usr/lib/libz.so.1`
static LIBLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(.*) \((.*)\) => (.*)$").expect("valid regex"));

// Cache entries for 64-bit objects carry this ABI marker, everything else is 32-bit.
const X86_64_ABI: &str = "libc6,x86-64";

/// Soname to path mapping, one bucket per ELF class.
#[derive(Debug, Clone, Default)]
pub struct LibraryCache {
    libraries: HashMap<ElfClass, HashMap<String, PathBuf>>,
}

impl LibraryCache {
    /// Create an empty cache that resolves nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the cache from the output of `ldconfig -p` on this host.
    ///
    /// Failing to run `ldconfig` is not an error; the cache is empty in that case.
    #[must_use]
    pub fn from_ldconfig() -> Self {
        Self::from_command("ldconfig", &["-p"])
    }

    /// Build the cache from a command printing `ldconfig -p` style output.
    pub(crate) fn from_command(program: &str, args: &[&str]) -> Self {
        let output = Command::new(program)
            .args(args)
            .env("LANG", "C")
            .env("LC_ALL", "C")
            .output();
        match output {
            Ok(output) if output.status.success() => {
                let cache = Self::parse(&String::from_utf8_lossy(&output.stdout));
                tracing::debug!(libraries = cache.len(), "Loaded dynamic linker cache");
                cache
            }
            Ok(output) => {
                tracing::warn!(
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    command = program,
                    "Library cache command failed, library cache is empty"
                );
                Self::empty()
            }
            Err(error) => {
                tracing::warn!(
                    command = program,
                    error = %error,
                    "Could not run library cache command, library cache is empty"
                );
                Self::empty()
            }
        }
    }

    /// Parse `ldconfig -p` output. Lines that do not describe a library are ignored.
    ///
    /// The first entry for a soname wins, as it does for the dynamic linker.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut cache = Self::default();
        for line in text.lines() {
            let Some(captures) = LIBLINE_RE.captures(line) else {
                continue;
            };
            let class = if captures[2].starts_with(X86_64_ABI) {
                ElfClass::Elf64
            } else {
                ElfClass::Elf32
            };
            cache
                .libraries
                .entry(class)
                .or_default()
                .entry(captures[1].to_string())
                .or_insert_with(|| PathBuf::from(&captures[3]));
        }
        cache
    }

    /// Absolute path of the library with `soname` for objects of the given class.
    #[must_use]
    pub fn lookup(&self, class: ElfClass, soname: &str) -> Option<&Path> {
        self.libraries
            .get(&class)
            .and_then(|libraries| libraries.get(soname))
            .map(PathBuf::as_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.libraries.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LDCONFIG_OUTPUT: &str = "\
1234 libs found in cache `/etc/ld.so.cache'
\tlibz.so.1 (libc6,x86-64) => /usr/lib/libz.so.1
\tlibz.so.1 (libc6) => /usr/lib32/libz.so.1
\tlibssl.so.3 (libc6,x86-64) => /usr/lib/libssl.so.3
\tlibssl.so.3 (libc6,x86-64) => /usr/local/lib/libssl.so.3
\tlibcuda.so.1 (libc6,x86-64, hwcap: 0x0000000000000001) => /usr/lib/libcuda.so.1
Cache generated by: ldconfig (GNU libc) stable release version 2.39
";

    #[test]
    fn test_parse_buckets_by_class() {
        let cache = LibraryCache::parse(LDCONFIG_OUTPUT);
        assert_eq!(
            cache.lookup(ElfClass::Elf64, "libz.so.1"),
            Some(Path::new("/usr/lib/libz.so.1"))
        );
        assert_eq!(
            cache.lookup(ElfClass::Elf32, "libz.so.1"),
            Some(Path::new("/usr/lib32/libz.so.1"))
        );
        assert_eq!(cache.lookup(ElfClass::Elf32, "libssl.so.3"), None);
        assert_eq!(
            cache.lookup(ElfClass::Elf64, "libcuda.so.1"),
            Some(Path::new("/usr/lib/libcuda.so.1"))
        );
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_first_entry_wins() {
        let cache = LibraryCache::parse(LDCONFIG_OUTPUT);
        assert_eq!(
            cache.lookup(ElfClass::Elf64, "libssl.so.3"),
            Some(Path::new("/usr/lib/libssl.so.3"))
        );
    }

    #[test]
    fn test_missing_command_is_empty() {
        let cache = LibraryCache::from_command("/nonexistent/sbin/ldconfig", &["-p"]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failing_command_is_empty() {
        // Prints a valid cache line but exits non-zero.
        let cache = LibraryCache::from_command(
            "sh",
            &[
                "-c",
                "printf '\\tlibz.so.1 (libc6,x86-64) => /usr/lib/libz.so.1\\n'; exit 1",
            ],
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn test_successful_command_is_parsed() {
        let cache = LibraryCache::from_command(
            "sh",
            &[
                "-c",
                "printf '\\tlibz.so.1 (libc6,x86-64) => /usr/lib/libz.so.1\\n'",
            ],
        );
        assert_eq!(
            cache.lookup(ElfClass::Elf64, "libz.so.1"),
            Some(Path::new("/usr/lib/libz.so.1"))
        );
    }

    #[test]
    fn test_unparseable_output_is_empty() {
        assert!(LibraryCache::parse("ldconfig: command not found\n").is_empty());
        assert!(LibraryCache::empty().lookup(ElfClass::Elf64, "libc.so.6").is_none());
    }
}
