// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Build script to generate test fixtures for the `depends_validator` crate.
//!
//! This script attempts to generate all required test fixtures including:
//! - Simple non-ELF test files (always generated)
//! - ELF files with various RPATH/RUNPATH settings (requires gcc + patchelf)
//! - A shared library with a SONAME and a binary linked against it (requires gcc)
//! - A pacman package holding both (requires gcc + bsdtar)
//!
//! If required tools are not available, the script will skip those fixtures
//! and emit warnings. Tests will gracefully skip when fixtures are missing.

use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Check if a command is available in PATH.
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Available tools for fixture generation.
struct AvailableTools {
    gcc: bool,
    patchelf: bool,
    bsdtar: bool,
}

impl AvailableTools {
    fn detect() -> Self {
        Self {
            gcc: command_exists("gcc"),
            patchelf: command_exists("patchelf"),
            bsdtar: command_exists("bsdtar"),
        }
    }

    fn can_patch_elf(&self) -> bool {
        self.gcc && self.patchelf
    }

    fn can_build_pacman(&self) -> bool {
        self.gcc && self.bsdtar
    }

    fn report_missing(&self) {
        let missing: Vec<&str> = [
            ("gcc", self.gcc),
            ("patchelf", self.patchelf),
            ("bsdtar", self.bsdtar),
        ]
        .into_iter()
        .filter(|(_, found)| !found)
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            println!(
                "cargo:warning=Some fixture generation tools are missing: {}. Some test fixtures will not be generated.",
                missing.join(", ")
            );
        }
    }
}

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let fixtures_dir = Path::new(&manifest_dir).join("fixtures");

    fs::create_dir_all(&fixtures_dir).expect("Failed to create fixtures directory");

    let tools = AvailableTools::detect();
    tools.report_missing();

    generate_simple_fixtures(&fixtures_dir);

    if tools.can_patch_elf() {
        generate_elf_fixtures(&fixtures_dir);
    }

    if tools.gcc {
        generate_library_fixtures(&fixtures_dir);
    }

    if tools.can_build_pacman() {
        generate_pacman_package(&fixtures_dir);
    }

    println!("cargo:rerun-if-changed=fixtures/");
}

/// Generate simple test fixtures that don't require external tools.
fn generate_simple_fixtures(fixtures_dir: &Path) {
    // Shorter than the smallest ELF header
    let too_small_path = fixtures_dir.join("test-elf-file-too-small");
    if !too_small_path.exists() {
        fs::write(&too_small_path, "not an elf file")
            .expect("Failed to write test-elf-file-too-small");
    }

    // Large enough, wrong magic bytes
    let not_elf_path = fixtures_dir.join("test-elf-not-elf-file");
    if !not_elf_path.exists() {
        let content = "This is not an ELF file. It's just a text file for testing. \
                       Adding more content to ensure it's longer than 64 bytes which is \
                       the size of a 64-bit ELF file header.";
        fs::write(&not_elf_path, content).expect("Failed to write test-elf-not-elf-file");
    }
}

/// Generate ELF test files with various RPATH/RUNPATH settings.
fn generate_elf_fixtures(fixtures_dir: &Path) {
    let temp_dir = env::temp_dir().join("depends_validator_build");
    let _ = fs::remove_dir_all(&temp_dir);
    fs::create_dir_all(&temp_dir).expect("Failed to create temp directory");

    let source_path = temp_dir.join("test_binary.c");
    let binary_path = temp_dir.join("test_binary");

    let source_code = r#"#include <stdio.h>
int main() {
    printf("Test binary\n");
    return 0;
}
"#;

    fs::write(&source_path, source_code).expect("Failed to write test source");

    // Non-PIE so the fixtures are ET_EXEC
    let compile_status = Command::new("gcc")
        .arg("-no-pie")
        .arg("-o")
        .arg(&binary_path)
        .arg(&source_path)
        .arg("-Wl,--disable-new-dtags")
        .status();

    if compile_status.map(|s| !s.success()).unwrap_or(true) {
        println!("cargo:warning=Failed to compile test binary, skipping ELF fixture generation");
        let _ = fs::remove_dir_all(&temp_dir);
        return;
    }

    // (file name, search path, RPATH instead of RUNPATH)
    let elf_fixtures = [
        ("test-elf-absolute-rpath.elf", "/usr/lib", true),
        ("test-elf-origin-rpath.elf", "$ORIGIN/../lib", true),
        ("test-elf-runpath.elf", "/opt/lib", false),
        ("test-elf-insecure-rpath.elf", "/home/evil/lib", true),
        ("test-elf-empty-rpath-component.elf", "/usr/lib:", true),
    ];

    for (filename, search_path, force_rpath) in elf_fixtures {
        let dest_path = fixtures_dir.join(filename);
        if dest_path.exists() {
            continue;
        }

        if fs::copy(&binary_path, &dest_path).is_err() {
            println!("cargo:warning=Failed to copy binary for {filename}");
            continue;
        }

        let mut cmd = Command::new("patchelf");
        if force_rpath {
            cmd.arg("--force-rpath");
        }
        cmd.arg("--set-rpath").arg(search_path).arg(&dest_path);

        if cmd.status().map(|s| !s.success()).unwrap_or(true) {
            println!("cargo:warning=Failed to set search path for {filename}, removing file");
            let _ = fs::remove_file(&dest_path);
        }
    }

    let _ = fs::remove_dir_all(&temp_dir);
}

/// Create C sources for a shared library and a binary using it.
fn create_c_sources(build_dir: &Path) {
    let lib_source = r#"#include <stdio.h>

void hello_from_lib() {
    printf("Hello from shared library!\n");
}
"#;

    let bin_source = r#"#include <stdio.h>

void hello_from_lib();

int main() {
    printf("Hello from binary!\n");
    hello_from_lib();
    return 0;
}
"#;

    fs::write(build_dir.join("libhello.c"), lib_source).expect("Failed to write libhello.c");
    fs::write(build_dir.join("hello.c"), bin_source).expect("Failed to write hello.c");
}

/// Build `libhello.so.1` and a `hello` binary needing it into `build_dir`.
fn build_package_binaries(build_dir: &Path) -> bool {
    create_c_sources(build_dir);

    let lib_status = Command::new("gcc")
        .args(["-shared", "-fPIC", "-Wl,-soname,libhello.so.1", "-o"])
        .arg(build_dir.join("libhello.so.1"))
        .arg(build_dir.join("libhello.c"))
        .status();

    if lib_status.map(|s| !s.success()).unwrap_or(true) {
        return false;
    }

    // The linker looks for the unversioned name
    let _ = fs::remove_file(build_dir.join("libhello.so"));
    if fs::copy(build_dir.join("libhello.so.1"), build_dir.join("libhello.so")).is_err() {
        return false;
    }

    let bin_status = Command::new("gcc")
        .arg("-no-pie")
        .arg("-o")
        .arg(build_dir.join("hello"))
        .arg(build_dir.join("hello.c"))
        .arg(format!("-L{}", build_dir.display()))
        .arg("-lhello")
        .arg("-Wl,-rpath,$ORIGIN/../lib")
        .status();

    bin_status.map(|s| s.success()).unwrap_or(false)
}

/// Generate the shared library and binary fixtures.
fn generate_library_fixtures(fixtures_dir: &Path) {
    if fixtures_dir.join("libhello.so.1").exists() && fixtures_dir.join("hello").exists() {
        return;
    }

    let build_dir = env::temp_dir().join("depends_validator_libs");
    let _ = fs::remove_dir_all(&build_dir);
    fs::create_dir_all(&build_dir).expect("Failed to create build directory");

    if build_package_binaries(&build_dir) {
        for name in ["libhello.so.1", "hello"] {
            if let Err(e) = fs::copy(build_dir.join(name), fixtures_dir.join(name)) {
                println!("cargo:warning=Failed to copy {name} to fixtures: {e}");
            }
        }
    } else {
        println!("cargo:warning=Failed to build shared library fixtures");
    }

    let _ = fs::remove_dir_all(&build_dir);
}

/// Generate a pacman package.
fn generate_pacman_package(fixtures_dir: &Path) {
    let pkg_file = fixtures_dir.join("hello-1.0.0-1-x86_64.pkg.tar.gz");
    if pkg_file.exists() {
        return;
    }

    let temp_dir = env::temp_dir().join("depends_validator_pacman");
    let _ = fs::remove_dir_all(&temp_dir);
    let package_dir = temp_dir.join("pkg");
    let build_dir = temp_dir.join("build");

    fs::create_dir_all(package_dir.join("usr/bin")).expect("Failed to create bin directory");
    fs::create_dir_all(package_dir.join("usr/lib")).expect("Failed to create lib directory");
    fs::create_dir_all(&build_dir).expect("Failed to create build directory");

    let pkginfo = "# Generated by makepkg
pkgname = hello
pkgbase = hello
pkgver = 1.0.0-1
pkgdesc = Test package for dependency checks
url = https://example.com
builddate = 1700000000
packager = Test <test@example.com>
size = 32768
arch = x86_64
license = MIT
provides = libhello.so=1-64
depend = glibc
";
    fs::write(package_dir.join(".PKGINFO"), pkginfo).expect("Failed to write .PKGINFO");

    if !build_package_binaries(&build_dir) {
        println!("cargo:warning=Failed to build binaries for pacman package");
        let _ = fs::remove_dir_all(&temp_dir);
        return;
    }

    fs::copy(build_dir.join("hello"), package_dir.join("usr/bin/hello"))
        .expect("Failed to copy hello binary");
    fs::copy(
        build_dir.join("libhello.so.1"),
        package_dir.join("usr/lib/libhello.so.1"),
    )
    .expect("Failed to copy libhello.so.1");

    let status = Command::new("bsdtar")
        .arg("-czf")
        .arg(&pkg_file)
        .arg("-C")
        .arg(&package_dir)
        .args([".PKGINFO", "usr"])
        .status();

    if status.map(|s| !s.success()).unwrap_or(true) {
        println!("cargo:warning=Failed to build pacman package");
        let _ = fs::remove_file(&pkg_file);
    }

    let _ = fs::remove_dir_all(&temp_dir);
}
