// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
use std::fs;
use std::path::PathBuf;

use depends_validator::archive::{
    Archive, ArchiveEntries, ArchiveEntry, ArchiveFile, Elf, ElfClass, ElfType,
};
use depends_validator::index::{DatabaseIndex, MemoryIndex, PackageIndex};
use depends_validator::package::Package;
use depends_validator::report::{
    validate_report, LibraryCache, Report, ReportOptions, Severity, SharedLibraryOptions, Tag,
};

const LDCONFIG: &str = "\
3 libs found in cache `/etc/ld.so.cache'
\tlibssl.so.3 (libc6,x86-64) => /usr/lib/libssl.so.3
\tlibc.so.6 (libc6,x86-64) => /usr/lib/libc.so.6
\tlibc.so.6 (libc6) => /usr/lib32/libc.so.6
";

fn get_fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn options() -> ReportOptions {
    ReportOptions {
        shared_libraries: SharedLibraryOptions {
            host_symlinks: false,
        },
    }
}

fn binary(needed: &[&str]) -> ArchiveEntry {
    let elf = Elf::new(
        ElfClass::Elf64,
        ElfType::Executable,
        needed.iter().map(ToString::to_string).collect(),
        None,
        Vec::new(),
        Vec::new(),
    );
    ArchiveEntry::new(ArchiveFile::Elf(elf), 16384, 0o755)
}

fn foo_archive(pkginfo: &str) -> Archive {
    let mut entries = ArchiveEntries::new();
    entries.insert(
        PathBuf::from("usr/bin/foo"),
        binary(&["libssl.so.3", "libc.so.6"]),
    );
    Archive::from_files(
        PathBuf::from("foo-1.0-1-x86_64.pkg.tar.zst"),
        entries,
        Some(pkginfo.to_string()),
    )
}

fn installed() -> MemoryIndex {
    MemoryIndex::new([
        Package::from_fields([
            ("name", vec!["openssl"]),
            ("depends", vec!["glibc"]),
            ("provides", vec!["libssl.so=3-64"]),
            ("files", vec!["usr/lib/libssl.so.3"]),
        ])
        .unwrap(),
        Package::from_fields([
            ("name", vec!["glibc"]),
            ("files", vec!["usr/lib/libc.so.6", "usr/lib32/libc.so.6"]),
        ])
        .unwrap(),
    ])
}

fn findings(report: &Report, tag: Tag) -> Vec<(Severity, Vec<String>)> {
    report
        .diagnostics()
        .with_tag(tag)
        .map(|(severity, diagnostic)| (severity, diagnostic.args().to_vec()))
        .collect()
}

#[test]
fn test_undeclared_library_owner_is_an_error() {
    let archive = foo_archive("pkgname = foo\npkgver = 1.0-1\ndepend = glibc\n");
    let package = archive.package().expect("Should read .PKGINFO");
    let cache = LibraryCache::parse(LDCONFIG);

    let report = Report::new(package, &archive, &installed(), &cache, options());

    assert!(report.detected().contains("openssl"));
    assert!(report.detected().contains("glibc"));
    assert_eq!(
        findings(&report, Tag::LibdependsMatchingProvides),
        vec![(
            Severity::Info,
            vec!["libssl.so".to_string(), "openssl".to_string()]
        )]
    );
    let not_included = findings(&report, Tag::DependencyDetectedNotIncluded);
    assert_eq!(not_included.len(), 1);
    assert_eq!(not_included[0].0, Severity::Error);
    assert_eq!(not_included[0].1[0], "openssl");
    assert_eq!(
        findings(&report, Tag::DependencyDetectedSatisfied)[0].1[0],
        "glibc"
    );

    let result = validate_report(&report);
    assert!(result.is_err(), "Undeclared dependencies must fail validation");
}

#[test]
fn test_transitive_dependency_is_implicitly_satisfied() {
    let archive = foo_archive("pkgname = foo\npkgver = 1.0-1\ndepend = openssl\n");
    let package = archive.package().expect("Should read .PKGINFO");
    let cache = LibraryCache::parse(LDCONFIG);

    let report = Report::new(package, &archive, &installed(), &cache, options());

    let implicit = findings(&report, Tag::DependencyImplicitlySatisfied);
    assert_eq!(implicit.len(), 1);
    assert_eq!(implicit[0].0, Severity::Warning);
    assert_eq!(implicit[0].1[0], "glibc");
    assert!(findings(&report, Tag::DependencyNotNeeded).is_empty());
    assert!(report.diagnostics().errors().is_empty());
    assert!(validate_report(&report).is_ok());
}

#[test]
fn test_report_json_output() {
    let archive = foo_archive("pkgname = foo\npkgver = 1.0-1\ndepend = glibc\ndepend = openssl\n");
    let package = archive.package().expect("Should read .PKGINFO");
    let cache = LibraryCache::parse(LDCONFIG);
    let report = Report::new(package, &archive, &installed(), &cache, options());

    let json_str = serde_json::to_string(&report).expect("Should serialize report to JSON");
    let json: serde_json::Value = serde_json::from_str(&json_str).expect("Should parse JSON");

    assert_eq!(json["package"], "foo");
    assert_eq!(json["totals"]["files"], 1);
    assert_eq!(json["totals"]["elfs"]["binaries"], 1);
    assert_eq!(json["totals"]["diagnostics"]["errors"], 0);
    assert!(json["detected"]["openssl"].is_array());
    assert_eq!(json["detected"]["openssl"][0]["tag"], "libraries-needed");
}

#[test]
fn test_database_index_feeds_report() {
    let db = tempfile::TempDir::new().unwrap();
    for (dir, desc, files) in [
        (
            "openssl-3.2.1-1",
            "%NAME%\nopenssl\n\n%VERSION%\n3.2.1-1\n\n%DEPENDS%\nglibc\n\n%PROVIDES%\nlibssl.so=3-64\n\n",
            "%FILES%\nusr/\nusr/lib/\nusr/lib/libssl.so.3\n\n",
        ),
        (
            "glibc-2.39-1",
            "%NAME%\nglibc\n\n%VERSION%\n2.39-1\n\n",
            "%FILES%\nusr/\nusr/lib/\nusr/lib/libc.so.6\n\n",
        ),
    ] {
        let entry = db.path().join(dir);
        fs::create_dir_all(&entry).unwrap();
        fs::write(entry.join("desc"), desc).unwrap();
        fs::write(entry.join("files"), files).unwrap();
    }
    let index = DatabaseIndex::open(db.path()).expect("Should read the package database");
    assert_eq!(index.all_installed().len(), 2);

    let archive = foo_archive("pkgname = foo\npkgver = 1.0-1\ndepend = openssl\n");
    let package = archive.package().expect("Should read .PKGINFO");
    let report = Report::new(
        package,
        &archive,
        &index,
        &LibraryCache::parse(LDCONFIG),
        options(),
    );

    assert!(report.detected().contains("openssl"));
    assert_eq!(
        findings(&report, Tag::DependencyDetectedSatisfied)[0].1[0],
        "openssl"
    );
    assert!(validate_report(&report).is_ok());
}

#[test]
fn test_pacman_package_report() {
    let pkg_path = get_fixtures_dir().join("hello-1.0.0-1-x86_64.pkg.tar.gz");
    if !pkg_path.exists() {
        eprintln!(
            "Skipping test: fixture {} not found. It is generated by build.rs when gcc and bsdtar are available.",
            pkg_path.display()
        );
        return;
    }

    let archive = Archive::open(&pkg_path).expect("Should extract package");
    let package = archive.package().expect("Should read .PKGINFO");
    assert_eq!(package.name(), "hello");

    // Checked as if it were installed already, so the bundled library has an owner.
    let index = MemoryIndex::new([package.clone()]);
    let report = Report::new(package, &archive, &index, &LibraryCache::empty(), options());

    // The binary finds its library through $ORIGIN/../lib inside the package.
    assert!(report.detected().contains("hello"));
    assert!(findings(&report, Tag::InsecureRpath).is_empty());
    assert!(findings(&report, Tag::DependencySelfSatisfied)
        .iter()
        .any(|(_, args)| args[0] == "hello"));
    let json = serde_json::to_value(&report).expect("Should serialize report to JSON");
    assert_eq!(json["totals"]["elfs"]["shared_libraries"], 1);
    assert_eq!(report.package(), "hello");
}
