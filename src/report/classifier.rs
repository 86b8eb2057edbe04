// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Compares the dependencies detected in a package with the ones it declares.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::closure::covered;
use super::diagnostics::{Diagnostics, Tag};
use crate::index::PackageIndex;
use crate::package::{DependencyReason, Package};

// Multilib packages depend on their 64-bit counterpart without using it in a detectable way.
const MULTILIB_PREFIX: &str = "lib32-";

/// Classify every detected dependency of `package` and flag declared dependencies that are
/// not needed.
///
/// Each detected name yields exactly one finding, the first of these that applies:
///
/// | condition                                   | finding                                              |
/// |---------------------------------------------|------------------------------------------------------|
/// | it is the package itself                    | info `dependency-self-satisfied`                     |
/// | declared in `depends`                       | info `dependency-detected-satisfied`                 |
/// | declared in `optdepends`                    | warning `dependency-detected-but-optional`           |
/// | pulled in by `depends`                      | warning `dependency-implicitly-satisfied`            |
/// | pulled in by `optdepends`                   | warning `dependency-implicitly-satisfied-optional`   |
/// | otherwise                                   | error `dependency-detected-not-included`             |
///
/// A detected name also matches when the package registered under it provides a matching
/// name.
pub fn classify(package: &Package, index: &dyn PackageIndex) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();
    let detected = package.detected();

    let explicit: BTreeSet<String> = package.depends().iter().cloned().collect();
    let optional: BTreeSet<String> = package.optdepends().iter().cloned().collect();
    let implicit = covered(explicit.iter().map(String::as_str), index);
    let implicit_optional = covered(optional.iter().map(String::as_str), index);

    let smartprovides: BTreeMap<&str, HashSet<&str>> = detected
        .names()
        .map(|name| {
            let provides = index
                .resolve(name)
                .map(|provider| provider.provides().iter().map(String::as_str).collect())
                .unwrap_or_default();
            (name, provides)
        })
        .collect();
    // TODO: declared depends are matched against the provides of every detected package,
    // which is looser than the per-name check below. Narrow it to the provides of the
    // package each depend resolves to once it is known whether packages rely on this.
    let all_provides: HashSet<&str> = smartprovides.values().flatten().copied().collect();

    for name in explicit.intersection(&optional) {
        diagnostics.error(Tag::DependencyDuplicatedOptdepend, vec![name.clone()]);
    }
    for name in optional.intersection(&implicit) {
        diagnostics.info(Tag::DependencySatisfiedOptdepend, vec![name.clone()]);
    }

    for (name, reasons) in detected {
        let provides = &smartprovides[name.as_str()];
        let args = vec![name.clone(), join_reasons(reasons)];

        if name == package.name() {
            diagnostics.info(Tag::DependencySelfSatisfied, args);
        } else if satisfied_by(&explicit, name, provides) {
            diagnostics.info(Tag::DependencyDetectedSatisfied, args);
        } else if satisfied_by(&optional, name, provides) {
            diagnostics.warning(Tag::DependencyDetectedButOptional, args);
        } else if satisfied_by(&implicit, name, provides) {
            diagnostics.warning(Tag::DependencyImplicitlySatisfied, args);
        } else if satisfied_by(&implicit_optional, name, provides) {
            diagnostics.warning(Tag::DependencyImplicitlySatisfiedOptional, args);
        } else {
            diagnostics.error(Tag::DependencyDetectedNotIncluded, args);
        }
    }

    let counterpart = package.name().strip_prefix(MULTILIB_PREFIX);
    let mut seen = HashSet::new();
    for depend in package.depends() {
        if !seen.insert(depend.as_str()) || counterpart == Some(depend.as_str()) {
            continue;
        }
        if !detected.contains(depend) && !all_provides.contains(depend.as_str()) {
            diagnostics.warning(Tag::DependencyNotNeeded, vec![depend.clone()]);
        }
    }

    diagnostics.info(
        Tag::DependsBySight,
        vec![detected.names().collect::<Vec<_>>().join(" ")],
    );
    diagnostics
}

/// Whether `name`, or something the package registered under it provides, is in `set`.
fn satisfied_by(set: &BTreeSet<String>, name: &str, provides: &HashSet<&str>) -> bool {
    set.contains(name) || provides.iter().any(|provide| set.contains(*provide))
}

fn join_reasons(reasons: &[DependencyReason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use crate::report::diagnostics::{Diagnostic, Severity};

    fn package(name: &str, depends: &[&str], optdepends: &[&str]) -> Package {
        Package::from_fields([
            ("name", vec![name]),
            ("depends", depends.to_vec()),
            ("optdepends", optdepends.to_vec()),
        ])
        .unwrap()
    }

    fn detect(package: &mut Package, names: &[&str]) {
        for name in names {
            package.detected_mut().add(
                *name,
                DependencyReason::new("libraries-needed", vec![format!("usr/lib/{name}.so")]),
            );
        }
    }

    fn findings(diagnostics: &Diagnostics) -> Vec<(Severity, Tag, String)> {
        diagnostics
            .iter()
            .filter(|(_, d)| d.tag() != Tag::DependsBySight)
            .map(|(s, d)| (s, d.tag(), d.args()[0].clone()))
            .collect()
    }

    #[test]
    fn test_undeclared_dependency_is_an_error() {
        let mut foo = package("foo", &[], &[]);
        detect(&mut foo, &["x"]);
        let diagnostics = classify(&foo, &MemoryIndex::default());

        assert_eq!(
            findings(&diagnostics),
            vec![(Severity::Error, Tag::DependencyDetectedNotIncluded, "x".to_string())]
        );
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn test_duplicated_optdepend() {
        let foo = package("foo", &["a"], &["a: for frobbing"]);
        let diagnostics = classify(&foo, &MemoryIndex::default());
        assert!(diagnostics
            .errors()
            .iter()
            .any(|d| d.tag() == Tag::DependencyDuplicatedOptdepend && d.args() == ["a"]));
    }

    #[test]
    fn test_satisfied_optdepend() {
        let index = MemoryIndex::new([package("a", &["b"], &[]), package("b", &[], &[])]);
        let foo = package("foo", &["a"], &["b"]);
        let diagnostics = classify(&foo, &index);
        assert!(diagnostics
            .infos()
            .iter()
            .any(|d| d.tag() == Tag::DependencySatisfiedOptdepend && d.args() == ["b"]));
        assert!(diagnostics.errors().is_empty());
    }

    #[test]
    fn test_precedence() {
        let index = MemoryIndex::new([
            package("a", &["impl"], &[]),
            package("impl", &[], &[]),
            package("o", &["impl-opt"], &[]),
            package("impl-opt", &[], &[]),
        ]);
        let mut foo = package("foo", &["a", "lib"], &["o", "opt"]);
        detect(
            &mut foo,
            &["foo", "lib", "opt", "impl", "impl-opt", "stray", "a", "o"],
        );
        let diagnostics = classify(&foo, &index);

        assert_eq!(
            findings(&diagnostics),
            vec![
                (Severity::Error, Tag::DependencyDetectedNotIncluded, "stray".to_string()),
                (Severity::Warning, Tag::DependencyImplicitlySatisfied, "impl".to_string()),
                (
                    Severity::Warning,
                    Tag::DependencyImplicitlySatisfiedOptional,
                    "impl-opt".to_string()
                ),
                (Severity::Warning, Tag::DependencyDetectedButOptional, "o".to_string()),
                (Severity::Warning, Tag::DependencyDetectedButOptional, "opt".to_string()),
                (Severity::Info, Tag::DependencyDetectedSatisfied, "a".to_string()),
                (Severity::Info, Tag::DependencySelfSatisfied, "foo".to_string()),
                (Severity::Info, Tag::DependencyDetectedSatisfied, "lib".to_string()),
            ]
        );
    }

    #[test]
    fn test_detected_name_matches_through_provides() {
        let index = MemoryIndex::new([Package::from_fields([
            ("name", vec!["jre-openjdk"]),
            ("provides", vec!["java-runtime=21"]),
        ])
        .unwrap()]);
        let mut foo = package("foo", &["java-runtime"], &[]);
        detect(&mut foo, &["jre-openjdk"]);
        let diagnostics = classify(&foo, &index);

        assert_eq!(
            findings(&diagnostics),
            vec![(
                Severity::Info,
                Tag::DependencyDetectedSatisfied,
                "jre-openjdk".to_string()
            )]
        );
    }

    #[test]
    fn test_not_needed() {
        let foo = package("foo", &["a"], &[]);
        let diagnostics = classify(&foo, &MemoryIndex::default());
        assert_eq!(
            findings(&diagnostics),
            vec![(Severity::Warning, Tag::DependencyNotNeeded, "a".to_string())]
        );
    }

    #[test]
    fn test_not_needed_skips_multilib_counterpart() {
        let foo = package("lib32-a", &["a", "lib32-glibc"], &[]);
        let diagnostics = classify(&foo, &MemoryIndex::default());
        assert_eq!(
            findings(&diagnostics),
            vec![(
                Severity::Warning,
                Tag::DependencyNotNeeded,
                "lib32-glibc".to_string()
            )]
        );
    }

    #[test]
    fn test_not_needed_uses_provides_of_detected_packages() {
        let index = MemoryIndex::new([Package::from_fields([
            ("name", vec!["bash"]),
            ("provides", vec!["sh"]),
        ])
        .unwrap()]);
        let mut foo = package("foo", &["sh"], &[]);
        detect(&mut foo, &["bash"]);
        let diagnostics = classify(&foo, &index);
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn test_reasons_and_summary() {
        let mut foo = package("foo", &["glibc"], &[]);
        foo.detected_mut().add(
            "glibc",
            DependencyReason::new("libraries-needed", vec!["a".into(), "b".into()]),
        );
        foo.detected_mut()
            .add("glibc", DependencyReason::new("script-link", vec!["c".into()]));
        foo.detected_mut().insert("bash");
        let diagnostics = classify(&foo, &MemoryIndex::default());

        let satisfied: Vec<(Severity, &Diagnostic)> = diagnostics
            .with_tag(Tag::DependencyDetectedSatisfied)
            .collect();
        assert_eq!(satisfied.len(), 1);
        assert_eq!(satisfied[0].0, Severity::Info);
        assert_eq!(
            satisfied[0].1.args(),
            ["glibc", "libraries-needed a b, script-link c"]
        );

        let summary = diagnostics.infos().last().unwrap();
        assert_eq!(summary.tag(), Tag::DependsBySight);
        assert_eq!(summary.args(), ["bash glibc"]);
    }
}
