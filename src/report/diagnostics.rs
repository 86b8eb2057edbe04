// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Findings of the analysis passes, partitioned into errors, warnings, and infos.

use serde::Serialize;
use std::fmt;

/// Machine-readable identifier of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tag {
    // Declared dependencies against detected ones.
    DependencyDuplicatedOptdepend,
    DependencySatisfiedOptdepend,
    DependencySelfSatisfied,
    DependencyDetectedSatisfied,
    DependencyDetectedButOptional,
    DependencyImplicitlySatisfied,
    DependencyImplicitlySatisfiedOptional,
    DependencyDetectedNotIncluded,
    DependencyNotNeeded,
    DependsBySight,
    // Shared libraries.
    LibraryNoPackageAssociated,
    LibdependsMatchingProvides,
    LibdependsMissingProvides,
    LinkLevelDependence,
    LibdependsDetectedSatisfied,
    LibdependsDetectedButOptional,
    LibdependsDetectedNotIncluded,
    LibdependsNotNeeded,
    LibdependsBySight,
    LibprovidesSatisfied,
    LibprovidesUnsatisfied,
    LibprovidesMissing,
    LibprovidesBySight,
    // Library search paths.
    InsecureRpath,
    InsecureRunpath,
}

impl Tag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DependencyDuplicatedOptdepend => "dependency-duplicated-optdepend",
            Self::DependencySatisfiedOptdepend => "dependency-satisfied-optdepend",
            Self::DependencySelfSatisfied => "dependency-self-satisfied",
            Self::DependencyDetectedSatisfied => "dependency-detected-satisfied",
            Self::DependencyDetectedButOptional => "dependency-detected-but-optional",
            Self::DependencyImplicitlySatisfied => "dependency-implicitly-satisfied",
            Self::DependencyImplicitlySatisfiedOptional => {
                "dependency-implicitly-satisfied-optional"
            }
            Self::DependencyDetectedNotIncluded => "dependency-detected-not-included",
            Self::DependencyNotNeeded => "dependency-not-needed",
            Self::DependsBySight => "depends-by-sight",
            Self::LibraryNoPackageAssociated => "library-no-package-associated",
            Self::LibdependsMatchingProvides => "libdepends-matching-provides",
            Self::LibdependsMissingProvides => "libdepends-missing-provides",
            Self::LinkLevelDependence => "link-level-dependence",
            Self::LibdependsDetectedSatisfied => "libdepends-detected-satisfied",
            Self::LibdependsDetectedButOptional => "libdepends-detected-but-optional",
            Self::LibdependsDetectedNotIncluded => "libdepends-detected-not-included",
            Self::LibdependsNotNeeded => "libdepends-not-needed",
            Self::LibdependsBySight => "libdepends-by-sight",
            Self::LibprovidesSatisfied => "libprovides-satisfied",
            Self::LibprovidesUnsatisfied => "libprovides-unsatisfied",
            Self::LibprovidesMissing => "libprovides-missing",
            Self::LibprovidesBySight => "libprovides-by-sight",
            Self::InsecureRpath => "insecure-rpath",
            Self::InsecureRunpath => "insecure-runpath",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Single-letter marker used in the console listing.
    #[must_use]
    pub fn marker(self) -> char {
        match self {
            Self::Error => 'E',
            Self::Warning => 'W',
            Self::Info => 'I',
        }
    }
}

/// A single finding: a tag plus the positional arguments for its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    tag: Tag,
    args: Vec<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(tag: Tag, args: Vec<String>) -> Self {
        Self { tag, args }
    }

    #[must_use]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Findings of one or more passes. Each list keeps the order in which findings were made.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    infos: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn error(&mut self, tag: Tag, args: Vec<String>) {
        self.errors.push(Diagnostic::new(tag, args));
    }

    pub fn warning(&mut self, tag: Tag, args: Vec<String>) {
        self.warnings.push(Diagnostic::new(tag, args));
    }

    pub fn info(&mut self, tag: Tag, args: Vec<String>) {
        self.infos.push(Diagnostic::new(tag, args));
    }

    pub fn push(&mut self, severity: Severity, tag: Tag, args: Vec<String>) {
        match severity {
            Severity::Error => self.error(tag, args),
            Severity::Warning => self.warning(tag, args),
            Severity::Info => self.info(tag, args),
        }
    }

    /// Append the findings of another pass after the findings made so far.
    pub fn extend(&mut self, other: Self) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.infos.extend(other.infos);
    }

    #[must_use]
    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    #[must_use]
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    #[must_use]
    pub fn infos(&self) -> &[Diagnostic] {
        &self.infos
    }

    /// All findings, errors first, each paired with its severity.
    pub fn iter(&self) -> impl Iterator<Item = (Severity, &Diagnostic)> {
        let errors = self.errors.iter().map(|d| (Severity::Error, d));
        let warnings = self.warnings.iter().map(|d| (Severity::Warning, d));
        let infos = self.infos.iter().map(|d| (Severity::Info, d));
        errors.chain(warnings).chain(infos)
    }

    /// Findings carrying `tag`, with their severity.
    pub fn with_tag(&self, tag: Tag) -> impl Iterator<Item = (Severity, &Diagnostic)> {
        self.iter().filter(move |(_, d)| d.tag == tag)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.infos.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
