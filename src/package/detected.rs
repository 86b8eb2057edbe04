// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Dependencies found by inspecting a package, together with the reasons they were found.

use serde::Serialize;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// Why an inspection pass decided that a dependency is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyReason {
    tag: String,
    args: Vec<String>,
}

impl DependencyReason {
    #[must_use]
    pub fn new(tag: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            tag: tag.into(),
            args,
        }
    }

    /// Machine-readable tag, e.g. `libraries-needed`.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Positional arguments for the message template of the tag.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for DependencyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Map of dependency name to the reasons it was detected.
///
/// Names iterate in lexical order. Reasons for one name keep the order in which the
/// inspection passes added them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DetectedDependencies {
    reasons: BTreeMap<String, Vec<DependencyReason>>,
}

impl DetectedDependencies {
    /// Record one more reason for `name`.
    pub fn add(&mut self, name: impl Into<String>, reason: DependencyReason) {
        self.reasons.entry(name.into()).or_default().push(reason);
    }

    /// Make sure `name` is present, without recording a reason.
    pub fn insert(&mut self, name: impl Into<String>) {
        self.reasons.entry(name.into()).or_default();
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.reasons.contains_key(name)
    }

    #[must_use]
    pub fn reasons(&self, name: &str) -> &[DependencyReason] {
        self.reasons.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.reasons.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<DependencyReason>> {
        self.reasons.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }
}

impl<'a> IntoIterator for &'a DetectedDependencies {
    type Item = (&'a String, &'a Vec<DependencyReason>);
    type IntoIter = btree_map::Iter<'a, String, Vec<DependencyReason>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
