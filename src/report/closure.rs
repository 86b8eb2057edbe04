// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Transitive closure of dependencies over a package index.

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::index::PackageIndex;

/// Every package reachable from `seeds` by following `depends`, without the seeds themselves.
///
/// Names unknown to the index end the traversal on that branch. Cycles terminate because a
/// name is only queued once.
pub fn closure_of<'a>(
    seeds: impl IntoIterator<Item = &'a str>,
    index: &dyn PackageIndex,
) -> BTreeSet<String> {
    let seeds: BTreeSet<&str> = seeds.into_iter().collect();
    let mut covered: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    for seed in &seeds {
        if covered.insert((*seed).to_string()) {
            queue.push_back((*seed).to_string());
        }
    }

    while let Some(name) = queue.pop_front() {
        let Some(package) = index.resolve(&name) else {
            continue;
        };
        for depend in package.depends() {
            if covered.insert(depend.clone()) {
                queue.push_back(depend.clone());
            }
        }
    }

    covered
        .into_iter()
        .filter(|name| !seeds.contains(name.as_str()))
        .collect()
}

/// Union of the closures of every name taken on its own.
///
/// A name only counts as covered when another name pulls it in, so for `{a, b}` with
/// `a -> b` the result contains `b` but not `a`.
pub fn covered<'a>(
    names: impl IntoIterator<Item = &'a str>,
    index: &dyn PackageIndex,
) -> BTreeSet<String> {
    let mut covered = BTreeSet::new();
    for name in names {
        covered.extend(closure_of([name], index));
    }
    covered
}
