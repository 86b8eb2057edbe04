// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Strips version constraints and descriptions off dependency strings.

use regex::Regex;
use std::sync::LazyLock;

use super::{MetadataError, MetadataResult};

// `name`, optionally followed by a version constraint and/or an optdepends description.
static DEPENDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^<>=:]+)([<>]?=.*)?(: .*)?").expect("valid regex"));

// Soname dependencies keep their version token (`libfoo.so=1-64`), only a description is cut.
static SODEPENDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]+)(: .*)?").expect("valid regex"));

/// Reduce a raw dependency string to the identity of the package or soname it names.
///
/// `neon>=0.25.5-4` becomes `neon` and `python-foo: for foo support` becomes `python-foo`.
/// Soname dependencies such as `libfoo.so=1-64` keep everything before the first colon.
///
/// # Errors
/// Returns [`MetadataError::MalformedDependency`] when no identity can be extracted, e.g.
/// for an empty string or a string starting with a comparison operator.
pub fn strip_depend_info(raw: &str) -> MetadataResult<String> {
    let re = if raw.contains(".so=") {
        &*SODEPENDS_RE
    } else {
        &*DEPENDS_RE
    };
    re.captures(raw)
        .and_then(|captures| captures.get(1))
        .map(|identity| identity.as_str().to_string())
        .ok_or_else(|| MetadataError::MalformedDependency {
            value: raw.to_string(),
        })
}
