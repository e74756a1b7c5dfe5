// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Package repository documents and the composed, read-only repository.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::System;

#[cfg(test)]
#[path = "./repository_test.rs"]
mod repository_test;

/// A single package definition.
///
/// In base and overlay documents the `version` and `recipe` fields may
/// carry `${final:NAME.FIELD}` / `${prev:NAME.FIELD}` references; in a
/// composed [`Repository`] they are always concrete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageDef {
    /// Package version string.
    #[serde(default)]
    pub version: String,

    /// Opaque build recipe, hashed into the artifact identity.
    #[serde(default)]
    pub recipe: String,

    /// Required runtime dependencies (package names).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,

    /// Optional dependencies: included when present in the repository,
    /// and allowed to close dependency cycles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_deps: Vec<String>,

    /// Named extras: extra name -> additional required dependencies.
    /// Selected per-request via the package spec's `extras:` list.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Vec<String>>,
}

/// A base repository or overlay document as written on disk.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RepoDoc {
    /// Package name -> definition.
    #[serde(default)]
    pub packages: BTreeMap<String, PackageDef>,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl RepoDoc {
    /// Parse a repository document from YAML.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| crate::Error::InvalidYaml {
            path: PathBuf::from("<inline>"),
            error: e,
        })
    }

    /// Load a repository document from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        let mut doc: Self = serde_yaml::from_str(&yaml).map_err(|e| crate::Error::InvalidYaml {
            path: path.to_path_buf(),
            error: e,
        })?;
        doc.source_path = Some(path.to_path_buf());
        Ok(doc)
    }
}

/// The fully composed package repository.
///
/// Produced by [`crate::overlay::compose`]; read-only afterwards. All
/// template references have been forced to concrete values.
#[derive(Debug, Clone)]
pub struct Repository {
    packages: BTreeMap<String, PackageDef>,
    system: System,
}

impl Repository {
    pub(crate) fn new(packages: BTreeMap<String, PackageDef>, system: System) -> Self {
        Self { packages, system }
    }

    /// Look up a package definition by name.
    pub fn get(&self, name: &str) -> Option<&PackageDef> {
        self.packages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Package names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.packages.keys()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// The target system this repository was composed for.
    pub fn system(&self) -> &System {
        &self.system
    }

    /// Names similar to `target`, for error suggestions.
    pub fn similar(&self, target: &str) -> Vec<String> {
        similar_names(target, self.packages.keys())
    }
}

/// Case-insensitive containment match, capped at three suggestions.
pub(crate) fn similar_names<'a>(
    target: &str,
    candidates: impl Iterator<Item = &'a String>,
) -> Vec<String> {
    let needle = target.to_lowercase();
    candidates
        .filter(|name| {
            let hay = name.to_lowercase();
            hay.contains(&needle) || needle.contains(&hay)
        })
        .take(3)
        .cloned()
        .collect()
}
