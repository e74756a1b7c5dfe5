// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Package selection and closure computation.
//!
//! Each requested package is looked up in the composed repository,
//! configured with any requested extras, and expanded into the
//! transitive closure of its required runtime dependencies. Artifacts
//! are identified by a content hash over the definition, target system,
//! and resolved dependency hashes; two paths to the same hash collapse,
//! two different definitions under one name are a conflict. Closure
//! order is first-discovery order, making downstream output reproducible
//! byte for byte.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::repository::{similar_names, PackageDef, Repository};
use crate::spec::PackageRequest;
use crate::system::System;

#[cfg(test)]
#[path = "./select_test.rs"]
mod select_test;

/// Content hash identifying a concrete artifact (hex SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactHash(String);

impl ArtifactHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, for display.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for ArtifactHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A concrete, content-addressed member of a closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub def: PackageDef,
    pub hash: ArtifactHash,
}

/// The deduplicated, conflict-checked transitive set of artifacts
/// required by a list of package requests, in first-discovery order.
#[derive(Debug, Clone, Default)]
pub struct Closure {
    entries: Vec<Artifact>,
}

impl Closure {
    pub fn iter(&self) -> std::slice::Iter<'_, Artifact> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.entries.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Closure {
    type Item = &'a Artifact;
    type IntoIter = std::slice::Iter<'a, Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Resolve package requests against a composed repository into a closure.
pub fn select(repo: &Repository, requests: &[PackageRequest]) -> crate::Result<Closure> {
    let mut walker = Walker::new(repo.system().clone());

    for request in requests {
        let name = request.name();
        let def = repo.get(name).ok_or_else(|| crate::Error::UnknownPackage {
            name: name.to_string(),
            similar: repo.similar(name),
        })?;
        let requester = format!("request '{request}'");

        if request.extras().is_empty() {
            walker.visit_plain(repo, name, &requester)?;
        } else {
            let configured = configure(name, def, request.extras())?;
            walker.visit(repo, name, &configured, &requester)?;
        }
    }

    debug!(artifacts = walker.discovery.len(), "closure computed");
    Ok(walker.into_closure())
}

/// Apply a request's extras to a package definition, producing the
/// concrete configured definition. This is the only place dynamic
/// sub-selection happens.
fn configure(name: &str, def: &PackageDef, extras: &[String]) -> crate::Result<PackageDef> {
    let mut configured = def.clone();
    for extra in extras {
        let additions = def
            .extras
            .get(extra)
            .ok_or_else(|| crate::Error::UnknownExtra {
                package: name.to_string(),
                extra: extra.clone(),
                similar: similar_names(extra, def.extras.keys()),
            })?;
        for dep in additions {
            if !configured.deps.contains(dep) {
                configured.deps.push(dep.clone());
            }
        }
    }
    Ok(configured)
}

struct Walker {
    system: System,
    /// Names in the order they were first reached.
    discovery: Vec<String>,
    discovered: HashSet<String>,
    artifacts: HashMap<String, Artifact>,
    /// How each name was first reached, for conflict reports.
    requested_by: HashMap<String, String>,
    /// Hashes of unconfigured repository definitions, memoized by name.
    plain: HashMap<String, ArtifactHash>,
    stack: Vec<String>,
    in_progress: HashSet<String>,
}

impl Walker {
    fn new(system: System) -> Self {
        Self {
            system,
            discovery: Vec::new(),
            discovered: HashSet::new(),
            artifacts: HashMap::new(),
            requested_by: HashMap::new(),
            plain: HashMap::new(),
            stack: Vec::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Visit a package using its unconfigured repository definition.
    fn visit_plain(
        &mut self,
        repo: &Repository,
        name: &str,
        requester: &str,
    ) -> crate::Result<ArtifactHash> {
        if let Some(hash) = self.plain.get(name) {
            return Ok(hash.clone());
        }
        let def = repo.get(name).ok_or_else(|| crate::Error::UnknownPackage {
            name: name.to_string(),
            similar: repo.similar(name),
        })?;
        let hash = self.visit(repo, name, def, requester)?;
        self.plain.insert(name.to_string(), hash.clone());
        Ok(hash)
    }

    /// Visit a package with a concrete definition, expanding required
    /// dependencies depth-first and computing the artifact hash.
    fn visit(
        &mut self,
        repo: &Repository,
        name: &str,
        def: &PackageDef,
        requester: &str,
    ) -> crate::Result<ArtifactHash> {
        if self.in_progress.contains(name) {
            return Err(self.cycle_error(name));
        }

        if self.discovered.insert(name.to_string()) {
            self.discovery.push(name.to_string());
            self.requested_by
                .insert(name.to_string(), requester.to_string());
        }

        self.in_progress.insert(name.to_string());
        self.stack.push(name.to_string());
        let result = self.visit_deps(repo, name, def);
        self.stack.pop();
        self.in_progress.remove(name);

        let dep_hashes = result?;
        let hash = artifact_hash(name, def, &self.system, &dep_hashes);

        match self.artifacts.get(name) {
            Some(existing) if existing.hash == hash => Ok(hash),
            Some(_) => Err(crate::Error::VersionConflict {
                name: name.to_string(),
                first: self
                    .requested_by
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| "an earlier request".to_string()),
                second: requester.to_string(),
            }),
            None => {
                self.artifacts.insert(
                    name.to_string(),
                    Artifact {
                        name: name.to_string(),
                        def: def.clone(),
                        hash: hash.clone(),
                    },
                );
                Ok(hash)
            }
        }
    }

    fn visit_deps(
        &mut self,
        repo: &Repository,
        name: &str,
        def: &PackageDef,
    ) -> crate::Result<Vec<(String, ArtifactHash)>> {
        let mut dep_hashes: Vec<(String, ArtifactHash)> = Vec::new();
        let requester = format!("dependency of '{name}'");

        for dep in &def.deps {
            if !repo.contains(dep) {
                return Err(crate::Error::UnknownPackage {
                    name: dep.clone(),
                    similar: repo.similar(dep),
                });
            }
            if self.in_progress.contains(dep) {
                return Err(self.cycle_error(dep));
            }
            let hash = self.visit_plain(repo, dep, &requester)?;
            dep_hashes.push((dep.clone(), hash));
        }

        for dep in &def.optional_deps {
            // Weak edges: skipped when absent, allowed to close cycles.
            if self.in_progress.contains(dep) || !repo.contains(dep) {
                continue;
            }
            let hash = self.visit_plain(repo, dep, &requester)?;
            dep_hashes.push((dep.clone(), hash));
        }

        Ok(dep_hashes)
    }

    fn cycle_error(&self, name: &str) -> crate::Error {
        let pos = self
            .stack
            .iter()
            .position(|entry| entry == name)
            .unwrap_or(0);
        let mut cycle: Vec<String> = self.stack[pos..].to_vec();
        cycle.push(name.to_string());
        crate::Error::DependencyCycle { cycle }
    }

    fn into_closure(mut self) -> Closure {
        let entries = self
            .discovery
            .iter()
            .filter_map(|name| self.artifacts.remove(name))
            .collect();
        Closure { entries }
    }
}

/// Deterministic artifact identity: definition, target system, and
/// resolved dependency hashes, name-sorted.
fn artifact_hash(
    name: &str,
    def: &PackageDef,
    system: &System,
    dep_hashes: &[(String, ArtifactHash)],
) -> ArtifactHash {
    let mut sorted: Vec<&(String, ArtifactHash)> = dep_hashes.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0]);
    hasher.update(def.version.as_bytes());
    hasher.update([0]);
    hasher.update(def.recipe.as_bytes());
    hasher.update([0]);
    hasher.update(system.to_string().as_bytes());
    hasher.update([0]);
    for (dep, hash) in sorted {
        hasher.update(dep.as_bytes());
        hasher.update([b'=']);
        hasher.update(hash.as_str().as_bytes());
        hasher.update([0]);
    }

    ArtifactHash(format!("{:x}", hasher.finalize()))
}
