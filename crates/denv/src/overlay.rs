// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Overlay composition over a base repository.
//!
//! Composition is strictly left-to-right: the base document is layer 0,
//! overlays follow in declaration order, and the last definition of a
//! package name wins. Definitions may reference other definitions'
//! fields through `${final:NAME.FIELD}` (the fully composed repository)
//! and `${prev:NAME.FIELD}` (the view composed of strictly earlier
//! layers). A `prev` reference inside a later layer still sees `final`
//! references of earlier layers resolved against the fully composed
//! repository, giving the usual fixed-point extension semantics.
//!
//! Every package slot is forced eagerly with an in-progress marker, so a
//! strict self-reference is reported as [`crate::Error::OverlayCycle`]
//! instead of looping. Composition either fully succeeds or fails
//! without exposing partial state.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::repository::{similar_names, PackageDef, RepoDoc, Repository};
use crate::system::System;

#[cfg(test)]
#[path = "./overlay_test.rs"]
mod overlay_test;

/// Compose a base repository document and ordered overlays into a
/// concrete [`Repository`] for the given target system.
pub fn compose(base: &RepoDoc, overlays: &[RepoDoc], system: &System) -> crate::Result<Repository> {
    let layers: Vec<&BTreeMap<String, PackageDef>> = std::iter::once(&base.packages)
        .chain(overlays.iter().map(|o| &o.packages))
        .collect();

    let names: BTreeSet<&String> = layers.iter().flat_map(|layer| layer.keys()).collect();
    debug!(
        packages = names.len(),
        layers = layers.len(),
        system = %system,
        "composing repository"
    );

    let mut evaluator = Evaluator {
        layers,
        memo: HashMap::new(),
        in_progress: HashSet::new(),
    };

    let mut packages = BTreeMap::new();
    for name in names {
        let limit = evaluator.layers.len();
        let def = evaluator.force(name, limit)?;
        packages.insert(name.clone(), def);
    }

    Ok(Repository::new(packages, system.clone()))
}

/// Lazily-forced package slots, memoized per (name, defining layer).
struct Evaluator<'a> {
    layers: Vec<&'a BTreeMap<String, PackageDef>>,
    memo: HashMap<(String, usize), PackageDef>,
    in_progress: HashSet<(String, usize)>,
}

impl Evaluator<'_> {
    /// Force the definition of `name` as seen by the first `limit`
    /// layers: the last defining layer below `limit` wins.
    fn force(&mut self, name: &str, limit: usize) -> crate::Result<PackageDef> {
        let layer = self.defining_layer(name, limit)?;
        let key = (name.to_string(), layer);

        if let Some(done) = self.memo.get(&key) {
            return Ok(done.clone());
        }
        if !self.in_progress.insert(key.clone()) {
            return Err(crate::Error::OverlayCycle {
                package: name.to_string(),
                layer,
            });
        }

        let raw = self.layers[layer][name].clone();
        let result = self.expand_def(&raw, layer, name);

        self.in_progress.remove(&key);

        let def = result?;
        self.memo.insert(key, def.clone());
        Ok(def)
    }

    fn defining_layer(&self, name: &str, limit: usize) -> crate::Result<usize> {
        (0..limit)
            .rev()
            .find(|&i| self.layers[i].contains_key(name))
            .ok_or_else(|| {
                let candidates: BTreeSet<&String> = self
                    .layers
                    .iter()
                    .take(limit)
                    .flat_map(|layer| layer.keys())
                    .collect();
                crate::Error::UnknownPackage {
                    name: name.to_string(),
                    similar: similar_names(name, candidates.into_iter()),
                }
            })
    }

    fn expand_def(
        &mut self,
        raw: &PackageDef,
        layer: usize,
        owner: &str,
    ) -> crate::Result<PackageDef> {
        let mut def = raw.clone();
        def.version = self.expand(&raw.version, layer, owner)?;
        def.recipe = self.expand(&raw.recipe, layer, owner)?;
        Ok(def)
    }

    /// Expand `${final:...}` / `${prev:...}` references in a field value.
    fn expand(&mut self, value: &str, layer: usize, owner: &str) -> crate::Result<String> {
        if !value.contains("${") {
            return Ok(value.to_string());
        }

        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find('}').ok_or_else(|| {
                crate::Error::ValidationFailed(format!(
                    "Unterminated reference in definition of '{owner}': '{value}'"
                ))
            })?;
            let resolved = self.resolve_ref(&after[..end], layer, owner)?;
            out.push_str(&resolved);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn resolve_ref(
        &mut self,
        reference: &str,
        layer: usize,
        owner: &str,
    ) -> crate::Result<String> {
        let malformed = || {
            crate::Error::ValidationFailed(format!(
                "Malformed reference '${{{reference}}}' in definition of '{owner}': \
                 expected '${{final:NAME.FIELD}}' or '${{prev:NAME.FIELD}}'"
            ))
        };

        let (view, target_field) = reference.split_once(':').ok_or_else(malformed)?;
        let (target, field) = target_field.split_once('.').ok_or_else(malformed)?;

        let limit = match view {
            "final" => self.layers.len(),
            "prev" => layer,
            _ => return Err(malformed()),
        };

        let def = self.force(target, limit)?;
        match field {
            "version" => Ok(def.version),
            "recipe" => Ok(def.recipe),
            _ => Err(crate::Error::ValidationFailed(format!(
                "Unknown field '{field}' in reference '${{{reference}}}' in definition of \
                 '{owner}': expected 'version' or 'recipe'"
            ))),
        }
    }
}
