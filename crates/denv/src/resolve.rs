// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end environment resolution.
//!
//! This is the single pipeline behind the CLI: pin declared inputs,
//! load and compose the repository documents, select the requested
//! package closure, materialize every artifact, and render the
//! activation script. Each stage is pure given its inputs, so resolving
//! the same description against the same lock and store contents yields
//! the same script byte for byte.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::environment::render_script;
use crate::lock::LockFile;
use crate::overlay::compose;
use crate::registry::{self, Fetch, InputPin};
use crate::repository::RepoDoc;
use crate::select::{select, Closure};
use crate::spec::EnvSpec;
use crate::store::ArtifactStore;
use crate::system::System;

#[cfg(test)]
#[path = "./resolve_test.rs"]
mod resolve_test;

/// The outcome of resolving an environment description.
#[derive(Debug)]
pub struct ResolvedEnvironment {
    /// Target system the environment was resolved for.
    pub system: System,

    /// Resolved input pins, in identifier order.
    pub pins: BTreeMap<String, InputPin>,

    /// The selected artifact closure, in first-discovery order.
    pub closure: Closure,

    /// Store path of each closure member, by package name.
    pub paths: BTreeMap<String, PathBuf>,

    /// Rendered activation script.
    pub script: String,
}

/// Resolve a description into a materialized, renderable environment.
///
/// `lock` supplies existing pins; without a fetcher, any input missing
/// from the lock fails with [`crate::Error::UnresolvedInput`] rather
/// than resolving silently.
pub fn resolve_environment(
    spec: &EnvSpec,
    lock: Option<&LockFile>,
    fetcher: Option<&dyn Fetch>,
    store: &dyn ArtifactStore,
) -> crate::Result<ResolvedEnvironment> {
    spec.validate()?;

    let system = match &spec.system {
        Some(system) => system.clone(),
        None => System::host(),
    };
    debug!(%system, "resolving environment");

    let pins = registry::resolve_inputs(spec, lock, fetcher)?;

    let base_dir = spec.base_dir();
    let base = match &spec.base {
        Some(path) => RepoDoc::load(base_dir.join(path))?,
        None => RepoDoc::default(),
    };
    let overlays = spec
        .overlays
        .iter()
        .map(|path| RepoDoc::load(base_dir.join(path)))
        .collect::<crate::Result<Vec<_>>>()?;

    let repository = compose(&base, &overlays, &system)?;
    let closure = select(&repository, &spec.packages)?;

    let mut paths = BTreeMap::new();
    for artifact in &closure {
        let hash = store.build(artifact)?;
        paths.insert(artifact.name.clone(), store.path_of(&hash));
    }
    debug!(artifacts = closure.len(), "closure materialized");

    let script = render_script(&spec.environment, &paths, spec.hook.as_deref())?;

    Ok(ResolvedEnvironment {
        system,
        pins,
        closure,
        paths,
        script,
    })
}
