// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Content-addressed artifact storage.
//!
//! Artifacts live under `<root>/obj/<hash>/`; the hash already encodes
//! the definition, target system, and dependency identities, so a store
//! entry never needs rebuilding. Builds stage into a temporary directory
//! and move into place with a single rename, which keeps concurrent
//! builders safe: the losing racer finds the destination populated and
//! discards its staging copy.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::repository::PackageDef;
use crate::select::{Artifact, ArtifactHash};

#[cfg(test)]
#[path = "./store_test.rs"]
mod store_test;

/// Name of the metadata file written inside every store entry.
const MANIFEST_FILENAME: &str = "manifest.yaml";

/// Storage backend for built artifacts.
pub trait ArtifactStore {
    /// Whether an artifact with this hash is already materialized.
    fn has(&self, hash: &ArtifactHash) -> bool;

    /// Filesystem path of the artifact's store entry. The path is
    /// well-defined whether or not the entry exists yet.
    fn path_of(&self, hash: &ArtifactHash) -> PathBuf;

    /// Materialize the artifact, returning its hash. Must be a no-op
    /// when the entry already exists.
    fn build(&self, artifact: &Artifact) -> crate::Result<ArtifactHash>;
}

/// Metadata recorded alongside each store entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreManifest {
    pub name: String,
    pub hash: String,
    pub def: PackageDef,
}

/// Filesystem-backed store rooted at a single directory.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default store location under the user's local data directory.
    pub fn default_root() -> crate::Result<PathBuf> {
        let data = dirs::data_local_dir().ok_or_else(|| {
            crate::Error::ValidationFailed(
                "Cannot determine a local data directory for the artifact store".to_string(),
            )
        })?;
        Ok(data.join("denv").join("store"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn objects_dir(&self) -> PathBuf {
        self.root.join("obj")
    }
}

impl ArtifactStore for LocalStore {
    fn has(&self, hash: &ArtifactHash) -> bool {
        self.path_of(hash).is_dir()
    }

    fn path_of(&self, hash: &ArtifactHash) -> PathBuf {
        self.objects_dir().join(hash.as_str())
    }

    fn build(&self, artifact: &Artifact) -> crate::Result<ArtifactHash> {
        let dest = self.path_of(&artifact.hash);
        if dest.is_dir() {
            debug!(name = %artifact.name, hash = %artifact.hash.short(), "store hit");
            return Ok(artifact.hash.clone());
        }

        let objects = self.objects_dir();
        std::fs::create_dir_all(&objects).map_err(|e| build_error(&artifact.name, &e))?;

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&objects)
            .map_err(|e| build_error(&artifact.name, &e))?;

        let manifest = StoreManifest {
            name: artifact.name.clone(),
            hash: artifact.hash.as_str().to_string(),
            def: artifact.def.clone(),
        };
        let yaml = serde_yaml::to_string(&manifest).map_err(|e| crate::Error::Build {
            name: artifact.name.clone(),
            reason: format!("Failed to serialize manifest: {e}"),
        })?;
        std::fs::write(staging.path().join(MANIFEST_FILENAME), yaml)
            .map_err(|e| build_error(&artifact.name, &e))?;
        std::fs::create_dir(staging.path().join("bin"))
            .map_err(|e| build_error(&artifact.name, &e))?;

        match std::fs::rename(staging.path(), &dest) {
            Ok(()) => {
                // Renamed into place: don't let TempDir delete the entry.
                std::mem::forget(staging);
                debug!(name = %artifact.name, hash = %artifact.hash.short(), "artifact built");
                Ok(artifact.hash.clone())
            }
            Err(_) if dest.is_dir() => {
                // A concurrent builder won the race; its entry has the
                // same hash and therefore the same content.
                debug!(name = %artifact.name, "concurrent build won the race");
                Ok(artifact.hash.clone())
            }
            Err(e) => Err(build_error(&artifact.name, &e)),
        }
    }
}

fn build_error(name: &str, err: &dyn std::fmt::Display) -> crate::Error {
    crate::Error::Build {
        name: name.to_string(),
        reason: err.to_string(),
    }
}
