// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Input pin resolution against the lock record.
//!
//! A pin already present in the lock is returned unchanged, so repeated
//! resolutions see identical inputs until an explicit update. Fresh pins
//! come from an injected [`Fetch`] collaborator; without one, unlocked
//! inputs fail with [`crate::Error::UnresolvedInput`]. Declared `latest`
//! revisions are never re-resolved implicitly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::lock::LockFile;
use crate::spec::{EnvSpec, InputDecl};

#[cfg(test)]
#[path = "./registry_test.rs"]
mod registry_test;

/// Revision marker for floating inputs.
pub const LATEST_REVISION: &str = "latest";

/// A resolved, immutable input pin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InputPin {
    pub identifier: String,
    pub locator: String,
    pub revision: String,
    pub sha256: String,
}

/// Fetch collaborator: resolves a locator + revision to a content hash.
///
/// Network retrieval is outside the resolver core; implementations may
/// impose their own timeout policy and report failures as
/// [`crate::Error::Network`] or [`crate::Error::NotFound`].
pub trait Fetch {
    fn fetch(&self, locator: &str, revision: &str) -> crate::Result<String>;
}

/// Resolve one declared input against its lock entry.
///
/// An existing pin wins as long as it still matches the declaration
/// (same locator, and same revision unless the declaration floats on
/// `latest`). Anything else requires the fetch collaborator.
pub fn resolve(
    identifier: &str,
    declared: &InputDecl,
    locked: Option<&InputPin>,
    fetcher: Option<&dyn Fetch>,
) -> crate::Result<InputPin> {
    if let Some(pin) = locked {
        if pin_matches(declared, pin) {
            debug!(identifier, revision = %pin.revision, "input already locked");
            return Ok(pin.clone());
        }
        debug!(identifier, "lock entry no longer matches declaration");
    }

    let fetcher = fetcher.ok_or_else(|| crate::Error::UnresolvedInput {
        identifier: identifier.to_string(),
    })?;

    let revision = declared
        .rev
        .clone()
        .unwrap_or_else(|| LATEST_REVISION.to_string());
    let sha256 = fetcher.fetch(&declared.url, &revision)?;
    debug!(identifier, %revision, sha256 = %sha256, "input pinned");

    Ok(InputPin {
        identifier: identifier.to_string(),
        locator: declared.url.clone(),
        revision,
        sha256,
    })
}

/// Resolve every input declared by the description, in identifier order.
pub fn resolve_inputs(
    spec: &EnvSpec,
    lock: Option<&LockFile>,
    fetcher: Option<&dyn Fetch>,
) -> crate::Result<BTreeMap<String, InputPin>> {
    let mut pins = BTreeMap::new();
    for (identifier, declared) in &spec.inputs {
        let locked = lock.and_then(|l| l.get(identifier));
        let pin = resolve(identifier, declared, locked, fetcher)?;
        pins.insert(identifier.clone(), pin);
    }
    Ok(pins)
}

/// Whether a locked pin still satisfies the declaration.
pub(crate) fn pin_matches(declared: &InputDecl, pin: &InputPin) -> bool {
    if pin.locator != declared.url {
        return false;
    }
    match declared.rev.as_deref() {
        Some(rev) if rev != LATEST_REVISION => pin.revision == rev,
        // Floating declarations accept whatever revision was pinned.
        _ => true,
    }
}

/// Fetcher for local sources: hashes the contents of a directory named
/// by a `path:` locator (or a plain filesystem path). Remote locators
/// need a network collaborator and are rejected here.
pub struct PathFetcher {
    base: PathBuf,
}

impl PathFetcher {
    /// `base` anchors relative locators, typically the description's
    /// directory.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve_locator(&self, locator: &str) -> crate::Result<PathBuf> {
        let raw = locator.strip_prefix("path:").unwrap_or(locator);

        let path = if let Some(rest) = raw.strip_prefix("~/") {
            let home = dirs::home_dir().ok_or_else(|| {
                crate::Error::ValidationFailed("Cannot resolve ~ without HOME".to_string())
            })?;
            home.join(rest)
        } else if Path::new(raw).is_absolute() {
            PathBuf::from(raw)
        } else {
            self.base.join(raw)
        };

        dunce::canonicalize(&path).map_err(|_| crate::Error::NotFound {
            locator: locator.to_string(),
            revision: String::new(),
        })
    }
}

impl Fetch for PathFetcher {
    fn fetch(&self, locator: &str, revision: &str) -> crate::Result<String> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return Err(crate::Error::Network {
                locator: locator.to_string(),
                reason: "no network fetcher is configured for remote sources".to_string(),
            });
        }

        let root = self.resolve_locator(locator).map_err(|err| match err {
            crate::Error::NotFound { locator, .. } => crate::Error::NotFound {
                locator,
                revision: revision.to_string(),
            },
            other => other,
        })?;

        let mut hasher = Sha256::new();
        hash_tree(&mut hasher, &root, &root)?;
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Hash a directory tree: relative paths and file contents, in sorted
/// order, so the result is stable across filesystems.
fn hash_tree(hasher: &mut Sha256, root: &Path, dir: &Path) -> crate::Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let rel = path.strip_prefix(root).unwrap_or(&path);
        if path.is_dir() {
            hash_tree(hasher, root, &path)?;
        } else {
            hasher.update(rel.to_string_lossy().as_bytes());
            hasher.update([0]);
            hasher.update(&std::fs::read(&path)?);
            hasher.update([0]);
        }
    }
    Ok(())
}
