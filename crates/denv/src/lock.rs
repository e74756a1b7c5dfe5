// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Lock file structures and helpers.
//!
//! The lock maps input identifiers to resolved pins. Serialization is
//! stable: identifiers are kept in a sorted map and no volatile metadata
//! (timestamps, hostnames) is recorded, so re-resolving an unchanged
//! description reproduces the lock byte for byte.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::registry::{self, Fetch, InputPin};
use crate::spec::EnvSpec;

#[cfg(test)]
#[path = "./lock_test.rs"]
mod lock_test;

/// Lock file API version.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub enum LockApiVersion {
    #[serde(rename = "denv/v0/lock")]
    V0,
}

/// Lock file capturing resolved input pins.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LockFile {
    pub api: LockApiVersion,
    pub inputs: BTreeMap<String, InputPin>,
}

impl LockFile {
    pub fn new(inputs: BTreeMap<String, InputPin>) -> Self {
        Self {
            api: LockApiVersion::V0,
            inputs,
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&InputPin> {
        self.inputs.get(identifier)
    }

    /// Parse a lock file from YAML.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| crate::Error::InvalidYaml {
            path: PathBuf::from("<inline>"),
            error: e,
        })
    }

    /// Load a lock file from a path.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        serde_yaml::from_str(&yaml).map_err(|e| crate::Error::InvalidYaml {
            path: path.to_path_buf(),
            error: e,
        })
    }

    /// Serialize with stable ordering.
    pub fn to_yaml(&self) -> crate::Result<String> {
        serde_yaml::to_string(self).map_err(|e| crate::Error::InvalidYaml {
            path: PathBuf::from("<lock>"),
            error: e,
        })
    }

    /// Write the lock to a path, atomically replacing any previous file.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        let yaml = self.to_yaml()?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, yaml)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Generate a lock for the description.
///
/// Pins from `previous` are reused when they still match the
/// declaration; with `update` set, every input is re-resolved through
/// the fetcher (the only path that moves a `latest` revision). Inputs
/// no longer declared simply drop out of the new lock.
pub fn generate_lock(
    spec: &EnvSpec,
    previous: Option<&LockFile>,
    fetcher: Option<&dyn Fetch>,
    update: bool,
) -> crate::Result<LockFile> {
    let mut inputs = BTreeMap::new();
    for (identifier, declared) in &spec.inputs {
        let locked = if update {
            None
        } else {
            previous.and_then(|lock| lock.get(identifier))
        };
        let pin = registry::resolve(identifier, declared, locked, fetcher)?;
        inputs.insert(identifier.clone(), pin);
    }
    Ok(LockFile::new(inputs))
}

/// Verify a lock file against the current description.
///
/// This is a structural comparison of declarations and pins; content
/// re-hashing happens on `generate_lock` with `update` set.
pub fn verify_lock(lock: &LockFile, spec: &EnvSpec) -> Vec<LockChange> {
    let mut changes = Vec::new();

    for (identifier, declared) in &spec.inputs {
        match lock.get(identifier) {
            None => changes.push(LockChange {
                kind: LockChangeKind::InputAdded,
                identifier: identifier.clone(),
                expected: None,
                actual: Some(declared.url.clone()),
            }),
            Some(pin) => {
                if pin.locator != declared.url {
                    changes.push(LockChange {
                        kind: LockChangeKind::LocatorChanged,
                        identifier: identifier.clone(),
                        expected: Some(pin.locator.clone()),
                        actual: Some(declared.url.clone()),
                    });
                } else if !registry::pin_matches(declared, pin) {
                    changes.push(LockChange {
                        kind: LockChangeKind::RevisionChanged,
                        identifier: identifier.clone(),
                        expected: Some(pin.revision.clone()),
                        actual: declared.rev.clone(),
                    });
                }
            }
        }
    }

    for identifier in lock.inputs.keys() {
        if !spec.inputs.contains_key(identifier) {
            changes.push(LockChange {
                kind: LockChangeKind::InputRemoved,
                identifier: identifier.clone(),
                expected: Some(identifier.clone()),
                actual: None,
            });
        }
    }

    changes
}

/// A single detected difference between lock and description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockChange {
    pub kind: LockChangeKind,
    pub identifier: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

/// Types of lock mismatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockChangeKind {
    InputAdded,
    InputRemoved,
    LocatorChanged,
    RevisionChanged,
}
