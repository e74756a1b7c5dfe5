// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Declarative, reproducible development environments.
//!
//! A `.denv.yaml` description names input sources, a base package
//! repository with optional overlays, a set of requested packages, and
//! environment variable rules. Resolution pins the inputs against a
//! lock file, composes the repository, expands the package closure,
//! materializes artifacts into a content-addressed store, and renders a
//! shell activation script. Given the same description, lock, and store
//! contents, the output is identical byte for byte.

pub mod environment;
pub mod error;
pub mod lock;
pub mod overlay;
pub mod registry;
pub mod repository;
pub mod resolve;
pub mod select;
pub mod spec;
pub mod store;
pub mod system;

pub use environment::{EnvOp, render_script};
pub use error::{Error, Result};
pub use lock::{generate_lock, verify_lock, LockChange, LockChangeKind, LockFile};
pub use overlay::compose;
pub use registry::{Fetch, InputPin, PathFetcher};
pub use repository::{PackageDef, RepoDoc, Repository};
pub use resolve::{resolve_environment, ResolvedEnvironment};
pub use select::{select, Artifact, ArtifactHash, Closure};
pub use spec::{EnvSpec, InputDecl, PackageRequest};
pub use store::{ArtifactStore, LocalStore};
pub use system::System;

/// Default file name for environment descriptions.
pub const DENV_FILENAME: &str = ".denv.yaml";

/// Default file name for the lock recorded next to a description.
pub const DENV_LOCK_FILENAME: &str = ".denv.lock.yaml";
