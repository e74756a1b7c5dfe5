// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for denv operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with denv Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during environment resolution.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Input is declared but neither locked nor resolvable
    #[error("Input '{identifier}' is not locked and no fetcher is available to resolve it")]
    #[diagnostic(
        code(denv::unresolved_input),
        help("Run 'denv lock' to resolve and pin this input")
    )]
    UnresolvedInput { identifier: String },

    /// Fetch collaborator failed to retrieve a source
    #[error("Failed to fetch '{locator}': {reason}")]
    #[diagnostic(code(denv::network))]
    Network { locator: String, reason: String },

    /// Source does not exist at the given locator/revision
    #[error("Source not found: '{locator}' at revision '{revision}'")]
    #[diagnostic(code(denv::source_not_found))]
    NotFound { locator: String, revision: String },

    /// Strict self-reference while forcing the composed repository
    #[error("Reference cycle while evaluating package '{package}' in repository layer {layer}")]
    #[diagnostic(
        code(denv::overlay_cycle),
        help("Give '{package}' a definition that does not reach itself through 'final', or use 'prev' to build on the earlier definition")
    )]
    OverlayCycle { package: String, layer: usize },

    /// Requested or referenced package is absent from the repository
    #[error("Unknown package: {name}")]
    #[diagnostic(
        code(denv::unknown_package),
        help("{}", suggestion_message(similar))
    )]
    UnknownPackage {
        name: String,
        similar: Vec<String>,
    },

    /// Package spec names an extra the package does not declare
    #[error("Package '{package}' has no extra named '{extra}'")]
    #[diagnostic(
        code(denv::unknown_extra),
        help("{}", suggestion_message(similar))
    )]
    UnknownExtra {
        package: String,
        extra: String,
        similar: Vec<String>,
    },

    /// A package transitively requires itself through required edges
    #[error("Dependency cycle: {}", cycle.join(" -> "))]
    #[diagnostic(
        code(denv::dependency_cycle),
        help("Make one of the edges optional to break the cycle")
    )]
    DependencyCycle { cycle: Vec<String> },

    /// The same package name resolved to two different definitions
    #[error("Conflicting definitions for package '{name}': reached via {first} and {second}")]
    #[diagnostic(
        code(denv::version_conflict),
        help("Align the two requests so '{name}' resolves to a single definition")
    )]
    VersionConflict {
        name: String,
        first: String,
        second: String,
    },

    /// Artifact store failed to materialize an artifact
    #[error("Failed to build artifact '{name}': {reason}")]
    #[diagnostic(code(denv::build_failed))]
    Build { name: String, reason: String },

    /// Variable rule references a package missing from the closure
    #[error("Environment rule for '{variable}' references package '{package}', which is not in the closure")]
    #[diagnostic(
        code(denv::unresolved_reference),
        help("Add '{package}' to the packages list or fix the reference")
    )]
    UnresolvedReference { variable: String, package: String },

    /// Invalid YAML in a description, repository, or lock document
    #[error("Invalid document {path:?}: {error}")]
    #[diagnostic(
        code(denv::invalid_yaml),
        help("Check YAML syntax and the 'api:' version marker")
    )]
    InvalidYaml {
        path: PathBuf,
        #[source]
        error: serde_yaml::Error,
    },

    /// Failed to read a file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(denv::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Validation error
    #[error("Validation failed: {0}")]
    #[diagnostic(code(denv::validation_failed))]
    ValidationFailed(String),

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(denv::io_error))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for this error class.
    ///
    /// Each resolution failure mode maps to a distinct non-zero code so
    /// callers can tell them apart without parsing output.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::UnresolvedInput { .. } => 10,
            Error::Network { .. } => 11,
            Error::NotFound { .. } => 12,
            Error::OverlayCycle { .. } => 13,
            Error::UnknownPackage { .. } | Error::UnknownExtra { .. } => 14,
            Error::DependencyCycle { .. } => 15,
            Error::VersionConflict { .. } => 16,
            Error::Build { .. } => 17,
            Error::UnresolvedReference { .. } => 18,
            _ => 1,
        }
    }
}

fn suggestion_message(similar: &[String]) -> String {
    if similar.is_empty() {
        "Check that the name is spelled correctly".to_string()
    } else {
        format!("Did you mean one of: {}?", similar.join(", "))
    }
}
