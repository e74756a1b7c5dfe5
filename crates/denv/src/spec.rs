// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Environment description parsing and data types for `.denv.yaml` files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::environment::EnvOp;
use crate::system::System;

#[cfg(test)]
#[path = "./spec_test.rs"]
mod spec_test;

/// API version for description files.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub enum ApiVersion {
    #[serde(rename = "denv/v0")]
    V0,
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::V0
    }
}

/// Helper for two-stage deserialization to determine API version first.
#[derive(Deserialize)]
struct ApiVersionMapping {
    #[serde(default)]
    api: ApiVersion,
}

/// A declared input source, pinned during lock resolution.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InputDecl {
    /// Source locator (repository URL or `path:` locator).
    pub url: String,

    /// Declared revision; defaults to "latest", which is only ever
    /// re-resolved on explicit update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
}

/// A requested package, either a bare name or a configured request.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PackageRequest {
    Name(String),
    Configured(ConfiguredRequest),
}

/// A package request with sub-selection configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ConfiguredRequest {
    pub name: String,

    /// Extras to enable on the package (see `PackageDef::extras`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
}

impl PackageRequest {
    pub fn name(&self) -> &str {
        match self {
            PackageRequest::Name(name) => name,
            PackageRequest::Configured(req) => &req.name,
        }
    }

    pub fn extras(&self) -> &[String] {
        match self {
            PackageRequest::Name(_) => &[],
            PackageRequest::Configured(req) => &req.extras,
        }
    }
}

impl std::fmt::Display for PackageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageRequest::Name(name) => write!(f, "{name}"),
            PackageRequest::Configured(req) => {
                if req.extras.is_empty() {
                    write!(f, "{}", req.name)
                } else {
                    write!(f, "{}[{}]", req.name, req.extras.join(","))
                }
            }
        }
    }
}

/// Main environment description from a `.denv.yaml` file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnvSpec {
    /// API version identifier.
    pub api: ApiVersion,

    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Target system; defaults to the host system when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<System>,

    /// Named input sources to pin (identifier -> declaration).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, InputDecl>,

    /// Base repository document, relative to this file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<PathBuf>,

    /// Ordered overlay documents applied over the base repository.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlays: Vec<PathBuf>,

    /// Requested packages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<PackageRequest>,

    /// Environment variable rules, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<EnvOp>,

    /// Free-form hook body appended verbatim to the activation script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl EnvSpec {
    /// Parse a description from YAML.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> crate::Result<Self> {
        let yaml = yaml.into();

        // Stage 1: Parse to get API version
        let value: serde_yaml::Value =
            serde_yaml::from_str(&yaml).map_err(|e| crate::Error::InvalidYaml {
                path: PathBuf::from("<inline>"),
                error: e,
            })?;

        let with_version: ApiVersionMapping =
            serde_yaml::from_value(value.clone()).map_err(|e| crate::Error::InvalidYaml {
                path: PathBuf::from("<inline>"),
                error: e,
            })?;

        // Stage 2: Deserialize based on version
        match with_version.api {
            ApiVersion::V0 => {
                serde_yaml::from_value(value).map_err(|e| crate::Error::InvalidYaml {
                    path: PathBuf::from("<inline>"),
                    error: e,
                })
            }
        }
    }

    /// Load a description from a file path.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;

        let mut spec = Self::from_yaml(yaml)?;
        spec.source_path = Some(path.to_path_buf());
        Ok(spec)
    }

    /// Directory containing this description, for resolving relative paths.
    pub fn base_dir(&self) -> PathBuf {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Validate the description after loading.
    pub fn validate(&self) -> crate::Result<()> {
        for request in &self.packages {
            if request.name().is_empty() {
                return Err(crate::Error::ValidationFailed(
                    "Package requests must have a non-empty name".to_string(),
                ));
            }
        }

        for (identifier, decl) in &self.inputs {
            if decl.url.is_empty() {
                return Err(crate::Error::ValidationFailed(format!(
                    "Input '{identifier}' must declare a locator url"
                )));
            }
        }

        if !self.packages.is_empty() && self.base.is_none() && self.overlays.is_empty() {
            return Err(crate::Error::ValidationFailed(
                "Packages are requested but no base repository or overlays are declared"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for EnvSpec {
    fn default() -> Self {
        Self {
            api: ApiVersion::default(),
            description: None,
            system: None,
            inputs: BTreeMap::new(),
            base: None,
            overlays: Vec::new(),
            packages: Vec::new(),
            environment: Vec::new(),
            hook: None,
            source_path: None,
        }
    }
}
