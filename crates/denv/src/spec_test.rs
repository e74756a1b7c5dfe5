// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

#[rstest]
fn test_parse_minimal_spec() {
    let yaml = r#"
api: denv/v0
"#;
    let spec = EnvSpec::from_yaml(yaml).expect("Should parse minimal spec");
    assert_eq!(spec.api, ApiVersion::V0);
    assert!(spec.inputs.is_empty());
    assert!(spec.packages.is_empty());
    assert!(spec.base.is_none());
}

#[rstest]
fn test_parse_full_spec() {
    let yaml = r#"
api: denv/v0
description: "Test environment"
system: x86_64-linux
inputs:
  pkgs:
    url: https://example.com/pkgs.git
    rev: abc123
  tools:
    url: path:./tools
base: ./packages.yaml
overlays:
  - ./overlays/rust.yaml
  - ./overlays/local.yaml
packages:
  - ripgrep
  - name: python
    extras: [numpy]
environment:
  - set: PROJECT_ROOT
    value: /work
  - prepend: PATH
    value: ${pkg:ripgrep}/bin
hook: |
  echo ready
"#;
    let spec = EnvSpec::from_yaml(yaml).expect("Should parse full spec");
    assert_eq!(spec.description, Some("Test environment".to_string()));
    assert_eq!(spec.system.as_ref().unwrap().to_string(), "x86_64-linux");
    assert_eq!(spec.inputs.len(), 2);
    assert_eq!(spec.inputs["pkgs"].rev.as_deref(), Some("abc123"));
    assert!(spec.inputs["tools"].rev.is_none());
    assert_eq!(spec.base.as_deref(), Some(std::path::Path::new("./packages.yaml")));
    assert_eq!(spec.overlays.len(), 2);
    assert_eq!(spec.packages.len(), 2);
    assert_eq!(spec.environment.len(), 2);
    assert_eq!(spec.hook.as_deref(), Some("echo ready\n"));
}

#[rstest]
fn test_package_request_forms() {
    let yaml = r#"
api: denv/v0
base: ./packages.yaml
packages:
  - ripgrep
  - name: python
    extras: [numpy, requests]
"#;
    let spec = EnvSpec::from_yaml(yaml).expect("Should parse package requests");

    assert_eq!(spec.packages[0].name(), "ripgrep");
    assert!(spec.packages[0].extras().is_empty());

    assert_eq!(spec.packages[1].name(), "python");
    assert_eq!(spec.packages[1].extras(), ["numpy", "requests"]);
    assert_eq!(spec.packages[1].to_string(), "python[numpy,requests]");
}

#[rstest]
fn test_unknown_api_version_rejected() {
    let yaml = r#"
api: denv/v999
"#;
    assert!(EnvSpec::from_yaml(yaml).is_err());
}

#[rstest]
fn test_parse_invalid_yaml() {
    let yaml = r#"
api: denv/v0
packages: [
  unclosed bracket
"#;
    assert!(EnvSpec::from_yaml(yaml).is_err());
}

#[rstest]
fn test_validate_rejects_empty_input_url() {
    let yaml = r#"
api: denv/v0
inputs:
  pkgs:
    url: ""
"#;
    let spec = EnvSpec::from_yaml(yaml).unwrap();
    assert!(spec.validate().is_err());
}

#[rstest]
fn test_validate_requires_repository_for_packages() {
    let yaml = r#"
api: denv/v0
packages:
  - ripgrep
"#;
    let spec = EnvSpec::from_yaml(yaml).unwrap();
    assert!(spec.validate().is_err());
}

#[rstest]
fn test_default_spec() {
    let spec = EnvSpec::default();
    assert_eq!(spec.api, ApiVersion::V0);
    assert!(spec.inputs.is_empty());
    assert!(spec.overlays.is_empty());
    assert!(spec.packages.is_empty());
    assert!(spec.hook.is_none());
    assert!(spec.source_path.is_none());
}
