// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::overlay::compose;
use crate::repository::RepoDoc;
use crate::select::select;
use crate::spec::PackageRequest;
use crate::system::System;

fn artifact(name: &str, version: &str) -> Artifact {
    let yaml = format!(
        r#"
packages:
  {name}:
    version: "{version}"
"#
    );
    let doc = RepoDoc::from_yaml(&yaml).unwrap();
    let system = System {
        arch: "x86_64".to_string(),
        os: "linux".to_string(),
    };
    let repo = compose(&doc, &[], &system).unwrap();
    let closure = select(&repo, &[PackageRequest::Name(name.to_string())]).unwrap();
    closure.get(name).unwrap().clone()
}

#[rstest]
fn test_build_creates_store_entry() {
    let tmp = TempDir::new().unwrap();
    let store = LocalStore::new(tmp.path());
    let artifact = artifact("ripgrep", "14.1.0");

    assert!(!store.has(&artifact.hash));
    let hash = store.build(&artifact).unwrap();
    assert_eq!(hash, artifact.hash);
    assert!(store.has(&artifact.hash));

    let entry = store.path_of(&artifact.hash);
    assert!(entry.join("manifest.yaml").is_file());
    assert!(entry.join("bin").is_dir());
}

#[rstest]
fn test_manifest_records_identity() {
    let tmp = TempDir::new().unwrap();
    let store = LocalStore::new(tmp.path());
    let artifact = artifact("python", "3.12.0");
    store.build(&artifact).unwrap();

    let yaml =
        std::fs::read_to_string(store.path_of(&artifact.hash).join("manifest.yaml")).unwrap();
    let manifest: StoreManifest = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(manifest.name, "python");
    assert_eq!(manifest.hash, artifact.hash.as_str());
    assert_eq!(manifest.def.version, "3.12.0");
}

#[rstest]
fn test_rebuild_is_a_no_op() {
    let tmp = TempDir::new().unwrap();
    let store = LocalStore::new(tmp.path());
    let artifact = artifact("zlib", "1.3");

    store.build(&artifact).unwrap();
    let entry = store.path_of(&artifact.hash);
    let marker = entry.join("marker");
    std::fs::write(&marker, "kept").unwrap();

    store.build(&artifact).unwrap();
    assert!(marker.is_file(), "existing entries must not be replaced");
}

#[rstest]
fn test_distinct_versions_get_distinct_entries() {
    let tmp = TempDir::new().unwrap();
    let store = LocalStore::new(tmp.path());
    let old = artifact("zlib", "1.2");
    let new = artifact("zlib", "1.3");

    store.build(&old).unwrap();
    store.build(&new).unwrap();

    assert_ne!(store.path_of(&old.hash), store.path_of(&new.hash));
    assert!(store.has(&old.hash));
    assert!(store.has(&new.hash));
}

#[rstest]
fn test_no_staging_leftovers() {
    let tmp = TempDir::new().unwrap();
    let store = LocalStore::new(tmp.path());
    store.build(&artifact("ripgrep", "14.1.0")).unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(tmp.path().join("obj"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".staging-"))
        .collect();
    assert!(leftovers.is_empty());
}
