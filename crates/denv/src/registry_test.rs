// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

use std::cell::Cell;

use rstest::rstest;
use tempfile::TempDir;

use super::*;

/// Test double that counts invocations and returns a fixed hash.
struct CountingFetch {
    calls: Cell<usize>,
    hash: String,
}

impl CountingFetch {
    fn new(hash: &str) -> Self {
        Self {
            calls: Cell::new(0),
            hash: hash.to_string(),
        }
    }
}

impl Fetch for CountingFetch {
    fn fetch(&self, _locator: &str, _revision: &str) -> crate::Result<String> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.hash.clone())
    }
}

fn decl(url: &str, rev: Option<&str>) -> InputDecl {
    InputDecl {
        url: url.to_string(),
        rev: rev.map(String::from),
    }
}

#[rstest]
fn test_locked_pin_returned_unchanged() {
    let pin = InputPin {
        identifier: "pkgs".to_string(),
        locator: "https://example.com/pkgs.git".to_string(),
        revision: "abc123".to_string(),
        sha256: "deadbeef".to_string(),
    };
    let fetcher = CountingFetch::new("other");

    let resolved = resolve(
        "pkgs",
        &decl("https://example.com/pkgs.git", Some("abc123")),
        Some(&pin),
        Some(&fetcher),
    )
    .unwrap();

    assert_eq!(resolved, pin);
    assert_eq!(fetcher.calls.get(), 0, "locked inputs must not refetch");
}

#[rstest]
fn test_latest_is_not_reresolved_implicitly() {
    let pin = InputPin {
        identifier: "pkgs".to_string(),
        locator: "https://example.com/pkgs.git".to_string(),
        revision: "abc123".to_string(),
        sha256: "deadbeef".to_string(),
    };
    let fetcher = CountingFetch::new("other");

    // Declaration floats on latest; the pinned revision still wins.
    let resolved = resolve(
        "pkgs",
        &decl("https://example.com/pkgs.git", None),
        Some(&pin),
        Some(&fetcher),
    )
    .unwrap();

    assert_eq!(resolved.revision, "abc123");
    assert_eq!(fetcher.calls.get(), 0);
}

#[rstest]
fn test_changed_locator_invalidates_pin() {
    let pin = InputPin {
        identifier: "pkgs".to_string(),
        locator: "https://old.example.com/pkgs.git".to_string(),
        revision: "abc123".to_string(),
        sha256: "deadbeef".to_string(),
    };
    let fetcher = CountingFetch::new("fresh");

    let resolved = resolve(
        "pkgs",
        &decl("https://new.example.com/pkgs.git", Some("abc123")),
        Some(&pin),
        Some(&fetcher),
    )
    .unwrap();

    assert_eq!(resolved.locator, "https://new.example.com/pkgs.git");
    assert_eq!(resolved.sha256, "fresh");
    assert_eq!(fetcher.calls.get(), 1);
}

#[rstest]
fn test_unlocked_without_fetcher_fails() {
    let err = resolve(
        "pkgs",
        &decl("https://example.com/pkgs.git", None),
        None,
        None,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        crate::Error::UnresolvedInput { ref identifier } if identifier == "pkgs"
    ));
}

#[rstest]
fn test_fresh_pin_defaults_to_latest() {
    let fetcher = CountingFetch::new("cafebabe");
    let pin = resolve(
        "pkgs",
        &decl("https://example.com/pkgs.git", None),
        None,
        Some(&fetcher),
    )
    .unwrap();

    assert_eq!(pin.revision, LATEST_REVISION);
    assert_eq!(pin.sha256, "cafebabe");
}

#[rstest]
fn test_path_fetcher_hashes_directory() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("a.txt"), "hello").unwrap();
    std::fs::create_dir(tmp.path().join("sub")).unwrap();
    std::fs::write(tmp.path().join("sub/b.txt"), "world").unwrap();

    let fetcher = PathFetcher::new(tmp.path());
    let first = fetcher.fetch("path:.", "latest").unwrap();
    let second = fetcher.fetch("path:.", "latest").unwrap();
    assert_eq!(first, second, "tree hash must be stable");

    std::fs::write(tmp.path().join("a.txt"), "changed").unwrap();
    let third = fetcher.fetch("path:.", "latest").unwrap();
    assert_ne!(first, third, "content change must change the hash");
}

#[rstest]
fn test_path_fetcher_missing_directory() {
    let tmp = TempDir::new().unwrap();
    let fetcher = PathFetcher::new(tmp.path());

    let err = fetcher.fetch("path:./nope", "latest").unwrap_err();
    assert!(matches!(err, crate::Error::NotFound { .. }));
}

#[rstest]
fn test_path_fetcher_rejects_remote_urls() {
    let tmp = TempDir::new().unwrap();
    let fetcher = PathFetcher::new(tmp.path());

    let err = fetcher
        .fetch("https://example.com/pkgs.git", "latest")
        .unwrap_err();
    assert!(matches!(err, crate::Error::Network { .. }));
}
