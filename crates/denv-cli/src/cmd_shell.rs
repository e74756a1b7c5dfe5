// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `denv shell` command.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use miette::Result;

/// Enter an interactive shell in the environment
#[derive(Debug, Args)]
pub struct CmdShell {
    /// Description file or directory containing one
    #[clap(short = 'f', long, default_value = ".")]
    file: PathBuf,

    /// Shell to use
    #[clap(long)]
    shell: Option<String>,

    /// Resolve strictly from the lock, without touching sources
    #[clap(long)]
    locked: bool,

    /// Artifact store selection flags
    #[clap(flatten)]
    store: crate::StoreFlags,
}

impl CmdShell {
    pub fn run(&mut self) -> Result<i32> {
        let spec_path = crate::spec_path(&self.file);
        let spec = denv::EnvSpec::load(&spec_path)?;
        spec.validate()?;

        let store = self.store.open()?;
        let lock = crate::load_lock(&spec_path)?;

        let fetcher;
        let fetcher_ref: Option<&dyn denv::Fetch> = if self.locked {
            None
        } else {
            fetcher = denv::PathFetcher::new(spec.base_dir());
            Some(&fetcher)
        };

        let resolved = denv::resolve_environment(&spec, lock.as_ref(), fetcher_ref, &store)?;

        // Keep the script alive for the lifetime of the child shell.
        let mut script = tempfile::Builder::new()
            .prefix("denv-activate-")
            .suffix(".sh")
            .tempfile()
            .map_err(|e| miette::miette!("Failed to create activation script: {e}"))?;
        script
            .write_all(resolved.script.as_bytes())
            .map_err(|e| miette::miette!("Failed to write activation script: {e}"))?;

        let shell = self
            .shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| "/bin/bash".to_string());

        tracing::info!(%shell, "entering environment shell");
        let status = std::process::Command::new(&shell)
            .arg("-c")
            .arg(format!(
                ". {} && exec {} -i",
                script.path().display(),
                shell
            ))
            .status()
            .map_err(|e| miette::miette!("Failed to start shell {shell:?}: {e}"))?;

        Ok(status.code().unwrap_or(1))
    }
}
