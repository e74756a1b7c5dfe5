// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `denv render` command.

use std::path::PathBuf;

use clap::Args;
use miette::Result;

/// Render the activation script
#[derive(Debug, Args)]
pub struct CmdRender {
    /// Description file or directory containing one
    #[clap(short = 'f', long, default_value = ".")]
    file: PathBuf,

    /// Write the script to FILE instead of stdout
    #[clap(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Resolve strictly from the lock, without touching sources
    #[clap(long)]
    locked: bool,

    /// Artifact store selection flags
    #[clap(flatten)]
    store: crate::StoreFlags,
}

impl CmdRender {
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

        match &self.output {
            Some(path) => {
                std::fs::write(path, &resolved.script)
                    .map_err(|e| miette::miette!("Failed to write script to {:?}: {e}", path))?;
                eprintln!("Wrote activation script to {:?}", path);
            }
            None => print!("{}", resolved.script),
        }

        Ok(0)
    }
}
