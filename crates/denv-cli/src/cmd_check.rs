// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `denv check` command.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Verify the description resolves and matches its lock
#[derive(Debug, Args)]
pub struct CmdCheck {
    /// Description file or directory containing one
    #[clap(short = 'f', long, default_value = ".")]
    file: PathBuf,

    /// Fail when no lock file is present
    #[clap(long)]
    strict: bool,

    /// Artifact store selection flags
    #[clap(flatten)]
    store: crate::StoreFlags,
}

impl CmdCheck {
    pub fn run(&mut self) -> Result<i32> {
        let spec_path = crate::spec_path(&self.file);
        let spec = denv::EnvSpec::load(&spec_path)?;
        spec.validate()?;

        let lock = crate::load_lock(&spec_path)?;
        if lock.is_none() && self.strict {
            eprintln!("No lock file found at {:?}", crate::lock_path(&spec_path));
            return Ok(2);
        }

        if let Some(lock) = &lock {
            let changes = denv::verify_lock(lock, &spec);
            if !changes.is_empty() {
                eprintln!("Lock file is out of date:");
                for change in &changes {
                    eprintln!("  - {:?}: {}", change.kind, change.identifier);
                }
                return Ok(1);
            }
        }

        // A full dry-run resolution surfaces selection and rendering
        // problems with their diagnostic codes.
        let store = self.store.open()?;
        let fetcher = denv::PathFetcher::new(spec.base_dir());
        let resolved =
            denv::resolve_environment(&spec, lock.as_ref(), Some(&fetcher), &store)?;

        println!(
            "{} {} artifact(s), {} input(s), system {}",
            "ok:".green().bold(),
            resolved.closure.len(),
            resolved.pins.len(),
            resolved.system
        );
        Ok(0)
    }
}
