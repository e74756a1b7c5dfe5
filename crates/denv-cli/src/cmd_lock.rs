// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Generate or update lock files for denv environments.

use std::path::PathBuf;

use clap::Args;
use miette::Result;

/// Generate or update the lock file
#[derive(Debug, Args)]
pub struct CmdLock {
    /// Description file or directory containing one
    #[clap(short = 'f', long, default_value = ".")]
    file: PathBuf,

    /// Re-resolve every input, moving floating revisions
    #[clap(long)]
    update: bool,

    /// Force regeneration even if a lock exists
    #[clap(long)]
    force: bool,

    /// Verify the lock is current (exit 1 if not, 2 if missing)
    #[clap(long)]
    check: bool,
}

impl CmdLock {
    pub fn run(&mut self) -> Result<i32> {
        let spec_path = crate::spec_path(&self.file);
        let spec = denv::EnvSpec::load(&spec_path)?;
        spec.validate()?;

        let lock_path = crate::lock_path(&spec_path);

        if self.check {
            // Verify mode
            if !lock_path.exists() {
                eprintln!("No lock file found at {:?}", lock_path);
                return Ok(2);
            }

            let lock = denv::LockFile::load(&lock_path)?;
            let changes = denv::verify_lock(&lock, &spec);

            if !changes.is_empty() {
                eprintln!("Lock file is out of date:");
                for change in &changes {
                    eprintln!("  - {:?}: {}", change.kind, change.identifier);
                }
                return Ok(1);
            }

            println!("Lock file is up to date");
            return Ok(0);
        }

        // Generate / update mode
        if lock_path.exists() && !self.update && !self.force {
            return Err(miette::miette!(
                "Lock file already exists at {:?}. Use --update or --force",
                lock_path
            ));
        }

        let previous = crate::load_lock(&spec_path)?;
        let fetcher = denv::PathFetcher::new(spec.base_dir());
        let lock = denv::generate_lock(&spec, previous.as_ref(), Some(&fetcher), self.update)?;
        lock.write(&lock_path)?;
        println!("Generated lock file: {:?}", lock_path);

        Ok(0)
    }
}
