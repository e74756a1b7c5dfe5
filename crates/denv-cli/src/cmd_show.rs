// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `denv show` command.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Display the environment description and its closure
#[derive(Debug, Args)]
pub struct CmdShow {
    /// Description file or directory containing one
    #[clap(short = 'f', long, default_value = ".")]
    file: PathBuf,

    /// Resolve and show the full package closure
    #[clap(long)]
    closure: bool,

    /// Output format: table, yaml
    #[clap(long, default_value = "table")]
    format: String,

    /// Artifact store selection flags
    #[clap(flatten)]
    store: crate::StoreFlags,
}

impl CmdShow {
    pub fn run(&mut self) -> Result<i32> {
        let spec_path = crate::spec_path(&self.file);
        let spec = denv::EnvSpec::load(&spec_path)?;
        spec.validate()?;

        if self.format == "yaml" {
            let yaml = serde_yaml::to_string(&spec)
                .map_err(|e| miette::miette!("Failed to serialize description: {e}"))?;
            print!("{yaml}");
            if self.closure {
                self.show_closure_yaml(&spec_path, &spec)?;
            }
            return Ok(0);
        }

        self.show_description_table(&spec_path, &spec);
        if self.closure {
            println!();
            self.show_closure_table(&spec_path, &spec)?;
        }

        Ok(0)
    }

    fn show_description_table(&self, spec_path: &std::path::Path, spec: &denv::EnvSpec) {
        println!("{}", "Environment Description:".bold());
        println!();
        println!("  file: {}", spec_path.display().to_string().cyan());
        if let Some(desc) = &spec.description {
            println!("  description: {}", desc.dimmed());
        }
        let system = spec
            .system
            .clone()
            .unwrap_or_else(denv::System::host);
        println!("  system: {}", system.to_string().green());

        if !spec.inputs.is_empty() {
            println!();
            println!("{}", "Inputs:".bold());
            for (identifier, decl) in &spec.inputs {
                let rev = decl.rev.as_deref().unwrap_or("latest");
                println!("  {} -> {} @ {}", identifier.cyan(), decl.url, rev.yellow());
            }
        }

        if !spec.packages.is_empty() {
            println!();
            println!("{}", "Requested Packages:".bold());
            for request in &spec.packages {
                println!("  - {}", request.to_string().green());
            }
        }

        if !spec.environment.is_empty() {
            println!();
            println!("{}", "Environment Variables:".bold());
            for (i, op) in spec.environment.iter().enumerate() {
                match op {
                    denv::EnvOp::Set(s) => {
                        println!("  {}. {} = {}", i + 1, s.set.cyan(), s.value.green());
                    }
                    denv::EnvOp::Prepend(p) => {
                        println!(
                            "  {}. {} = {} + ${}",
                            i + 1,
                            p.prepend.cyan(),
                            p.value.green(),
                            p.prepend
                        );
                    }
                    denv::EnvOp::Append(a) => {
                        println!(
                            "  {}. {} = ${} + {}",
                            i + 1,
                            a.append.cyan(),
                            a.append,
                            a.value.green()
                        );
                    }
                    denv::EnvOp::Comment(c) => {
                        println!("  # {}", c.comment.dimmed());
                    }
                }
            }
        }
    }

    fn resolve(
        &self,
        spec_path: &std::path::Path,
        spec: &denv::EnvSpec,
    ) -> Result<denv::ResolvedEnvironment> {
        let store = self.store.open()?;
        let lock = crate::load_lock(spec_path)?;
        let base_dir = spec.base_dir();
        let fetcher = denv::PathFetcher::new(base_dir);
        Ok(denv::resolve_environment(
            spec,
            lock.as_ref(),
            Some(&fetcher),
            &store,
        )?)
    }

    fn show_closure_table(&self, spec_path: &std::path::Path, spec: &denv::EnvSpec) -> Result<()> {
        let resolved = self.resolve(spec_path, spec)?;

        println!("{}", "Package Closure:".bold());
        println!();
        if resolved.closure.is_empty() {
            println!("  {}", "(no packages)".dimmed());
        }
        for artifact in &resolved.closure {
            println!(
                "  {} {} {}",
                artifact.hash.short().yellow(),
                artifact.name.cyan(),
                artifact.def.version.green()
            );
        }
        println!();
        println!("Total: {} artifact(s)", resolved.closure.len());
        Ok(())
    }

    fn show_closure_yaml(&self, spec_path: &std::path::Path, spec: &denv::EnvSpec) -> Result<()> {
        let resolved = self.resolve(spec_path, spec)?;

        println!();
        println!("# Resolved Closure:");
        println!("closure:");
        for artifact in &resolved.closure {
            println!("  - name: {}", artifact.name);
            println!("    version: {}", artifact.def.version);
            println!("    hash: {}", artifact.hash);
        }
        Ok(())
    }
}
