// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `denv init` command.

use clap::Args;
use miette::Result;
use std::path::PathBuf;

/// Create a new .denv.yaml file
#[derive(Debug, Args)]
pub struct CmdInit {
    /// Directory to create file in
    #[clap(default_value = ".")]
    path: PathBuf,

    /// Add an initial package request
    #[clap(long = "package")]
    packages: Vec<String>,

    /// Template to use: minimal, standard
    #[clap(long, default_value = "standard")]
    template: String,
}

impl CmdInit {
    pub fn run(&mut self) -> Result<i32> {
        let spec_path = self.path.join(denv::DENV_FILENAME);

        // Check if file already exists
        if spec_path.exists() {
            return Err(miette::miette!(
                ".denv.yaml already exists at {:?}",
                spec_path
            ));
        }

        let content = match self.template.as_str() {
            "minimal" => self.generate_minimal_template(),
            _ => self.generate_standard_template(),
        };

        std::fs::write(&spec_path, content)
            .map_err(|e| miette::miette!("Failed to write .denv.yaml: {}", e))?;

        println!("Created .denv.yaml at {:?}", spec_path);
        println!();
        println!("Next steps:");
        println!("  1. Edit the file to declare a base repository and packages");
        println!("  2. Run 'denv show' to preview the environment");
        println!("  3. Run 'denv shell' to enter the environment");

        Ok(0)
    }

    fn generate_minimal_template(&self) -> String {
        format!(
            "api: denv/v0\n\
            \n\
            {}",
            self.packages_section()
        )
    }

    fn generate_standard_template(&self) -> String {
        format!(
            "# denv environment description\n\
            \n\
            api: denv/v0\n\
            \n\
            # Optional: Human-readable description\n\
            # description: \"My project environment\"\n\
            \n\
            # Optional: Target system (defaults to the host)\n\
            # system: x86_64-linux\n\
            \n\
            # Input sources, pinned into .denv.lock.yaml by 'denv lock'\n\
            # inputs:\n\
            #   pkgs:\n\
            #     url: path:./pkgs\n\
            #     rev: latest\n\
            \n\
            # Base package repository and overlays, relative to this file\n\
            # base: pkgs/base.yaml\n\
            # overlays:\n\
            #   - pkgs/patches.yaml\n\
            \n\
            {}\
            \n\
            # Environment variable rules\n\
            # environment:\n\
            #   - prepend: PATH\n\
            #     value: ${{pkg:ripgrep}}/bin\n\
            #   - set: PROJECT_ROOT\n\
            #     value: .\n\
            \n\
            # Shell hook appended to the activation script\n\
            # hook: |\n\
            #   echo \"environment ready\"\n",
            self.packages_section()
        )
    }

    fn packages_section(&self) -> String {
        if self.packages.is_empty() {
            "# packages:\n\
            #   - ripgrep\n\
            #   - name: python\n\
            #     extras: [numpy]\n"
                .to_string()
        } else {
            format!(
                "packages:\n{}\n",
                self.packages
                    .iter()
                    .map(|p| format!("  - {}", p))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        }
    }
}
