// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! denv - Declarative Development Environment Manager CLI

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_check;
mod cmd_init;
mod cmd_lock;
mod cmd_render;
mod cmd_shell;
mod cmd_show;

use cmd_check::CmdCheck;
use cmd_init::CmdInit;
use cmd_lock::CmdLock;
use cmd_render::CmdRender;
use cmd_shell::CmdShell;
use cmd_show::CmdShow;

#[derive(Parser)]
#[clap(
    name = "denv",
    about = "Declarative Development Environment Manager",
    version,
    long_about = "Resolve, lock, and activate reproducible development environments from .denv.yaml files"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long)]
    quiet: bool,
}

/// Artifact store selection, shared by resolving commands.
#[derive(Parser, Clone, Debug, Default)]
pub struct StoreFlags {
    /// Artifact store root directory
    #[clap(long = "store", env = "DENV_STORE")]
    pub store: Option<PathBuf>,
}

impl StoreFlags {
    pub fn open(&self) -> denv::Result<denv::LocalStore> {
        let root = match &self.store {
            Some(root) => root.clone(),
            None => denv::LocalStore::default_root()?,
        };
        Ok(denv::LocalStore::new(root))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create a new .denv.yaml file
    Init(CmdInit),

    /// Display the environment description and its closure
    Show(CmdShow),

    /// Generate or update the lock file
    Lock(CmdLock),

    /// Verify the description resolves and matches its lock
    Check(CmdCheck),

    /// Render the activation script
    Render(CmdRender),

    /// Enter an interactive shell in the environment
    Shell(CmdShell),
}

impl Opt {
    fn run(self) -> Result<i32> {
        // Setup logging
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt().with_max_level(log_level).init();

        // Dispatch to command
        match self.cmd {
            Command::Init(mut cmd) => cmd.run(),
            Command::Show(mut cmd) => cmd.run(),
            Command::Lock(mut cmd) => cmd.run(),
            Command::Check(mut cmd) => cmd.run(),
            Command::Render(mut cmd) => cmd.run(),
            Command::Shell(mut cmd) => cmd.run(),
        }
    }
}

/// Resolve a `-f` argument to the description file path: a directory
/// points at the `.denv.yaml` inside it, anything else is taken as-is.
pub fn spec_path(arg: &Path) -> PathBuf {
    if arg.is_dir() {
        arg.join(denv::DENV_FILENAME)
    } else {
        arg.to_path_buf()
    }
}

/// Lock file path adjacent to a description file.
pub fn lock_path(spec_path: &Path) -> PathBuf {
    spec_path
        .parent()
        .map(|dir| dir.join(denv::DENV_LOCK_FILENAME))
        .unwrap_or_else(|| PathBuf::from(denv::DENV_LOCK_FILENAME))
}

/// Load the lock next to a description, if one exists.
pub fn load_lock(spec_path: &Path) -> denv::Result<Option<denv::LockFile>> {
    let path = lock_path(spec_path);
    if path.exists() {
        Ok(Some(denv::LockFile::load(&path)?))
    } else {
        Ok(None)
    }
}

fn main() {
    let opt = Opt::parse();
    match opt.run() {
        Ok(code) => std::process::exit(code),
        Err(report) => {
            eprintln!("{report:?}");
            let code = report
                .downcast_ref::<denv::Error>()
                .map(denv::Error::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}
