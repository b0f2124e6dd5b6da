//! Command-line interface definition.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigLayer;

/// Top-level CLI entry point for the installer.
#[derive(Parser, Debug)]
#[command(
    name = "aquila-install",
    about = "Clean reinstall of the Aquila library binaries, headers and documentation",
    long_about = "Removes any previous installation, then copies lib/, src/ and doc/ \
                  from the source tree into the platform's install locations.\n\n\
                  Running two installers at the same time against the same targets \
                  is not supported.",
    version
)]
pub struct Cli {
    /// What to do; defaults to `install`
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[allow(missing_docs)]
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Install root for the base-directory (Windows) family
    #[arg(short, long, global = true, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Prefix for the fixed-path (POSIX) family [default: /usr]
    #[arg(long, global = true, value_name = "DIR")]
    pub prefix: Option<PathBuf>,

    /// Directory containing lib/, src/ and doc/ [default: next to the executable]
    #[arg(short, long, global = true, value_name = "DIR")]
    pub source_root: Option<PathBuf>,

    /// Product name used in install paths [default: aquila]
    #[arg(long, global = true, value_name = "NAME")]
    pub product: Option<String>,

    /// Override the detected operating system identifier
    #[arg(long, global = true, value_name = "ID")]
    pub os: Option<String>,

    /// Additional exclusion pattern (repeatable)
    #[arg(short = 'x', long = "exclude", global = true, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Also write a plain-text log to FILE
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl GlobalOpts {
    /// The settings given on the command line, as the top configuration layer.
    #[must_use]
    pub fn config_layer(&self) -> ConfigLayer {
        ConfigLayer {
            base_directory: self.base_dir.clone(),
            prefix: self.prefix.clone(),
            source_root: self.source_root.clone(),
            product: self.product.clone(),
            exclude: self.exclude.clone(),
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Perform a clean reinstall (default)
    Install,
    /// Print the resolved install paths and source roots, then exit
    Paths,
}
