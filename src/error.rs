//! Domain-specific error types for the installer.
//!
//! Internal modules return typed errors ([`InstallError`], [`ConfigError`])
//! while the command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! InstallError
//! ├── UnsupportedPlatform      OS identifier matches no layout family
//! ├── FilesystemRemovalFailed  stale target or base dir could not be deleted
//! ├── CreateDirFailed          base directory could not be recreated
//! ├── CopyFailed               a source root is missing or a copy aborted
//! ├── InvalidPattern           an exclusion glob does not parse
//! └── InvalidProduct           product name is not a single path component
//! ConfigError
//! ├── Io                       config file could not be read
//! └── Parse                    config file is not valid TOML
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort an install run.
///
/// None of these are recovered locally: every variant propagates to `main`
/// and terminates the process with a non-zero status.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The operating system identifier matches neither layout family.
    #[error("unsupported platform '{os}': expected a windows or posix system")]
    UnsupportedPlatform {
        /// The identifier that was rejected.
        os: String,
    },

    /// An existing install target could not be deleted.
    #[error("failed to remove {}: {source}", path.display())]
    FilesystemRemovalFailed {
        /// Directory that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The base install directory could not be (re)created.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A source tree could not be copied to its target.
    #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
    CopyFailed {
        /// Source path being copied when the failure occurred.
        from: PathBuf,
        /// Destination path being written when the failure occurred.
        to: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// An exclusion pattern is not a valid glob.
    #[error("invalid exclusion pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: String,
        /// Parser message from the glob crate.
        reason: String,
    },

    /// The product name cannot be used as a per-product directory name.
    #[error("invalid product name '{product}': {reason}")]
    InvalidProduct {
        /// The name as configured.
        product: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Errors that arise while loading the TOML configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("IO error reading config file {}: {source}", path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The configuration file is not valid TOML or has unknown keys.
    #[error("invalid config file {}: {message}", path.display())]
    Parse {
        /// Path to the offending file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}
