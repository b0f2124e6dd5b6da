//! Subcommand orchestration shared by `install` and `paths`.
pub mod install;
pub mod paths;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{DEFAULT_BASE_DIRECTORY, InstallConfig};
use crate::installer::Installer;
use crate::logging::Logger;
use crate::paths::SourceTree;
use crate::platform::Family;

/// Shared state produced by the common command setup sequence.
///
/// Loads the layered configuration, locates the source tree, and builds the
/// [`Installer`] so each command does not repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// The resolved configuration.
    pub config: InstallConfig,
    /// Installer bound to the resolved platform and source tree.
    pub installer: Installer,
}

impl CommandSetup {
    /// Load configuration, resolve the source tree and the platform layout.
    ///
    /// Performs no writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded, the platform is
    /// unsupported, the product name or an exclusion pattern is invalid, or no
    /// source root can be determined.  A base-directory layout on a
    /// non-Windows host also requires an explicit base directory.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        log.stage("Loading configuration");
        if let Some(path) = &global.config {
            log.info(&format!("config file: {}", path.display()));
        }
        let config = InstallConfig::load(global.config.as_deref(), global.config_layer())?;
        log.debug(&format!(
            "{} extra exclusion pattern(s)",
            config.extra_exclusions.len()
        ));

        let root = resolve_source_root(config.source_root.as_deref())?;
        log.info(&format!("source root: {}", root.display()));

        let sources = SourceTree::new(root);
        let installer = Installer::from_config(&config, global.os.as_deref(), sources)?
            .with_dry_run(global.dry_run);
        if cfg!(not(windows))
            && installer.layout().family() == Family::BaseDirectory
            && config.uses_default_base_directory()
        {
            anyhow::bail!(
                "the default base directory {DEFAULT_BASE_DIRECTORY} only exists on Windows hosts; \
                 pass --base-dir or set base_directory in the config file"
            );
        }
        Ok(Self { config, installer })
    }
}

/// Resolve the directory holding `lib/`, `src/` and `doc/`.
///
/// An explicit root is used as is.  Otherwise the executable's directory is
/// preferred, then the current directory, whichever holds a complete tree.
/// When neither does, the executable's directory is returned and the
/// installer's source check reports what is missing.
///
/// # Errors
///
/// Returns an error only if neither the executable path nor the current
/// directory can be determined.
pub fn resolve_source_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root.to_path_buf());
    }

    let exe_dir = std::env::current_exe()
        .and_then(dunce::canonicalize)
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = std::env::current_dir().ok();

    let candidates: Vec<PathBuf> = exe_dir.iter().chain(cwd.iter()).cloned().collect();
    if let Some(found) = first_complete(&candidates) {
        return Ok(found);
    }

    exe_dir
        .or(cwd)
        .context("cannot determine source root; use --source-root")
}

/// First candidate that contains all three source directories.
fn first_complete(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|dir| SourceTree::is_complete_at(dir))
        .cloned()
}
