//! `install`: clean reinstall of the distribution.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::commands::CommandSetup;
use crate::logging::Logger;

/// Version string baked in at build time.
#[must_use]
pub fn version() -> &'static str {
    option_env!("AQUILA_INSTALL_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Run the install command.
///
/// # Errors
///
/// Returns an error if configuration loading fails or any install step fails.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    log.info(&format!("aquila-install {}", version()));

    let setup = CommandSetup::init(global, log)?;
    let installer = &setup.installer;
    log.info(&format!(
        "{} layout, {} exclusion patterns",
        installer.layout().family(),
        installer.filter().len()
    ));
    if global.dry_run {
        log.warn("dry run: nothing will be removed or copied");
    }

    let result = installer.run(log);
    log.print_summary();
    let report = result?;

    log.info(&format!(
        "installed {} files into {} directories ({} excluded)",
        report.copied.files, report.copied.dirs, report.copied.excluded
    ));
    Ok(())
}
