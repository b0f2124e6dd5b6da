//! `paths`: show where an install would go, without touching anything.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::commands::CommandSetup;
use crate::logging::Logger;

/// Run the paths command.
///
/// # Errors
///
/// Returns an error if configuration loading or platform resolution fails.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let installer = &setup.installer;

    log.stage(&format!("{} layout", installer.layout().family()));
    for line in installer.paths().to_string().lines() {
        log.info(line);
    }

    log.stage("Sources");
    let sources = installer.sources();
    for dir in [sources.library_dir(), sources.include_dir(), sources.doc_dir()] {
        let state = if dir.is_dir() { "" } else { " (missing)" };
        log.info(&format!("{}{state}", dir.display()));
    }

    log.stage("Exclusions");
    log.info(&installer.filter().patterns().collect::<Vec<_>>().join(" "));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn paths_succeeds_without_sources_and_writes_nothing() {
        let target = tempfile::tempdir().unwrap();
        let base = target.path().join("aquila");
        let global = GlobalOpts {
            base_dir: Some(base.clone()),
            source_root: Some(PathBuf::from("/no/such/dist")),
            os: Some("nt".to_string()),
            ..GlobalOpts::default()
        };
        run(&global, &Logger::new()).unwrap();
        assert!(!base.exists());
    }
}
