//! Clean reinstall: remove stale targets, prepare, then copy three trees.
//!
//! The run is strictly sequential and not transactional.  An error aborts it
//! immediately and leaves whatever was already removed or copied as is.
//! Two installers running at once against the same targets race on removal
//! and creation; that is unsupported.
use std::io;
use std::path::PathBuf;

use crate::config::InstallConfig;
use crate::error::InstallError;
use crate::filter::ExclusionPatternSet;
use crate::fs::{CopyStats, copy_tree, entry_exists, plan_copy, remove_tree};
use crate::logging::{Log, StepStatus};
use crate::paths::{InstallPaths, SourceTree};
use crate::platform::{Platform, PlatformLayout, validate_product};

/// What a finished run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Stale targets that were removed (or would be, in dry-run mode).
    pub removed: Vec<PathBuf>,
    /// Totals over the three copies.
    pub copied: CopyStats,
}

/// One source root and where it goes.
#[derive(Debug, Clone)]
struct CopyJob {
    label: &'static str,
    from: PathBuf,
    to: PathBuf,
}

/// Orchestrates a full clean reinstall for one platform layout.
#[derive(Debug)]
pub struct Installer {
    layout: Box<dyn PlatformLayout>,
    paths: InstallPaths,
    sources: SourceTree,
    filter: ExclusionPatternSet,
    dry_run: bool,
}

impl Installer {
    /// Create an installer for an explicit layout.
    ///
    /// Install paths are resolved here, once, and never change afterwards.
    #[must_use]
    pub fn new(
        layout: Box<dyn PlatformLayout>,
        sources: SourceTree,
        filter: ExclusionPatternSet,
    ) -> Self {
        let paths = layout.resolve_paths();
        Self {
            layout,
            paths,
            sources,
            filter,
            dry_run: false,
        }
    }

    /// Create an installer for the platform identified by `os` (the running
    /// system when `None`).
    ///
    /// Performs no filesystem access.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::UnsupportedPlatform`] for an unknown OS,
    /// [`InstallError::InvalidProduct`] for a product name that is not a
    /// single directory name, and [`InstallError::InvalidPattern`] for a bad
    /// extra exclusion pattern.
    pub fn from_config(
        config: &InstallConfig,
        os: Option<&str>,
        sources: SourceTree,
    ) -> Result<Self, InstallError> {
        let platform = Platform::resolve(os)?;
        validate_product(&config.product)?;
        let filter = ExclusionPatternSet::with_extra(&config.extra_exclusions)?;
        Ok(Self::new(platform.layout(config), sources, filter))
    }

    /// Report every action instead of performing it.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The resolved install targets.
    #[must_use]
    pub const fn paths(&self) -> &InstallPaths {
        &self.paths
    }

    /// The distribution being installed.
    #[must_use]
    pub const fn sources(&self) -> &SourceTree {
        &self.sources
    }

    /// The exclusion patterns applied to every copy.
    #[must_use]
    pub const fn filter(&self) -> &ExclusionPatternSet {
        &self.filter
    }

    /// The platform layout in use.
    #[must_use]
    pub fn layout(&self) -> &dyn PlatformLayout {
        self.layout.as_ref()
    }

    /// Perform the clean reinstall.
    ///
    /// 1. Check that `lib/`, `src/` and `doc/` exist in the source tree.
    /// 2. Remove each existing target directory recursively.
    /// 3. Run the layout's `prepare` step.
    /// 4. Copy the three source roots, skipping excluded entries.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; later steps do not run.
    pub fn run(&self, log: &dyn Log) -> Result<InstallReport, InstallError> {
        let jobs = self.copy_jobs();
        check_sources(&jobs)?;

        let mut report = InstallReport {
            removed: self.remove_stale_targets(log)?,
            ..InstallReport::default()
        };

        log.stage(&format!("Preparing {} layout", self.layout.family()));
        if let Err(e) = self.layout.prepare(log, self.dry_run) {
            log.record_step("Prepare install directory", StepStatus::Failed, Some(&e.to_string()));
            return Err(e);
        }
        let status = if self.dry_run {
            StepStatus::DryRun
        } else {
            StepStatus::Ok
        };
        log.record_step("Prepare install directory", status, None);

        for job in &jobs {
            report.copied.merge(self.copy(job, log)?);
        }
        Ok(report)
    }

    fn copy_jobs(&self) -> [CopyJob; 3] {
        [
            CopyJob {
                label: "libraries",
                from: self.sources.library_dir(),
                to: self.paths.library_dir.clone(),
            },
            CopyJob {
                label: "include files",
                from: self.sources.include_dir(),
                to: self.paths.include_dir.clone(),
            },
            CopyJob {
                label: "documentation",
                from: self.sources.doc_dir(),
                to: self.paths.doc_dir.clone(),
            },
        ]
    }

    fn remove_stale_targets(&self, log: &dyn Log) -> Result<Vec<PathBuf>, InstallError> {
        log.stage("Removing previous installation");
        let mut removed = Vec::new();
        for target in self.paths.targets() {
            let step = format!("Remove {}", target.display());
            let present = match entry_exists(target) {
                Ok(present) => present,
                Err(e) => {
                    log.record_step(&step, StepStatus::Failed, Some(&e.to_string()));
                    return Err(e);
                }
            };
            if !present {
                log.debug(&format!("{} not present", target.display()));
                log.record_step(&step, StepStatus::Skipped, Some("not present"));
                continue;
            }
            if self.dry_run {
                log.dry_run(&format!("would remove files from {}", target.display()));
                log.record_step(&step, StepStatus::DryRun, None);
            } else {
                log.info(&format!("removing files from {}", target.display()));
                if let Err(e) = remove_tree(target) {
                    log.record_step(&step, StepStatus::Failed, Some(&e.to_string()));
                    return Err(e);
                }
                log.record_step(&step, StepStatus::Ok, None);
            }
            removed.push(target.to_path_buf());
        }
        Ok(removed)
    }

    fn copy(&self, job: &CopyJob, log: &dyn Log) -> Result<CopyStats, InstallError> {
        let step = format!("Copy {}", job.label);
        log.stage(&format!(
            "Copying {} from {} to {}",
            job.label,
            job.from.display(),
            job.to.display()
        ));

        let result = if self.dry_run {
            plan_copy(&job.from, &job.to, &self.filter)
        } else {
            copy_tree(&job.from, &job.to, &self.filter)
        };
        let stats = match result {
            Ok(stats) => stats,
            Err(e) => {
                log.record_step(&step, StepStatus::Failed, Some(&e.to_string()));
                return Err(e);
            }
        };

        let summary = format!(
            "{} files, {} directories, {} excluded",
            stats.files, stats.dirs, stats.excluded
        );
        if self.dry_run {
            log.dry_run(&format!("would copy {summary}"));
            log.record_step(&step, StepStatus::DryRun, Some(&summary));
        } else {
            log.info(&format!("copied {summary}"));
            log.record_step(&step, StepStatus::Ok, Some(&summary));
        }
        Ok(stats)
    }
}

/// Fail before anything is removed when a source root is missing.
fn check_sources(jobs: &[CopyJob]) -> Result<(), InstallError> {
    for job in jobs {
        if !job.from.is_dir() {
            return Err(InstallError::CopyFailed {
                from: job.from.clone(),
                to: job.to.clone(),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} source directory is missing", job.label),
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::logging::Logger;
    use crate::platform::{BaseDirectoryLayout, Family, FixedSystemLayout};
    use std::cell::RefCell;
    use std::path::Path;

    /// Records every log call as `"<kind>: <msg>"` so tests can assert order.
    #[derive(Debug, Default)]
    struct RecordingLog {
        events: RefCell<Vec<String>>,
    }

    impl RecordingLog {
        fn push(&self, kind: &str, msg: &str) {
            self.events.borrow_mut().push(format!("{kind}: {msg}"));
        }

        fn position(&self, needle: &str) -> usize {
            self.events
                .borrow()
                .iter()
                .position(|e| e.contains(needle))
                .unwrap_or_else(|| panic!("no event containing {needle:?}"))
        }
    }

    impl Log for RecordingLog {
        fn stage(&self, msg: &str) {
            self.push("stage", msg);
        }
        fn info(&self, msg: &str) {
            self.push("info", msg);
        }
        fn debug(&self, msg: &str) {
            self.push("debug", msg);
        }
        fn warn(&self, msg: &str) {
            self.push("warn", msg);
        }
        fn error(&self, msg: &str) {
            self.push("error", msg);
        }
        fn dry_run(&self, msg: &str) {
            self.push("dry_run", msg);
        }
        fn record_step(&self, name: &str, status: StepStatus, _message: Option<&str>) {
            self.push("step", &format!("{name} {status:?}"));
        }
    }

    /// Layout under a temp dir whose `prepare` only logs that it ran.
    #[derive(Debug)]
    struct MarkerLayout {
        root: PathBuf,
    }

    impl PlatformLayout for MarkerLayout {
        fn family(&self) -> Family {
            Family::FixedSystem
        }

        fn resolve_paths(&self) -> InstallPaths {
            InstallPaths {
                library_dir: self.root.join("lib"),
                include_dir: self.root.join("include"),
                doc_dir: self.root.join("doc"),
                base_dir: None,
            }
        }

        fn prepare(&self, log: &dyn Log, _dry_run: bool) -> Result<(), InstallError> {
            log.info("prepare called");
            Ok(())
        }
    }

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn sample_source(root: &Path) -> SourceTree {
        write(&root.join("lib/foo.so"), "so");
        write(&root.join("lib/obj/foo.o"), "obj");
        write(&root.join("src/foo.h"), "header");
        write(&root.join("src/foo.cpp"), "impl");
        write(&root.join("doc/readme.txt"), "docs");
        SourceTree::new(root)
    }

    fn marker_installer(src: &Path, dst: &Path) -> Installer {
        Installer::new(
            Box::new(MarkerLayout {
                root: dst.to_path_buf(),
            }),
            sample_source(src),
            ExclusionPatternSet::default(),
        )
    }

    #[test]
    fn copies_three_trees_and_excludes_build_artifacts() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let report = marker_installer(src.path(), dst.path())
            .run(&RecordingLog::default())
            .unwrap();

        assert!(dst.path().join("lib/foo.so").exists());
        assert!(!dst.path().join("lib/obj").exists());
        assert!(dst.path().join("include/foo.h").exists());
        assert!(!dst.path().join("include/foo.cpp").exists());
        assert!(dst.path().join("doc/readme.txt").exists());
        assert_eq!(report.copied.files, 3);
        assert_eq!(report.copied.excluded, 2);
    }

    #[test]
    fn removal_then_prepare_then_copy() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(&dst.path().join("lib/old.so"), "stale");

        let log = RecordingLog::default();
        marker_installer(src.path(), dst.path()).run(&log).unwrap();

        let removed = log.position("removing files from");
        let prepared = log.position("prepare called");
        let copied = log.position("Copying libraries");
        assert!(removed < prepared && prepared < copied);
    }

    #[test]
    fn stale_files_do_not_survive_reinstall() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(&dst.path().join("lib/old.so"), "stale");

        let report = marker_installer(src.path(), dst.path())
            .run(&RecordingLog::default())
            .unwrap();

        assert!(!dst.path().join("lib/old.so").exists());
        assert!(dst.path().join("lib/foo.so").exists());
        assert_eq!(report.removed, vec![dst.path().join("lib")]);
    }

    #[test]
    fn missing_source_root_fails_before_removal() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("lib")).unwrap();
        std::fs::create_dir_all(src.path().join("src")).unwrap();
        write(&dst.path().join("lib/old.so"), "stale");

        let installer = Installer::new(
            Box::new(MarkerLayout {
                root: dst.path().to_path_buf(),
            }),
            SourceTree::new(src.path()),
            ExclusionPatternSet::default(),
        );
        let err = installer.run(&RecordingLog::default()).unwrap_err();

        assert!(matches!(err, InstallError::CopyFailed { ref from, .. } if from.ends_with("doc")));
        assert!(dst.path().join("lib/old.so").exists());
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(&dst.path().join("lib/old.so"), "stale");

        let log = RecordingLog::default();
        let report = marker_installer(src.path(), dst.path())
            .with_dry_run(true)
            .run(&log)
            .unwrap();

        assert!(dst.path().join("lib/old.so").exists());
        assert!(!dst.path().join("include").exists());
        assert_eq!(report.copied.files, 3);
        assert!(log.events.borrow().iter().any(|e| e.starts_with("dry_run: would remove")));
    }

    #[test]
    fn records_a_step_per_action() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let log = Logger::new();
        marker_installer(src.path(), dst.path()).run(&log).unwrap();

        let steps = log.step_entries();
        // three removals (skipped), prepare, three copies
        assert_eq!(steps.len(), 7);
        assert!(steps[..3].iter().all(|s| s.status == StepStatus::Skipped));
        assert_eq!(steps[3].name, "Prepare install directory");
        assert_eq!(steps[6].name, "Copy documentation");
        assert!(!log.has_failures());
    }

    #[test]
    fn base_directory_layout_end_to_end() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let base = dst.path().join("aquila");
        write(&base.join("bin/leftover.exe"), "old");

        let installer = Installer::new(
            Box::new(BaseDirectoryLayout::new(&base, "aquila")),
            sample_source(src.path()),
            ExclusionPatternSet::default(),
        );
        installer.run(&Logger::new()).unwrap();

        assert!(!base.join("bin").exists(), "prepare wipes the whole base");
        assert!(base.join("lib/foo.so").exists());
        assert!(base.join("include/aquila/foo.h").exists());
        assert!(base.join("doc/readme.txt").exists());
    }

    #[test]
    fn fixed_layout_under_prefix_end_to_end() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let prefix = dst.path().join("usr");

        let installer = Installer::new(
            Box::new(FixedSystemLayout::new(&prefix, "aquila")),
            sample_source(src.path()),
            ExclusionPatternSet::default(),
        );
        installer.run(&Logger::new()).unwrap();

        assert!(prefix.join("lib/aquila/foo.so").exists());
        assert!(prefix.join("include/aquila/foo.h").exists());
        assert!(prefix.join("share/doc/aquila/readme.txt").exists());
    }

    #[test]
    fn from_config_rejects_unknown_os_without_touching_disk() {
        let dst = tempfile::tempdir().unwrap();
        let config = InstallConfig {
            base_directory: dst.path().join("aquila"),
            prefix: dst.path().join("usr"),
            ..InstallConfig::default()
        };
        let err = Installer::from_config(&config, Some("plan9"), SourceTree::new(dst.path()))
            .unwrap_err();
        assert!(matches!(err, InstallError::UnsupportedPlatform { .. }));
        assert_eq!(std::fs::read_dir(dst.path()).unwrap().count(), 0);
    }

    #[test]
    fn from_config_rejects_invalid_extra_pattern() {
        let config = InstallConfig {
            extra_exclusions: vec!["[".to_string()],
            ..InstallConfig::default()
        };
        let err = Installer::from_config(&config, Some("linux"), SourceTree::new("/dist"))
            .unwrap_err();
        assert!(matches!(err, InstallError::InvalidPattern { .. }));
    }
    #[test]
    fn from_config_rejects_product_names_that_escape_targets() {
        let dst = tempfile::tempdir().unwrap();
        for product in ["", " ", ".", "..", "a/b", "../etc", "a\\b"] {
            let config = InstallConfig {
                prefix: dst.path().join("usr"),
                product: product.to_string(),
                ..InstallConfig::default()
            };
            let err = Installer::from_config(&config, Some("linux"), SourceTree::new("/dist"))
                .unwrap_err();
            assert!(
                matches!(err, InstallError::InvalidProduct { .. }),
                "{product:?} was accepted"
            );
        }
        assert_eq!(std::fs::read_dir(dst.path()).unwrap().count(), 0);
    }

    #[test]
    fn from_config_accepts_plain_product_name() {
        let config = InstallConfig {
            product: "aquila-3.0".to_string(),
            ..InstallConfig::default()
        };
        let installer =
            Installer::from_config(&config, Some("linux"), SourceTree::new("/dist")).unwrap();
        assert!(installer.paths().library_dir.ends_with("aquila-3.0"));
    }

    #[cfg(unix)]
    #[test]
    fn removal_failure_stops_before_prepare_and_copy() {
        use crate::fs::perms;
        if !perms::enforced() {
            return;
        }
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(&dst.path().join("lib/old.so"), "stale");
        perms::set_mode(&dst.path().join("lib"), 0o555);

        let log = RecordingLog::default();
        let result = marker_installer(src.path(), dst.path()).run(&log);
        perms::set_mode(&dst.path().join("lib"), 0o755);

        let err = result.unwrap_err();
        assert!(
            matches!(err, InstallError::FilesystemRemovalFailed { ref path, .. } if path.ends_with("lib"))
        );
        let events = log.events.borrow();
        assert!(!events.iter().any(|e| e.contains("prepare called")));
        assert!(!events.iter().any(|e| e.contains("Copying")));
        assert!(events.iter().any(|e| e.ends_with("Failed")));
        assert!(!dst.path().join("include").exists());
        assert!(!dst.path().join("doc").exists());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_target_parent_fails_instead_of_skipping() {
        use crate::fs::perms;
        if !perms::enforced() {
            return;
        }
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let root = dst.path().join("locked");
        write(&root.join("lib/old.so"), "stale");
        perms::set_mode(&root, 0o000);

        let log = Logger::new();
        let result = marker_installer(src.path(), &root).run(&log);
        perms::set_mode(&root, 0o755);

        assert!(matches!(result, Err(InstallError::FilesystemRemovalFailed { .. })));
        let steps = log.step_entries();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].status, StepStatus::Failed);
        assert!(root.join("lib/old.so").exists());
    }

    #[cfg(unix)]
    #[test]
    fn copy_failure_keeps_trees_already_copied() {
        use crate::fs::perms;
        if !perms::enforced() {
            return;
        }
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let installer = marker_installer(src.path(), dst.path());
        let private = src.path().join("src/private");
        write(&private.join("detail.h"), "hidden");
        perms::set_mode(&private, 0o000);

        let log = Logger::new();
        let result = installer.run(&log);
        perms::set_mode(&private, 0o755);

        let err = result.unwrap_err();
        assert!(matches!(err, InstallError::CopyFailed { ref from, .. } if *from == private));
        assert!(dst.path().join("lib/foo.so").exists(), "no rollback of libraries");
        assert!(dst.path().join("include/foo.h").exists(), "partial copy is left");
        assert!(!dst.path().join("doc").exists(), "later copies do not run");
        assert!(log.has_failures());
        assert_eq!(log.step_entries().len(), 6);
    }
}
