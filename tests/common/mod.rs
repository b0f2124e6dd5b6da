// Shared helpers for integration tests.
//
// Provides a temporary distribution tree and a separate temporary target
// area, plus a fluent builder, so each integration test can run a full
// install in isolation without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use aquila_install::config::InstallConfig;
use aquila_install::installer::Installer;
use aquila_install::logging::Logger;
use aquila_install::paths::SourceTree;

/// Create empty `lib/`, `src/` and `doc/` directories under `root`.
pub fn setup_minimal_dist(root: &Path) {
    for dir in [SourceTree::LIB, SourceTree::INCLUDE, SourceTree::DOC] {
        std::fs::create_dir_all(root.join(dir)).expect("create source dir");
    }
}

/// Write `content` to `root/<rel>`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(&path, content).expect("write file");
}

/// Every regular file under `root`, keyed by its `/`-separated relative path.
pub fn snapshot_tree(root: &Path) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    collect(root, root, &mut files);
    files
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<String, String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.expect("read dir entry").path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let rel = path
                .strip_prefix(root)
                .expect("path under root")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let content = std::fs::read_to_string(&path).unwrap_or_default();
            files.insert(rel, content);
        }
    }
}

/// An isolated distribution plus install target, both backed by
/// [`tempfile::TempDir`]s and deleted when dropped.
pub struct IntegrationTestContext {
    /// Distribution tree holding `lib/`, `src/` and `doc/`.
    pub dist: tempfile::TempDir,
    /// Area the installer writes into.
    pub target: tempfile::TempDir,
    /// Extra exclusion patterns passed to the installer.
    pub extra_exclusions: Vec<String>,
}

impl IntegrationTestContext {
    /// Create a new context with an empty but complete distribution.
    pub fn new() -> Self {
        let dist = tempfile::tempdir().expect("create dist dir");
        setup_minimal_dist(dist.path());
        Self {
            dist,
            target: tempfile::tempdir().expect("create target dir"),
            extra_exclusions: Vec::new(),
        }
    }

    /// Path to the distribution root.
    pub fn dist_path(&self) -> &Path {
        self.dist.path()
    }

    /// Base directory used for the base-directory family.
    pub fn base_dir(&self) -> PathBuf {
        self.target.path().join("aquila")
    }

    /// Prefix used for the fixed-path family.
    pub fn prefix(&self) -> PathBuf {
        self.target.path().join("usr")
    }

    /// Configuration pointing both families into the target area.
    pub fn config(&self) -> InstallConfig {
        InstallConfig {
            base_directory: self.base_dir(),
            prefix: self.prefix(),
            source_root: Some(self.dist_path().to_path_buf()),
            extra_exclusions: self.extra_exclusions.clone(),
            ..InstallConfig::default()
        }
    }

    /// Build an installer for `os` over this context.
    pub fn installer(&self, os: &str) -> Installer {
        Installer::from_config(&self.config(), Some(os), SourceTree::new(self.dist_path()))
            .expect("build installer")
    }

    /// Run a full install for `os` and return the logger that recorded it.
    pub fn install(&self, os: &str) -> Logger {
        let log = Logger::new();
        self.installer(os).run(&log).expect("install");
        log
    }
}

/// Fluent builder for [`IntegrationTestContext`].
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building a new context backed by a minimal distribution.
    pub fn new() -> Self {
        Self {
            ctx: IntegrationTestContext::new(),
        }
    }

    /// Add a file to the distribution at `rel` (e.g. `lib/libAquila.a`).
    pub fn with_dist_file(self, rel: &str, content: &str) -> Self {
        write_file(self.ctx.dist.path(), rel, content);
        self
    }

    /// Pre-populate the target area at `rel`, relative to the target root.
    pub fn with_target_file(self, rel: &str, content: &str) -> Self {
        write_file(self.ctx.target.path(), rel, content);
        self
    }

    /// Append an extra exclusion pattern.
    pub fn with_exclusion(mut self, pattern: &str) -> Self {
        self.ctx.extra_exclusions.push(pattern.to_string());
        self
    }

    /// Finish building and return the configured context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}
