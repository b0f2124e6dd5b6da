//! Install target and source tree locations.
use std::fmt;
use std::path::{Path, PathBuf};

/// Resolved install targets for one run.
///
/// Produced once by a [`PlatformLayout`](crate::platform::PlatformLayout)
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    /// Destination for the contents of `lib/`.
    pub library_dir: PathBuf,
    /// Destination for the headers under `src/`.
    pub include_dir: PathBuf,
    /// Destination for the contents of `doc/`.
    pub doc_dir: PathBuf,
    /// Root that holds every target; only set for the base-directory family.
    pub base_dir: Option<PathBuf>,
}

impl InstallPaths {
    /// The three target directories in removal order.
    #[must_use]
    pub fn targets(&self) -> [&Path; 3] {
        [&self.library_dir, &self.doc_dir, &self.include_dir]
    }
}

impl fmt::Display for InstallPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "library: {}", self.library_dir.display())?;
        writeln!(f, "include: {}", self.include_dir.display())?;
        write!(f, "doc:     {}", self.doc_dir.display())?;
        if let Some(base) = &self.base_dir {
            write!(f, "\nbase:    {}", base.display())?;
        }
        Ok(())
    }
}

/// The distribution being installed: `lib/`, `src/` and `doc/` under one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    root: PathBuf,
}

impl SourceTree {
    /// Directory holding built libraries.
    pub const LIB: &'static str = "lib";
    /// Directory holding public headers.
    pub const INCLUDE: &'static str = "src";
    /// Directory holding documentation.
    pub const DOC: &'static str = "doc";

    /// Wrap a source root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The source root itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/lib`
    #[must_use]
    pub fn library_dir(&self) -> PathBuf {
        self.root.join(Self::LIB)
    }

    /// `<root>/src`
    #[must_use]
    pub fn include_dir(&self) -> PathBuf {
        self.root.join(Self::INCLUDE)
    }

    /// `<root>/doc`
    #[must_use]
    pub fn doc_dir(&self) -> PathBuf {
        self.root.join(Self::DOC)
    }

    /// Whether `dir` holds all three source roots.
    #[must_use]
    pub fn is_complete_at(dir: &Path) -> bool {
        [Self::LIB, Self::INCLUDE, Self::DOC]
            .iter()
            .all(|sub| dir.join(sub).is_dir())
    }
}
