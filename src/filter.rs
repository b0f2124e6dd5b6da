//! Glob-based exclusion of build-only artifacts during copy.
use std::ffi::OsStr;

use glob::{MatchOptions, Pattern};

use crate::error::InstallError;

/// Patterns excluded from every copy, in evaluation order.
///
/// Covers version-control metadata, native sources that are not meant for
/// distribution, resource scripts, qmake project files, makefiles, build
/// output and intermediate directories.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    ".svn*",
    "*.cpp",
    "*.rc",
    "*.pro*",
    "Makefile*",
    "debug",
    "release",
    "obj",
    "objd",
    "object_script.*",
];

/// Ordered set of glob patterns matched against entry base names.
///
/// # Examples
///
/// ```
/// use aquila_install::filter::ExclusionPatternSet;
///
/// let set = ExclusionPatternSet::default();
/// assert!(set.is_excluded("Makefile.Release".as_ref()));
/// assert!(!set.is_excluded("libaquila.a".as_ref()));
/// ```
#[derive(Debug, Clone)]
pub struct ExclusionPatternSet {
    patterns: Vec<Pattern>,
    options: MatchOptions,
}

impl Default for ExclusionPatternSet {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_EXCLUSIONS
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect(),
            options: host_match_options(),
        }
    }
}

impl ExclusionPatternSet {
    /// Build a set from the default patterns followed by `extra`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::InvalidPattern`] if any extra pattern is not a
    /// valid glob.
    pub fn with_extra<S: AsRef<str>>(extra: &[S]) -> Result<Self, InstallError> {
        let mut set = Self::default();
        for raw in extra {
            let raw = raw.as_ref();
            let pattern = Pattern::new(raw).map_err(|e| InstallError::InvalidPattern {
                pattern: raw.to_string(),
                reason: e.msg.to_string(),
            })?;
            set.patterns.push(pattern);
        }
        Ok(set)
    }

    /// Whether an entry with base name `name` is skipped.
    ///
    /// Only the final path component is considered; callers pass the file
    /// or directory name, never a full path.
    #[must_use]
    pub fn is_excluded(&self, name: &OsStr) -> bool {
        let name = name.to_string_lossy();
        self.patterns
            .iter()
            .any(|p| p.matches_with(&name, self.options))
    }

    /// The patterns in evaluation order, as written.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Pattern::as_str)
    }

    /// Number of patterns in the set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the set has no patterns.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Windows filesystems are case-insensitive, so names match regardless of
/// case there and exactly elsewhere.
const fn host_match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: !cfg!(windows),
        require_literal_separator: false,
        require_literal_leading_dot: false,
    }
}
