//! Operating-system detection and per-family install layouts.
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::config::InstallConfig;
use crate::error::InstallError;
use crate::fs::{entry_exists, remove_tree};
use crate::logging::Log;
use crate::paths::InstallPaths;

/// Layout family an operating system belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Every target lives under one configurable root (Windows).
    BaseDirectory,
    /// Targets are conventional system paths under a prefix (POSIX).
    FixedSystem,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaseDirectory => write!(f, "base-directory"),
            Self::FixedSystem => write!(f, "fixed-path"),
        }
    }
}

/// Identifiers of the base-directory family.
const BASE_DIRECTORY_IDS: &[&str] = &["windows", "nt"];

/// Identifiers of the fixed-path family.
const FIXED_SYSTEM_IDS: &[&str] = &[
    "linux",
    "macos",
    "freebsd",
    "netbsd",
    "openbsd",
    "dragonfly",
    "solaris",
    "illumos",
    "android",
    "posix",
];

impl Family {
    /// Map an operating-system identifier to its layout family.
    ///
    /// Accepts the values of [`std::env::consts::OS`] plus the generic `nt`
    /// and `posix`; matching ignores case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::UnsupportedPlatform`] for any other identifier.
    pub fn from_identifier(os: &str) -> Result<Self, InstallError> {
        let id = os.trim().to_ascii_lowercase();
        if BASE_DIRECTORY_IDS.contains(&id.as_str()) {
            Ok(Self::BaseDirectory)
        } else if FIXED_SYSTEM_IDS.contains(&id.as_str()) {
            Ok(Self::FixedSystem)
        } else {
            Err(InstallError::UnsupportedPlatform { os: os.to_string() })
        }
    }

    /// Every identifier that maps to a family.
    pub fn supported_identifiers() -> impl Iterator<Item = &'static str> {
        BASE_DIRECTORY_IDS
            .iter()
            .chain(FIXED_SYSTEM_IDS)
            .copied()
    }
}

/// The operating system the installer targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Identifier as detected or given on the command line.
    pub os: String,
    /// Layout family the identifier maps to.
    pub family: Family,
}

impl Platform {
    /// Identify the running operating system.
    #[must_use]
    pub const fn detected_identifier() -> &'static str {
        std::env::consts::OS
    }

    /// Resolve the platform for `os`, or for the running system when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::UnsupportedPlatform`] when the identifier
    /// matches neither family.
    pub fn resolve(os: Option<&str>) -> Result<Self, InstallError> {
        let os = os.unwrap_or(Self::detected_identifier());
        Ok(Self {
            os: os.to_string(),
            family: Family::from_identifier(os)?,
        })
    }

    /// Build the install layout for this platform from `config`.
    #[must_use]
    pub fn layout(&self, config: &InstallConfig) -> Box<dyn PlatformLayout> {
        match self.family {
            Family::BaseDirectory => Box::new(BaseDirectoryLayout::new(
                &config.base_directory,
                &config.product,
            )),
            Family::FixedSystem => {
                Box::new(FixedSystemLayout::new(&config.prefix, &config.product))
            }
        }
    }
}

/// Check that `product` names exactly one directory below each target root.
///
/// Every target is removed recursively before copying, so a name that is
/// empty, `.`, `..` or contains a separator would point removal at a shared
/// system directory or outside the prefix.
///
/// # Errors
///
/// Returns [`InstallError::InvalidProduct`] describing the first violation.
pub fn validate_product(product: &str) -> Result<(), InstallError> {
    let reject = |reason: &'static str| -> Result<(), InstallError> {
        Err(InstallError::InvalidProduct {
            product: product.to_string(),
            reason,
        })
    };
    if product.trim().is_empty() {
        return reject("must not be empty");
    }
    if product == "." || product == ".." {
        return reject("must not be '.' or '..'");
    }
    if product.contains(['/', '\\']) {
        return reject("must not contain a path separator");
    }
    let mut components = Path::new(product).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == product => Ok(()),
        _ => reject("must be a plain directory name"),
    }
}

/// Where a platform family puts installed files, and how it readies them.
pub trait PlatformLayout: fmt::Debug {
    /// Layout family, for reporting.
    fn family(&self) -> Family;

    /// Compute the install targets.  Pure: touches no filesystem state.
    fn resolve_paths(&self) -> InstallPaths;

    /// Pre-copy cleanup, run after stale targets have been removed.
    ///
    /// With `dry_run` set, report the actions instead of performing them.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be removed or created.
    fn prepare(&self, log: &dyn Log, dry_run: bool) -> Result<(), InstallError>;
}

/// Windows-style layout: `<base>/lib`, `<base>/include/<product>`, `<base>/doc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDirectoryLayout {
    base: PathBuf,
    product: String,
}

impl BaseDirectoryLayout {
    /// Layout rooted at `base` for `product`.
    #[must_use]
    pub fn new(base: &Path, product: &str) -> Self {
        Self {
            base: base.to_path_buf(),
            product: product.to_string(),
        }
    }
}

impl PlatformLayout for BaseDirectoryLayout {
    fn family(&self) -> Family {
        Family::BaseDirectory
    }

    fn resolve_paths(&self) -> InstallPaths {
        InstallPaths {
            library_dir: self.base.join("lib"),
            include_dir: self.base.join("include").join(&self.product),
            doc_dir: self.base.join("doc"),
            base_dir: Some(self.base.clone()),
        }
    }

    /// Wipe the whole base directory if present, then recreate it empty.
    fn prepare(&self, log: &dyn Log, dry_run: bool) -> Result<(), InstallError> {
        let base = self.base.display();
        if entry_exists(&self.base)? {
            if dry_run {
                log.dry_run(&format!("would remove existing install at {base}"));
            } else {
                log.info(&format!("existing install found, upgrading: removing {base}"));
                remove_tree(&self.base)?;
            }
        }

        if dry_run {
            log.dry_run(&format!("would create install directory {base}"));
            return Ok(());
        }
        std::fs::create_dir_all(&self.base).map_err(|source| InstallError::CreateDirFailed {
            path: self.base.clone(),
            source,
        })?;
        log.info(&format!("created install directory {base}"));
        Ok(())
    }
}

/// POSIX-style layout: `<prefix>/lib/<product>`, `<prefix>/include/<product>`,
/// `<prefix>/share/doc/<product>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSystemLayout {
    prefix: PathBuf,
    product: String,
}

impl FixedSystemLayout {
    /// Layout under `prefix` (normally `/usr`) for `product`.
    #[must_use]
    pub fn new(prefix: &Path, product: &str) -> Self {
        Self {
            prefix: prefix.to_path_buf(),
            product: product.to_string(),
        }
    }
}

impl PlatformLayout for FixedSystemLayout {
    fn family(&self) -> Family {
        Family::FixedSystem
    }

    fn resolve_paths(&self) -> InstallPaths {
        InstallPaths {
            library_dir: self.prefix.join("lib").join(&self.product),
            include_dir: self.prefix.join("include").join(&self.product),
            doc_dir: self.prefix.join("share").join("doc").join(&self.product),
            base_dir: None,
        }
    }

    /// Nothing to do: there is no shared root, and the generic target
    /// removal has already cleared every target.
    fn prepare(&self, log: &dyn Log, _dry_run: bool) -> Result<(), InstallError> {
        log.debug("fixed-path layout has no base directory to prepare");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::logging::Logger;

    fn config_under(root: &Path) -> InstallConfig {
        InstallConfig {
            base_directory: root.join("aquila"),
            prefix: root.join("usr"),
            ..InstallConfig::default()
        }
    }

    // -----------------------------------------------------------------------
    // Family / Platform
    // -----------------------------------------------------------------------

    #[test]
    fn windows_identifiers_map_to_base_directory() {
        assert_eq!(Family::from_identifier("windows").unwrap(), Family::BaseDirectory);
        assert_eq!(Family::from_identifier("nt").unwrap(), Family::BaseDirectory);
        assert_eq!(Family::from_identifier(" Windows ").unwrap(), Family::BaseDirectory);
    }

    #[test]
    fn posix_identifiers_map_to_fixed_system() {
        for id in ["linux", "macos", "freebsd", "posix", "LINUX"] {
            assert_eq!(Family::from_identifier(id).unwrap(), Family::FixedSystem, "{id}");
        }
    }

    #[test]
    fn unknown_identifier_is_unsupported() {
        let err = Family::from_identifier("plan9").unwrap_err();
        assert!(matches!(err, InstallError::UnsupportedPlatform { ref os } if os == "plan9"));
        assert!(Family::from_identifier("").is_err());
    }

    #[test]
    fn detected_platform_is_supported_on_test_hosts() {
        let platform = Platform::resolve(None).unwrap();
        assert_eq!(platform.os, std::env::consts::OS);
    }

    #[test]
    fn family_display() {
        assert_eq!(Family::BaseDirectory.to_string(), "base-directory");
        assert_eq!(Family::FixedSystem.to_string(), "fixed-path");
    }

    #[test]
    fn product_must_be_a_single_directory_name() {
        assert!(validate_product("aquila").is_ok());
        assert!(validate_product("aquila-3.0").is_ok());
        for bad in ["", "  ", ".", "..", "lib/aquila", "aquila/", "/aquila", "a\\b"] {
            assert!(
                matches!(validate_product(bad), Err(InstallError::InvalidProduct { .. })),
                "{bad:?}"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Layout paths
    // -----------------------------------------------------------------------

    #[test]
    fn base_directory_layout_paths() {
        let layout = BaseDirectoryLayout::new(Path::new("/opt/aquila"), "aquila");
        let paths = layout.resolve_paths();
        assert_eq!(paths.library_dir, Path::new("/opt/aquila").join("lib"));
        assert_eq!(
            paths.include_dir,
            Path::new("/opt/aquila").join("include").join("aquila")
        );
        assert_eq!(paths.doc_dir, Path::new("/opt/aquila").join("doc"));
        assert_eq!(paths.base_dir, Some(PathBuf::from("/opt/aquila")));
    }

    #[test]
    fn fixed_system_layout_paths() {
        let layout = FixedSystemLayout::new(Path::new("/usr"), "aquila");
        let paths = layout.resolve_paths();
        assert_eq!(paths.library_dir, Path::new("/usr").join("lib").join("aquila"));
        assert_eq!(paths.include_dir, Path::new("/usr").join("include").join("aquila"));
        assert_eq!(
            paths.doc_dir,
            Path::new("/usr").join("share").join("doc").join("aquila")
        );
        assert!(paths.base_dir.is_none());
    }

    #[test]
    fn every_supported_identifier_yields_absolute_non_empty_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_under(dir.path());
        for id in Family::supported_identifiers() {
            let layout = Platform::resolve(Some(id)).unwrap().layout(&config);
            let paths = layout.resolve_paths();
            for target in paths.targets() {
                assert!(target.is_absolute(), "{id}: {} not absolute", target.display());
                assert!(!target.as_os_str().is_empty());
            }
        }
    }

    // -----------------------------------------------------------------------
    // prepare
    // -----------------------------------------------------------------------

    #[test]
    fn base_prepare_creates_missing_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("aquila");
        BaseDirectoryLayout::new(&base, "aquila")
            .prepare(&Logger::new(), false)
            .unwrap();
        assert!(base.is_dir());
    }

    #[test]
    fn base_prepare_wipes_existing_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("aquila");
        std::fs::create_dir_all(base.join("bin")).unwrap();
        std::fs::write(base.join("bin/leftover.exe"), "old").unwrap();

        BaseDirectoryLayout::new(&base, "aquila")
            .prepare(&Logger::new(), false)
            .unwrap();

        assert!(base.is_dir());
        assert_eq!(std::fs::read_dir(&base).unwrap().count(), 0);
    }

    #[test]
    fn base_prepare_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("aquila");
        std::fs::create_dir_all(&base).unwrap();
        std::fs::write(base.join("keep.txt"), "keep").unwrap();

        BaseDirectoryLayout::new(&base, "aquila")
            .prepare(&Logger::new(), true)
            .unwrap();
        assert!(base.join("keep.txt").exists());

        let fresh = dir.path().join("fresh");
        BaseDirectoryLayout::new(&fresh, "aquila")
            .prepare(&Logger::new(), true)
            .unwrap();
        assert!(!fresh.exists());
    }

    #[test]
    fn fixed_prepare_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("usr");
        FixedSystemLayout::new(&prefix, "aquila")
            .prepare(&Logger::new(), false)
            .unwrap();
        assert!(!prefix.exists());
    }
}
