//! Installer configuration: built-in defaults, TOML file, and CLI overrides.
//!
//! Values are layered with the same precedence everywhere: a CLI flag beats
//! the config file, which beats the built-in default.  The resolved
//! [`InstallConfig`] is handed to the installer at construction time and is
//! not changed afterwards.
pub mod toml_loader;

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Install root used by the base-directory family when nothing overrides it.
pub const DEFAULT_BASE_DIRECTORY: &str = r"C:\aquila";

/// Prefix used by the fixed-path family when nothing overrides it.
pub const DEFAULT_PREFIX: &str = "/usr";

/// Product name used in install paths.
pub const DEFAULT_PRODUCT: &str = "aquila";

/// One optional layer of settings, as read from a TOML file or collected
/// from command-line flags.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    /// Install root for the base-directory family.
    pub base_directory: Option<PathBuf>,
    /// Prefix for the fixed-path family.
    pub prefix: Option<PathBuf>,
    /// Directory containing `lib/`, `src/` and `doc/`.
    pub source_root: Option<PathBuf>,
    /// Product name used in install paths.
    pub product: Option<String>,
    /// Extra exclusion patterns appended to the defaults.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ConfigLayer {
    /// Read a layer from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// contains unknown keys.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        toml_loader::load_config(path)
    }
}

/// Fully resolved installer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    /// Install root for the base-directory family.
    pub base_directory: PathBuf,
    /// Prefix for the fixed-path family.
    pub prefix: PathBuf,
    /// Explicit source root; `None` means auto-detect next to the executable.
    pub source_root: Option<PathBuf>,
    /// Product name used in install paths.
    pub product: String,
    /// Extra exclusion patterns appended to the defaults.
    pub extra_exclusions: Vec<String>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            base_directory: PathBuf::from(DEFAULT_BASE_DIRECTORY),
            prefix: PathBuf::from(DEFAULT_PREFIX),
            source_root: None,
            product: DEFAULT_PRODUCT.to_string(),
            extra_exclusions: Vec::new(),
        }
    }
}

impl InstallConfig {
    /// Overlay `layer` on top of `self`.
    ///
    /// Scalar settings present in the layer replace the current value;
    /// exclusion patterns accumulate in layer order.
    #[must_use]
    pub fn layered(mut self, layer: ConfigLayer) -> Self {
        if let Some(base) = layer.base_directory {
            self.base_directory = base;
        }
        if let Some(prefix) = layer.prefix {
            self.prefix = prefix;
        }
        if layer.source_root.is_some() {
            self.source_root = layer.source_root;
        }
        if let Some(product) = layer.product {
            self.product = product;
        }
        self.extra_exclusions.extend(layer.exclude);
        self
    }

    /// Build the configuration from defaults, an optional TOML file, and the
    /// CLI layer, then make every path absolute.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or the current
    /// directory is needed to absolutize a relative path and is unavailable.
    pub fn load(config_file: Option<&Path>, cli: ConfigLayer) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = config_file {
            config = config.layered(ConfigLayer::from_file(path)?);
        }
        config.layered(cli).absolutized()
    }

    /// Whether the base directory is still the built-in default.
    ///
    /// The default is a Windows path; on other hosts it only makes sense
    /// when overridden.
    #[must_use]
    pub fn uses_default_base_directory(&self) -> bool {
        let default = Path::new(DEFAULT_BASE_DIRECTORY);
        self.base_directory == default
            || make_absolute(default).is_ok_and(|abs| abs == self.base_directory)
    }

    /// Resolve relative paths against the current working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a relative path is present and the current
    /// directory cannot be determined.
    pub fn absolutized(mut self) -> Result<Self, ConfigError> {
        self.base_directory = make_absolute(&self.base_directory)?;
        self.prefix = make_absolute(&self.prefix)?;
        if let Some(root) = &self.source_root {
            self.source_root = Some(make_absolute(root)?);
        }
        Ok(self)
    }
}

fn make_absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
