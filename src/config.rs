//! Polycalc Configuration
//!
//! Handles parsing of polycalc.toml and the `POLYCALC_LIBRARY_PATH`
//! search-path augmentation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ffi::{LibraryFamily, LibraryLocator};

/// Config file name searched for by [`PolycalcConfig::find_and_load`].
pub const CONFIG_FILE_NAME: &str = "polycalc.toml";

/// Environment variable holding extra library directories (platform path-list syntax).
pub const LIBRARY_PATH_ENV: &str = "POLYCALC_LIBRARY_PATH";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching polycalc.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PolycalcConfig {
    /// Library search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Logical library names per family
    #[serde(default)]
    pub libraries: LibrariesConfig,
}

impl PolycalcConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: PolycalcConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                return Ok(Self::default());
            }
        }
    }

    /// Directories from `POLYCALC_LIBRARY_PATH`, in order.
    pub fn env_library_dirs() -> Vec<PathBuf> {
        std::env::var_os(LIBRARY_PATH_ENV)
            .map(|value| {
                std::env::split_paths(&value)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Locator for a family: env dirs, then `extra_dirs`, then the family defaults.
    pub fn locator_for(&self, family: LibraryFamily) -> LibraryLocator {
        self.locator_with_env(family, Self::env_library_dirs())
    }

    /// Same as [`locator_for`](Self::locator_for) with explicit environment dirs.
    pub fn locator_with_env(&self, family: LibraryFamily, env_dirs: Vec<PathBuf>) -> LibraryLocator {
        let base = match &self.search.project_root {
            Some(root) => LibraryLocator::for_family_at(family, root),
            None => LibraryLocator::for_family(family),
        };

        let mut locator = base
            .with_name(self.libraries.name_for(family))
            .with_dirs(env_dirs.iter().chain(self.search.extra_dirs.iter()));

        if !self.search.system_default {
            locator = locator.without_system_default();
        }
        locator
    }
}

/// Library search settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Directories tried before the family defaults
    #[serde(default)]
    pub extra_dirs: Vec<PathBuf>,

    /// Root the `build/...` directories are relative to (defaults to the crate root)
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// Fall back to the platform loader's own search
    #[serde(default = "default_true")]
    pub system_default: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            extra_dirs: Vec::new(),
            project_root: None,
            system_default: true,
        }
    }
}

/// Logical library names per family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibrariesConfig {
    /// C integer/bitwise library
    #[serde(default = "default_integer")]
    pub integer: String,

    /// Assembly numeric library
    #[serde(default = "default_numeric")]
    pub numeric: String,

    /// Calculator C ABI library
    #[serde(default = "default_calculator")]
    pub calculator: String,
}

fn default_integer() -> String {
    LibraryFamily::Integer.default_library_name().to_string()
}

fn default_numeric() -> String {
    LibraryFamily::Numeric.default_library_name().to_string()
}

fn default_calculator() -> String {
    LibraryFamily::Calculator.default_library_name().to_string()
}

impl LibrariesConfig {
    /// Configured name for a family
    pub fn name_for(&self, family: LibraryFamily) -> &str {
        match family {
            LibraryFamily::Integer => &self.integer,
            LibraryFamily::Numeric => &self.numeric,
            LibraryFamily::Calculator => &self.calculator,
        }
    }
}

impl Default for LibrariesConfig {
    fn default() -> Self {
        Self {
            integer: default_integer(),
            numeric: default_numeric(),
            calculator: default_calculator(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::ResolutionStrategy;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let config: PolycalcConfig = toml::from_str(
            r#"
            [search]
            extra_dirs = ["/opt/native/lib"]
            system_default = false

            [libraries]
            integer = "my_math"
            "#,
        )
        .unwrap();

        assert_eq!(config.search.extra_dirs, vec![PathBuf::from("/opt/native/lib")]);
        assert!(!config.search.system_default);
        assert_eq!(config.libraries.integer, "my_math");
        assert_eq!(config.libraries.numeric, "asm_math_ops");
        assert_eq!(config.libraries.calculator, "cpp_calculator");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: PolycalcConfig = toml::from_str("").unwrap();
        assert_eq!(config, PolycalcConfig::default());
        assert!(config.search.system_default);
    }

    #[test]
    fn test_find_and_load_walks_up() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            root.path().join(CONFIG_FILE_NAME),
            "[libraries]\ncalculator = \"calc_v2\"\n",
        )
        .unwrap();

        let config = PolycalcConfig::find_and_load(&nested).unwrap();
        assert_eq!(config.libraries.calculator, "calc_v2");
    }

    #[test]
    fn test_load_missing_file() {
        let root = TempDir::new().unwrap();
        let err = PolycalcConfig::load(&root.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let root = TempDir::new().unwrap();
        let path = root.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[search\nextra_dirs = 3").unwrap();
        assert!(matches!(
            PolycalcConfig::load(&path).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_locator_order_env_then_extra_then_family() {
        let config = PolycalcConfig {
            search: SearchConfig {
                extra_dirs: vec![PathBuf::from("/extra")],
                project_root: Some(PathBuf::from("/proj")),
                system_default: true,
            },
            libraries: LibrariesConfig::default(),
        };

        let locator =
            config.locator_with_env(LibraryFamily::Numeric, vec![PathBuf::from("/from-env")]);
        let dirs = locator.search_dirs();
        assert_eq!(dirs[0], PathBuf::from("/from-env"));
        assert_eq!(dirs[1], PathBuf::from("/extra"));
        assert_eq!(dirs[2], PathBuf::from("/proj/build/lib"));
        assert_eq!(
            locator.strategies().last(),
            Some(&ResolutionStrategy::SystemDefault)
        );
        assert_eq!(locator.name(), "asm_math_ops");
    }

    #[test]
    fn test_locator_without_system_default() {
        let mut config = PolycalcConfig::default();
        config.search.system_default = false;
        config.libraries.integer = "renamed".to_string();

        let locator = config.locator_with_env(LibraryFamily::Integer, Vec::new());
        assert!(!locator
            .strategies()
            .contains(&ResolutionStrategy::SystemDefault));
        assert_eq!(locator.name(), "renamed");
    }
}
