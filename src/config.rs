//! Asset configuration (`wadkit.toml`).
//!
//! ```toml
//! app_name = "ImDoom64"
//! base_files = ["doom64.rom"]
//! extra_files = ["imdoom64.pk3"]
//!
//! [search]
//! dir_hint = "/games/doom64/"
//! system_dirs = ["/usr/share/doom/"]
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::discovery::{SearchPaths, default_system_dirs, exe_dir, user_data_dir};

/// Which data files to load and where to look for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Names the per-user data directory (default: "ImDoom64")
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Base data candidates, tried in order until one opens (default: doom64.rom)
    #[serde(default = "default_base_files")]
    pub base_files: Vec<String>,
    /// Supplementary packages added after the base; each is required
    #[serde(default = "default_extra_files")]
    pub extra_files: Vec<String>,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Directory probed before all others
    #[serde(default)]
    pub dir_hint: Option<PathBuf>,
    /// System install locations, probed last
    #[serde(default = "default_system_dirs")]
    pub system_dirs: Vec<PathBuf>,
}

fn default_app_name() -> String {
    "ImDoom64".to_string()
}
fn default_base_files() -> Vec<String> {
    vec!["doom64.rom".to_string()]
}
fn default_extra_files() -> Vec<String> {
    vec!["imdoom64.pk3".to_string()]
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            base_files: default_base_files(),
            extra_files: default_extra_files(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            dir_hint: None,
            system_dirs: default_system_dirs(),
        }
    }
}

impl AssetConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(s) => Self::from_toml_str(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Search paths for this configuration on the current platform.
    pub fn search_paths(&self) -> SearchPaths {
        SearchPaths {
            base_dir: exe_dir(),
            data_dir: user_data_dir(&self.app_name),
            system_dirs: self.search.system_dirs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================================
    // Default value tests
    // =============================================================

    #[test]
    fn test_config_default() {
        let config = AssetConfig::default();
        assert_eq!(config.app_name, "ImDoom64");
        assert_eq!(config.base_files, ["doom64.rom"]);
        assert_eq!(config.extra_files, ["imdoom64.pk3"]);
        assert_eq!(config.search.dir_hint, None);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(AssetConfig::from_toml_str("").unwrap(), AssetConfig::default());
    }

    // =============================================================
    // Parsing tests
    // =============================================================

    #[test]
    fn test_partial_toml() {
        let config = AssetConfig::from_toml_str(
            r#"
            base_files = ["doom64.z64", "doom64.rom"]

            [search]
            dir_hint = "/games/"
            "#,
        )
        .unwrap();
        assert_eq!(config.base_files, ["doom64.z64", "doom64.rom"]);
        assert_eq!(config.extra_files, ["imdoom64.pk3"]);
        assert_eq!(config.search.dir_hint, Some(PathBuf::from("/games/")));
        assert_eq!(config.search.system_dirs, default_system_dirs());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            AssetConfig::from_toml_str("base_files = 3"),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_roundtrip() {
        let mut config = AssetConfig::default();
        config.extra_files.push("mod.pk3".into());
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(AssetConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AssetConfig::load(&dir.path().join("wadkit.toml")).unwrap();
        assert_eq!(config, AssetConfig::default());
    }
}
