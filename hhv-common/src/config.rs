//! Configuration loading and data layout
//!
//! Bootstrap settings are resolved in priority order:
//! 1. Command-line argument or environment variable (handled by the binary's clap args)
//! 2. TOML config file
//! 3. Compiled defaults
//!
//! A missing TOML file is not an error; compiled defaults are used instead.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::model::ReviewerCategory;
use crate::{Error, Result};

/// Default HTTP port for hhv-review
pub const DEFAULT_PORT: u16 = 5780;

/// Default bind host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Source tree directory (relative to root folder)
pub const SOURCE_DIR: &str = "Data_refined";

/// Validated output tree directory (relative to root folder)
pub const VALIDATED_DIR: &str = "data_refined_validated";

/// Ledger directory (relative to the validated output tree)
pub const LEDGER_DIR: &str = "processed_ids";

/// File name of each folder's JSONL partition, in both trees
pub const PARTITION_FILE: &str = "train.jsonl";

/// Folders reviewed by each category
///
/// Order matters: the general category round-robins in this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderLayout {
    pub general: Vec<String>,
    pub lawyers: Vec<String>,
}

impl Default for FolderLayout {
    fn default() -> Self {
        Self {
            general: vec![
                "harmless-base".to_string(),
                "helpful-base".to_string(),
                "helpful-online".to_string(),
                "helpful-rejections-sampled".to_string(),
            ],
            lawyers: vec!["red-team-attempts".to_string()],
        }
    }
}

impl FolderLayout {
    /// Folders configured for a category, in review order
    pub fn folders(&self, category: ReviewerCategory) -> &[String] {
        match category {
            ReviewerCategory::General => &self.general,
            ReviewerCategory::Lawyers => &self.lawyers,
        }
    }

    /// Whether `folder` belongs to `category`
    pub fn contains(&self, category: ReviewerCategory, folder: &str) -> bool {
        self.folders(category).iter().any(|f| f == folder)
    }

    /// Check the layout is usable
    ///
    /// General needs at least one folder, lawyers exactly one, and every
    /// folder name must be a single path component.
    pub fn validate(&self) -> Result<()> {
        if self.general.is_empty() {
            return Err(Error::Config("folders.general must list at least one folder".to_string()));
        }
        if self.lawyers.len() != 1 {
            return Err(Error::Config(format!(
                "folders.lawyers must list exactly one folder (found {})",
                self.lawyers.len()
            )));
        }
        for name in self.general.iter().chain(self.lawyers.iter()) {
            if !is_valid_folder_name(name) {
                return Err(Error::Config(format!("Invalid folder name: {:?}", name)));
            }
        }
        Ok(())
    }
}

/// Folder names become path components, so reject separators and dot entries
pub fn is_valid_folder_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub bind_host: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub folders: Option<FolderLayout>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load the explicit config file, or the per-user default if it exists
    ///
    /// An explicit path that cannot be read is an error. A missing default
    /// file falls back to compiled defaults with a warning.
    pub fn load_or_default(explicit: Option<&Path>, module_name: &str) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match default_config_path(module_name) {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                warn!("Config file not found at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Per-user config file path: `<config_dir>/hhv/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hhv").join(format!("{}.toml", module_name)))
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub folders: FolderLayout,
}

impl ServiceConfig {
    /// Merge command-line overrides over TOML values over compiled defaults
    pub fn resolve(
        cli_root: Option<PathBuf>,
        cli_port: Option<u16>,
        toml_config: TomlConfig,
    ) -> Result<Self> {
        let root_folder = cli_root
            .or(toml_config.root_folder)
            .unwrap_or_else(|| PathBuf::from("."));

        let folders = toml_config.folders.unwrap_or_default();
        folders.validate()?;

        Ok(Self {
            root_folder,
            host: toml_config
                .bind_host
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli_port.or(toml_config.port).unwrap_or(DEFAULT_PORT),
            log_level: toml_config.logging.level,
            folders,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn paths(&self) -> DataPaths {
        DataPaths::new(self.root_folder.clone())
    }
}

/// On-disk layout under the root folder
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/Data_refined/<folder>/train.jsonl`
    pub fn source_file(&self, folder: &str) -> PathBuf {
        self.root.join(SOURCE_DIR).join(folder).join(PARTITION_FILE)
    }

    /// `<root>/data_refined_validated/<folder>/train.jsonl`
    pub fn validated_file(&self, folder: &str) -> PathBuf {
        self.root.join(VALIDATED_DIR).join(folder).join(PARTITION_FILE)
    }

    /// `<root>/data_refined_validated/processed_ids/<category>.json`
    pub fn ledger_file(&self, category: ReviewerCategory) -> PathBuf {
        self.root
            .join(VALIDATED_DIR)
            .join(LEDGER_DIR)
            .join(format!("{}.json", category.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_matches_dataset_split() {
        let layout = FolderLayout::default();
        assert_eq!(layout.folders(ReviewerCategory::General).len(), 4);
        assert_eq!(layout.folders(ReviewerCategory::Lawyers), ["red-team-attempts"]);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_contains_is_category_scoped() {
        let layout = FolderLayout::default();
        assert!(layout.contains(ReviewerCategory::General, "helpful-base"));
        assert!(!layout.contains(ReviewerCategory::Lawyers, "helpful-base"));
        assert!(layout.contains(ReviewerCategory::Lawyers, "red-team-attempts"));
    }

    #[test]
    fn test_validate_rejects_bad_layouts() {
        let empty_general = FolderLayout {
            general: vec![],
            lawyers: vec!["x".to_string()],
        };
        assert!(empty_general.validate().is_err());

        let two_lawyer_folders = FolderLayout {
            general: vec!["a".to_string()],
            lawyers: vec!["x".to_string(), "y".to_string()],
        };
        assert!(two_lawyer_folders.validate().is_err());

        let traversal = FolderLayout {
            general: vec!["../etc".to_string()],
            lawyers: vec!["x".to_string()],
        };
        assert!(traversal.validate().is_err());
    }

    #[test]
    fn test_folder_name_rules() {
        assert!(is_valid_folder_name("helpful-base"));
        assert!(!is_valid_folder_name(""));
        assert!(!is_valid_folder_name(".."));
        assert!(!is_valid_folder_name("a/b"));
        assert!(!is_valid_folder_name("a\\b"));
    }

    #[test]
    fn test_paths_layout() {
        let paths = DataPaths::new("/srv/hh");
        assert_eq!(
            paths.source_file("helpful-base"),
            PathBuf::from("/srv/hh/Data_refined/helpful-base/train.jsonl")
        );
        assert_eq!(
            paths.validated_file("helpful-base"),
            PathBuf::from("/srv/hh/data_refined_validated/helpful-base/train.jsonl")
        );
        assert_eq!(
            paths.ledger_file(ReviewerCategory::Lawyers),
            PathBuf::from("/srv/hh/data_refined_validated/processed_ids/lawyers.json")
        );
    }
}
