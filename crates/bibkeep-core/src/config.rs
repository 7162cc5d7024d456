//! Configuration management for bibkeep.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location.

use crate::error::{BibError, Result};
use crate::label::LabelSuffix;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure for bibkeep.
///
/// ## Example Configuration File (bibkeep.toml)
///
/// ```toml
/// [database]
/// file = "~/papers/literature.yaml"
/// cache = true
///
/// [database.format]
/// author_format = "yaml"
/// label_separator = "_"
/// label_suffix = "alpha"
///
/// [database.stringify.list_separator]
/// tags = ", "
///
/// [search]
/// context = 1
/// grep = "rga"
/// grep_args = ["--no-messages"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Database location and formatting
    pub database: DatabaseConfig,

    /// Search command settings
    pub search: SearchConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file location (None = default location). `~` is expanded.
    pub file: Option<PathBuf>,

    /// Keep a binary cache of the parsed database
    pub cache: bool,

    /// Cache directory (None = platform cache directory)
    pub cache_dir: Option<PathBuf>,

    /// Formatting of stored entries
    pub format: FormatConfig,

    /// String conversion of list fields
    pub stringify: StringifyConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            file: None,
            cache: true,
            cache_dir: None,
            format: FormatConfig::default(),
            stringify: StringifyConfig::default(),
        }
    }
}

/// How the `author` field is written to the database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthorFormat {
    /// A list of structured names (`first`, `last`, `particle`, `suffix`)
    #[default]
    Yaml,
    /// A single BibLaTeX style string joined by `" and "`
    Biblatex,
}

/// Entry formatting options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Storage format of the author list
    pub author_format: AuthorFormat,

    /// String placed between a label and its disambiguation suffix
    pub label_separator: String,

    /// Enumerator used for disambiguation suffixes
    pub label_suffix: LabelSuffix,
}

impl Default for FormatConfig {
    fn default() -> Self {
        FormatConfig {
            author_format: AuthorFormat::Yaml,
            label_separator: "_".to_string(),
            label_suffix: LabelSuffix::Alpha,
        }
    }
}

/// Stringification options
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StringifyConfig {
    /// Separators used to join list fields
    pub list_separator: ListSeparators,
}

/// Per-field separators for list valued fields.
///
/// These are used both to join lists into strings and to split a single
/// delimited string handed to a list field setter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListSeparators {
    pub file: String,
    pub tags: String,
    pub url: String,
}

impl Default for ListSeparators {
    fn default() -> Self {
        ListSeparators {
            file: ", ".to_string(),
            tags: ", ".to_string(),
            url: ", ".to_string(),
        }
    }
}

impl ListSeparators {
    /// The separator configured for a list field, if any.
    pub fn for_field(&self, field: &str) -> Option<&str> {
        match field {
            "file" => Some(&self.file),
            "tags" => Some(&self.tags),
            "url" => Some(&self.url),
            _ => None,
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Default number of context lines around each match
    pub context: usize,

    /// External tool used to search attached files
    pub grep: String,

    /// Extra arguments passed to the external tool
    pub grep_args: Vec<String>,

    /// Search case-insensitively by default
    pub ignore_case: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            context: 1,
            grep: "grep".to_string(),
            grep_args: Vec::new(),
            ignore_case: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| BibError::Config {
            reason: format!("Failed to parse config: {}", e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| BibError::Config {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Check the settings that cannot be expressed through types alone.
    pub fn validate(&self) -> Result<()> {
        if self.search.grep.trim().is_empty() {
            return Err(BibError::Config {
                reason: "search.grep must name a program".to_string(),
            });
        }

        let seps = &self.database.stringify.list_separator;
        for (field, sep) in [("file", &seps.file), ("tags", &seps.tags), ("url", &seps.url)] {
            if sep.is_empty() {
                return Err(BibError::Config {
                    reason: format!(
                        "database.stringify.list_separator.{} must not be empty",
                        field
                    ),
                });
            }
        }

        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.config_dir().join("bibkeep.toml"))
    }

    /// Get the default data directory path.
    pub fn default_data_dir() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the database file (from config or default), with `~` expanded.
    pub fn database_file(&self) -> Result<PathBuf> {
        match self.database.file {
            Some(ref path) => Ok(crate::paths::expand_home(path)),
            None => Ok(Self::default_data_dir()?.join("literature.yaml")),
        }
    }

    /// Get the cache directory, or None when caching is disabled.
    pub fn cache_dir(&self) -> Result<Option<PathBuf>> {
        if !self.database.cache {
            return Ok(None);
        }
        match self.database.cache_dir {
            Some(ref path) => Ok(Some(crate::paths::expand_home(path))),
            None => Ok(Some(project_dirs()?.cache_dir().join("databases"))),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "bibkeep").ok_or_else(|| BibError::Config {
        reason: "Could not determine the platform directories".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.context, 1);
        assert_eq!(config.search.grep, "grep");
        assert_eq!(config.database.format.author_format, AuthorFormat::Yaml);
        assert_eq!(config.database.format.label_suffix, LabelSuffix::Alpha);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let mut config = Config::default();
        config.search.context = 3;
        config.database.format.label_suffix = LabelSuffix::Numeric;
        config.database.stringify.list_separator.tags = "; ".to_string();

        config.save_to(&config_path).unwrap();
        let loaded = Config::load_from(&config_path).unwrap();

        assert_eq!(loaded.search.context, 3);
        assert_eq!(loaded.database.format.label_suffix, LabelSuffix::Numeric);
        assert_eq!(loaded.database.stringify.list_separator.tags, "; ");
    }

    #[test]
    fn test_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.search.context, 1); // Default value
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(
            &config_path,
            "[database.format]\nauthor_format = \"biblatex\"\nlabel_suffix = \"capital\"\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.database.format.author_format, AuthorFormat::Biblatex);
        assert_eq!(config.database.format.label_suffix, LabelSuffix::Capital);
        assert_eq!(config.database.format.label_separator, "_");
        assert_eq!(config.search.grep, "grep");
    }

    #[test]
    fn test_validate_rejects_empty_separator() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        fs::write(&config_path, "[database.stringify.list_separator]\nurl = \"\"\n").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(matches!(err, BibError::Config { .. }));
    }

    #[test]
    fn test_database_file_override() {
        let mut config = Config::default();
        config.database.file = Some(PathBuf::from("/data/lit.yaml"));
        assert_eq!(config.database_file().unwrap(), PathBuf::from("/data/lit.yaml"));

        config.database.cache = false;
        assert!(config.cache_dir().unwrap().is_none());
    }

    #[test]
    fn test_separator_lookup() {
        let seps = ListSeparators::default();
        assert_eq!(seps.for_field("tags"), Some(", "));
        assert_eq!(seps.for_field("title"), None);
    }
}
