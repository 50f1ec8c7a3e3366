//! Configuration for template discovery and composition
//!
//! A [`Config`] carries the filesystem conventions the engine depends on:
//! where the template root lives, how group and hidden directories are
//! named, and which file extensions mark literal and function templates.
//! It is passed explicitly into every entry point.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::path::ARRAY_SEG;

/// File name probed in the working directory when no config path is given
pub const DEFAULT_CONFIG_FILE: &str = "tempstack.toml";

/// Environment variable overriding [`Config::template_dir`]
pub const ENV_TEMPLATE_DIR: &str = "TEMPSTACK_TEMPLATE_DIR";

/// Environment variable overriding [`Config::group_prefix`]
pub const ENV_GROUP_PREFIX: &str = "TEMPSTACK_GROUP_PREFIX";

/// Errors that can occur when loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Classification of a directory name inside the template tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirKind {
    /// Ordinary directory, contributes one mount segment
    Anchor,
    /// Transparent variant layer, never part of the mount path
    Group,
    /// Never traversed implicitly
    Hidden,
    /// The literal `[]` list-contribution marker
    List,
}

/// Conventions shared by discovery, retrieval, and rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Root directory of the template tree
    pub template_dir: PathBuf,

    /// Prefix marking group directories (e.g. `.dark`)
    pub group_prefix: String,

    /// Prefix marking hidden directories
    pub hidden_prefix: String,

    /// Extension of literal data files, without the leading dot
    pub literal_ext: String,

    /// Extension of function (generator) files, without the leading dot
    pub function_ext: String,

    /// Maximum nesting of composition calls before a render is aborted
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("./templates"),
            group_prefix: ".".to_string(),
            hidden_prefix: ".".to_string(),
            literal_ext: "json".to_string(),
            function_ext: "gen".to_string(),
            max_depth: 64,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the template root directory
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    /// Set the group directory prefix
    pub fn with_group_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.group_prefix = prefix.into();
        self
    }

    /// Set the hidden directory prefix
    pub fn with_hidden_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.hidden_prefix = prefix.into();
        self
    }

    /// Set the literal and function file extensions
    pub fn with_extensions(mut self, literal: impl Into<String>, function: impl Into<String>) -> Self {
        self.literal_ext = literal.into();
        self.function_ext = function.into();
        self
    }

    /// Set the composition depth limit
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_str(&content)?;
        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML string
    ///
    /// Every key is optional; missing keys keep their defaults.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    ///
    /// 1. The explicit path, if given (failures are returned)
    /// 2. `./tempstack.toml`, if present (failures are logged, defaults used)
    /// 3. Defaults
    ///
    /// Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    match Self::from_file(&local) {
                        Ok(config) => config,
                        Err(e) => {
                            warn!("Failed to load config from {}: {}", local.display(), e);
                            Self::default()
                        }
                    }
                } else {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };

        if let Ok(dir) = std::env::var(ENV_TEMPLATE_DIR) {
            debug!(%dir, "load: template dir from environment");
            config.template_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = std::env::var(ENV_GROUP_PREFIX) {
            debug!(%prefix, "load: group prefix from environment");
            config.group_prefix = prefix;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the conventions are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.group_prefix.is_empty() {
            return Err(ConfigError::Invalid("group-prefix must not be empty".into()));
        }
        if self.hidden_prefix.is_empty() {
            return Err(ConfigError::Invalid("hidden-prefix must not be empty".into()));
        }
        if self.group_prefix == ARRAY_SEG {
            return Err(ConfigError::Invalid(format!(
                "group-prefix must not be the list marker '{}'",
                ARRAY_SEG
            )));
        }
        for (key, ext) in [("literal-ext", &self.literal_ext), ("function-ext", &self.function_ext)] {
            if ext.is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", key)));
            }
            if ext.starts_with('.') {
                return Err(ConfigError::Invalid(format!(
                    "{} must be given without a leading dot: '{}'",
                    key, ext
                )));
            }
        }
        if self.literal_ext == self.function_ext {
            return Err(ConfigError::Invalid(format!(
                "literal-ext and function-ext must differ (both '{}')",
                self.literal_ext
            )));
        }
        Ok(())
    }

    /// Classify a directory name
    ///
    /// Group is tested before hidden: when both prefixes are equal, every
    /// group directory is also a hidden one and is treated as a group.
    pub fn classify(&self, name: &str) -> DirKind {
        if name == ARRAY_SEG {
            DirKind::List
        } else if name.starts_with(&self.group_prefix) {
            DirKind::Group
        } else if name.starts_with(&self.hidden_prefix) {
            DirKind::Hidden
        } else {
            DirKind::Anchor
        }
    }

    /// Directory name hosting the named group
    pub fn group_dir(&self, group: &str) -> String {
        format!("{}{}", self.group_prefix, group)
    }

    /// File name of the literal template for a tag
    pub fn literal_filename(&self, tag: &str) -> String {
        format!("{}.{}", tag, self.literal_ext)
    }

    /// File name of the function template for a tag
    pub fn function_filename(&self, tag: &str) -> String {
        format!("{}.{}", tag, self.function_ext)
    }

    /// Whether a name ends with one of the reserved extensions
    pub fn has_reserved_extension(&self, name: &str) -> bool {
        name.ends_with(&format!(".{}", self.literal_ext)) || name.ends_with(&format!(".{}", self.function_ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.template_dir, PathBuf::from("./templates"));
        assert_eq!(config.group_prefix, ".");
        assert_eq!(config.hidden_prefix, ".");
        assert_eq!(config.literal_ext, "json");
        assert_eq!(config.function_ext, "gen");
        assert_eq!(config.max_depth, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = Config::new()
            .with_template_dir("/srv/templates")
            .with_group_prefix("_")
            .with_extensions("data", "tpl")
            .with_max_depth(8);

        assert_eq!(config.template_dir, PathBuf::from("/srv/templates"));
        assert_eq!(config.group_prefix, "_");
        assert_eq!(config.literal_filename("red"), "red.data");
        assert_eq!(config.function_filename("red"), "red.tpl");
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn test_parse_toml_partial() {
        let config = Config::from_str(
            r#"
template-dir = "tpl"
group-prefix = "+"
"#,
        )
        .expect("Should parse");
        assert_eq!(config.template_dir, PathBuf::from("tpl"));
        assert_eq!(config.group_prefix, "+");
        assert_eq!(config.literal_ext, "json");
    }

    #[test]
    fn test_invalid_toml_error() {
        let result = Config::from_str("this is not valid toml {{{{");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_equal_extensions() {
        let config = Config::new().with_extensions("json", "json");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_dotted_extension() {
        let config = Config::new().with_extensions(".json", "gen");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_classify_equal_prefixes() {
        let config = Config::default();
        assert_eq!(config.classify("[]"), DirKind::List);
        assert_eq!(config.classify(".dark"), DirKind::Group);
        assert_eq!(config.classify("colors"), DirKind::Anchor);
    }

    #[test]
    fn test_classify_distinct_prefixes() {
        let config = Config::new().with_group_prefix("+");
        assert_eq!(config.classify("+dark"), DirKind::Group);
        assert_eq!(config.classify(".git"), DirKind::Hidden);
        assert_eq!(config.classify("site"), DirKind::Anchor);
    }

    #[test]
    fn test_reserved_extension() {
        let config = Config::default();
        assert!(config.has_reserved_extension("site.json"));
        assert!(config.has_reserved_extension("site.gen"));
        assert!(!config.has_reserved_extension("site"));
        assert!(!config.has_reserved_extension("sitejson"));
    }
}
