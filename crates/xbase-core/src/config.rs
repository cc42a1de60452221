//! Front-end configuration (`xbase.toml`) parsing and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// File name looked up by [`FrontendConfig::discover`].
pub const CONFIG_FILE: &str = "xbase.toml";

/// Errors that can occur when loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid source extension '{0}': {1}")]
    InvalidExtension(String, &'static str),
}

/// The complete `xbase.toml` configuration. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrontendConfig {
    /// Preprocessing applied before lexing.
    pub preprocess: PreprocessConfig,

    /// Which files count as sources.
    pub source: SourceConfig,

    /// Diagnostic reporting limits.
    pub report: ReportConfig,
}

/// `[preprocess]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreprocessConfig {
    /// Remove `#include`/`#define`/... lines before lexing.
    #[serde(rename = "strip-directives")]
    pub strip_directives: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            strip_directives: true,
        }
    }
}

/// `[source]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Extensions (without the dot) picked up when walking directories.
    pub extensions: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["prg".to_string(), "ch".to_string()],
        }
    }
}

/// `[report]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Maximum diagnostics printed per file; 0 means unlimited.
    #[serde(rename = "max-diagnostics")]
    pub max_diagnostics: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_diagnostics: 100,
        }
    }
}

impl FrontendConfig {
    /// Load a configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        log::debug!("loading config from {}", path.as_ref().display());
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid, names unknown keys, or lists
    /// an unusable extension.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `dir/xbase.toml` if it exists, otherwise return the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn discover(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(CONFIG_FILE);
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// True if `path` has one of the configured source extensions
    /// (compared without regard to ASCII case).
    #[must_use]
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.source
                    .extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for ext in &self.source.extensions {
            if ext.is_empty() {
                return Err(ConfigError::InvalidExtension(
                    ext.clone(),
                    "extension cannot be empty",
                ));
            }
            if ext.contains(['.', '/', '\\']) {
                return Err(ConfigError::InvalidExtension(
                    ext.clone(),
                    "write the extension without dots or separators",
                ));
            }
        }
        Ok(())
    }
}
