//! TOML configuration for colors and thresholds.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```toml
//! [colors]
//! min_occurrences = 3
//!
//! [outbreak]
//! min_cases = 4
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::{DEFAULT_COLOR, DEFAULT_PALETTE, SINGLETON_COLOR};

/// Errors that can occur while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config is not valid TOML or has the wrong shape.
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The config parsed but is unusable.
    #[error("Invalid config: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Color assignment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Color for unknown and not-yet-notable clusters.
    pub default_color: String,
    /// Color for singleton clusters.
    pub singleton_color: String,
    /// Occurrences needed before a cluster gets a palette color.
    pub min_occurrences: u64,
    /// Ordered palette colors are hashed into.
    pub palette: Vec<String>,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            default_color: DEFAULT_COLOR.to_string(),
            singleton_color: SINGLETON_COLOR.to_string(),
            min_occurrences: 2,
            palette: DEFAULT_PALETTE.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Outbreak detection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutbreakConfig {
    /// Aggregate case count across counties that flags a cluster.
    pub min_cases: u64,
}

impl Default for OutbreakConfig {
    fn default() -> Self {
        Self { min_cases: 2 }
    }
}

/// Top-level analytics configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub colors: ColorConfig,
    pub outbreak: OutbreakConfig,
}

impl AnalyticsConfig {
    /// Parses and validates a config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or the values are
    /// unusable.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is malformed, or
    /// holds unusable values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        log::info!(
            "Loaded config from {} ({} palette colors)",
            path.display(),
            config.colors.palette.len()
        );
        Ok(config)
    }

    /// Checks the invariants the color assigner and outbreak detector rely
    /// on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let colors = &self.colors;

        if colors.palette.is_empty() {
            return Err(invalid("colors.palette must not be empty"));
        }
        if colors.min_occurrences == 0 {
            return Err(invalid("colors.min_occurrences must be at least 1"));
        }
        if self.outbreak.min_cases == 0 {
            return Err(invalid("outbreak.min_cases must be at least 1"));
        }
        if colors.default_color.eq_ignore_ascii_case(&colors.singleton_color) {
            return Err(invalid(
                "colors.singleton_color must differ from colors.default_color",
            ));
        }
        for color in &colors.palette {
            if color.eq_ignore_ascii_case(&colors.default_color)
                || color.eq_ignore_ascii_case(&colors.singleton_color)
            {
                return Err(invalid(&format!(
                    "palette color {color} collides with the default or singleton color"
                )));
            }
        }

        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_config_matches_defaults() {
        let bundled = include_str!("../../../mimosa.toml");
        let config = AnalyticsConfig::from_toml_str(bundled).unwrap();
        assert_eq!(config, AnalyticsConfig::default());
    }

    #[test]
    fn defaults_are_valid() {
        AnalyticsConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = AnalyticsConfig::from_toml_str("[outbreak]\nmin_cases = 5\n").unwrap();
        assert_eq!(config.outbreak.min_cases, 5);
        assert_eq!(config.colors, ColorConfig::default());
    }

    #[test]
    fn rejects_empty_palette() {
        let result = AnalyticsConfig::from_toml_str("[colors]\npalette = []\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_zero_thresholds() {
        assert!(AnalyticsConfig::from_toml_str("[colors]\nmin_occurrences = 0\n").is_err());
        assert!(AnalyticsConfig::from_toml_str("[outbreak]\nmin_cases = 0\n").is_err());
    }

    #[test]
    fn rejects_palette_colliding_with_sentinels() {
        let result =
            AnalyticsConfig::from_toml_str("[colors]\npalette = [\"#ffffff\", \"#123456\"]\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            AnalyticsConfig::from_toml_str("[colors\n"),
            Err(ConfigError::Toml(_))
        ));
    }
}
