//! Binder configuration.
//!
//! # Configuration File Format
//!
//! ```toml
//! delimiter = "."
//! max_body_size = 1048576
//! decode_json_body = true
//! ```

use crate::body::DEFAULT_MAX_BODY_SIZE;
use crate::schema::DEFAULT_DELIMITER;
use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// Settings shared by binders built from the same configuration.
///
/// # Example
///
/// ```rust
/// use reqbind::BinderConfig;
///
/// let config = BinderConfig::from_toml_str(r#"delimiter = "__""#).unwrap();
///
/// assert_eq!(config.delimiter, "__");
/// assert_eq!(config.max_body_size, 1024 * 1024);
/// assert!(config.decode_json_body);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BinderConfig {
    /// Separator joining nested field names into bind keys.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Largest request body, in bytes, the body pass will decode.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Decode `application/json` bodies before the other sources.
    #[serde(default = "default_true")]
    pub decode_json_body: bool,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            max_body_size: default_max_body_size(),
            decode_json_body: true,
        }
    }
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

fn default_true() -> bool {
    true
}

impl BinderConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Toml` for malformed input or unknown keys, and
    /// `ConfigError::InvalidValue` if validation fails.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the delimiter is empty or the
    /// body limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delimiter.is_empty() {
            return Err(ConfigError::invalid_value("delimiter", "must not be empty"));
        }

        if self.max_body_size == 0 {
            return Err(ConfigError::invalid_value(
                "max_body_size",
                "must be greater than zero",
            ));
        }

        Ok(())
    }
}
