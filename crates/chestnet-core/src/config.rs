//! Configuration for chestnet
//!
//! Loaded from TOML, overridable from `CHESTNET_*` environment variables, and
//! validated before use. Every field has a default, so an empty file is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{ChestnetError, Result};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "CHESTNET_";

/// Largest string a single persisted record may hold by default
pub const DEFAULT_MAX_RECORD_LEN: usize = 32_767;

/// Default number of containers a remote token may reference
pub const DEFAULT_TOKEN_CAPACITY: usize = 10;

/// What the registry does when persisted state cannot be decoded at open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailurePolicy {
    /// Log the corruption loudly and start with an empty registry
    #[default]
    StartEmpty,
    /// Refuse to open and return the decode error
    Fail,
}

/// Persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Logical key space the registry payload is written under
    pub key_space: String,
    /// Maximum byte length of one atomic record
    pub max_record_len: usize,
    /// Load-time behaviour on corrupt data
    pub decode_failure: DecodeFailurePolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key_space: "chestnet:registry".to_string(),
            max_record_len: DEFAULT_MAX_RECORD_LEN,
            decode_failure: DecodeFailurePolicy::default(),
        }
    }
}

/// Remote token settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Maximum containers per token
    pub capacity: usize,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_TOKEN_CAPACITY,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChestnetConfig {
    /// Persistence settings
    pub storage: StorageConfig,
    /// Remote token settings
    pub token: TokenConfig,
}

impl ChestnetConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ChestnetConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChestnetError::invalid(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Merge overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.apply_env(std::env::vars())
    }

    /// Apply `CHESTNET_*` overrides from the given variables
    ///
    /// Either every override applies and the result validates, or the
    /// configuration is left as it was.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut next = self.clone();
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "KEY_SPACE" => next.storage.key_space = value,
                "MAX_RECORD_LEN" => next.storage.max_record_len = parse_usize(&key, &value)?,
                "DECODE_FAILURE" => {
                    next.storage.decode_failure = match value.trim() {
                        "start_empty" => DecodeFailurePolicy::StartEmpty,
                        "fail" => DecodeFailurePolicy::Fail,
                        other => {
                            return Err(ChestnetError::invalid(format!(
                                "{key} must be start_empty or fail (got {other:?})"
                            )))
                        }
                    }
                }
                "TOKEN_CAPACITY" => next.token.capacity = parse_usize(&key, &value)?,
                _ => {}
            }
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let key_space = &self.storage.key_space;
        if key_space.is_empty() {
            return Err(ChestnetError::invalid("Field 'storage.key_space' is required"));
        }
        if key_space.contains(['/', '\n', '\r']) {
            return Err(ChestnetError::invalid(format!(
                "Field 'storage.key_space' may not contain '/' or line breaks (got {key_space:?})"
            )));
        }
        // one UTF-8 scalar must always fit in a record
        if self.storage.max_record_len < 4 {
            return Err(ChestnetError::invalid(format!(
                "Field 'storage.max_record_len' must be at least 4 (got {})",
                self.storage.max_record_len
            )));
        }
        if self.token.capacity == 0 {
            return Err(ChestnetError::invalid(
                "Field 'token.capacity' must be at least 1",
            ));
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| ChestnetError::invalid(format!("{key} must be an integer (got {value:?})")))
}
