//! Runtime settings loaded from JSON.
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// ```json
/// {
///   "memoization": true,
///   "parallel_batches": false,
///   "inputs": { "scaled": { "scale": { "Float": 2.0 } } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Initial memoization flag of modules added to a manager.
    pub memoization: bool,
    /// Run batches on the rayon pool instead of in sequence.
    pub parallel_batches: bool,
    /// Input overrides by module key, then input name.
    pub inputs: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { memoization: true, parallel_batches: true, inputs: BTreeMap::new() }
    }
}

impl RuntimeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
