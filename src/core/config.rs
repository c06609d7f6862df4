//! Observable configuration
//!
//! Loaded from JSON; every field is optional and falls back to [`Default`].

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default capacity for the async event bus bridge
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// How `subscribe` treats a callback that is already registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Append every registration; the same callback fires once per entry
    #[default]
    Allow,
    /// Keep a single entry per callback allocation and hand back its token
    Reject,
}

/// Configuration for an [`Observable`](crate::Observable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservableConfig {
    /// Name used in log fields and metric labels
    pub name: String,
    /// Duplicate subscription handling
    pub duplicates: DuplicatePolicy,
    /// Buffer size for the async bridge before lagging receivers drop events
    pub bus_capacity: usize,
}

impl Default for ObservableConfig {
    fn default() -> Self {
        Self {
            name: "observable".to_string(),
            duplicates: DuplicatePolicy::Allow,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

impl ObservableConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus_capacity == 0 {
            return Err(ConfigError::InvalidBusCapacity);
        }
        Ok(())
    }
}
