//! Runtime configuration.
//!
//! ```yaml
//! dispatch: concurrent
//! aggregation: last_write
//! use_default_aliases: true
//! aliases:
//!   firewall: firewallV3
//! ```
//!
//! Defaults: sequential dispatch, last-write aggregation, built-in aliases on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use posture_core::StatusAggregation;

use crate::dispatch::NameIndirection;

/// Errors from loading configuration or fixtures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid alias {0}")]
    InvalidAlias(String),
}

/// How providers are invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Await each provider in declaration order. Fail-fast stops invoking
    /// providers after the first violation.
    #[default]
    Sequential,

    /// Start every provider at once, then reduce results in declaration
    /// order. Decisions match sequential mode, but fail-fast still invokes
    /// every check.
    Concurrent,
}

/// Configuration for the policy evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Provider invocation mode
    pub dispatch: DispatchMode,

    /// Aggregate reducer for the versioned report
    pub aggregation: StatusAggregation,

    /// Include the built-in alias table in the versioned report
    pub use_default_aliases: bool,

    /// Extra aliases (logical → provider), applied after the defaults
    pub aliases: BTreeMap<String, String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::Sequential,
            aggregation: StatusAggregation::LastWrite,
            use_default_aliases: true,
            aliases: BTreeMap::new(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; `.json` is read as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_aggregation(mut self, aggregation: StatusAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_default_aliases(mut self, enabled: bool) -> Self {
        self.use_default_aliases = enabled;
        self
    }

    pub fn with_alias(mut self, logical: impl Into<String>, provider: impl Into<String>) -> Self {
        self.aliases.insert(logical.into(), provider.into());
        self
    }

    /// Alias table for the versioned report.
    pub fn name_indirection(&self) -> Result<NameIndirection, ConfigError> {
        let mut table = if self.use_default_aliases {
            NameIndirection::versioned_defaults()
        } else {
            NameIndirection::new()
        };
        for (logical, provider) in &self.aliases {
            table.insert(logical.as_str(), provider.as_str())?;
        }
        Ok(table)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.name_indirection().map(|_| ())
    }
}
