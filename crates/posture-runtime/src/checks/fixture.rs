//! Fixed-outcome checks.
//!
//! Used to replay recorded measurements: an outcome fixture maps check
//! names to the outcome each check reported.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use posture_core::{EvaluationRequest, Outcome};

use super::{CheckError, CheckProvider, CheckRegistry};
use crate::config::ConfigError;

/// A check that always reports the same outcome.
#[derive(Debug, Clone)]
pub struct StaticCheck {
    name: String,
    outcome: Outcome,
}

impl StaticCheck {
    pub fn new(name: impl Into<String>, outcome: impl Into<Outcome>) -> Self {
        Self {
            name: name.into(),
            outcome: outcome.into(),
        }
    }
}

#[async_trait]
impl CheckProvider for StaticCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self, _request: &EvaluationRequest) -> Result<Outcome, CheckError> {
        Ok(self.outcome.clone())
    }
}

/// Recorded outcomes, keyed by check name.
///
/// ```yaml
/// osVersionV2: NUDGE
/// diskEncryption: UNSUPPORTED
/// firewall: true
/// profiles:
///   - { name: corp-wifi, passing: true }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeFixture {
    outcomes: BTreeMap<String, Outcome>,
}

impl OutcomeFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, check: impl Into<String>, outcome: impl Into<Outcome>) -> Self {
        self.outcomes.insert(check.into(), outcome.into());
        self
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a fixture file; `.json` is read as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    pub fn get(&self, check: &str) -> Option<&Outcome> {
        self.outcomes.get(check)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// One [`StaticCheck`] per recorded outcome.
    pub fn into_registry(self) -> CheckRegistry {
        let mut registry = CheckRegistry::new();
        for (name, outcome) in self.outcomes {
            registry.register(Arc::new(StaticCheck::new(name, outcome)));
        }
        registry
    }
}
