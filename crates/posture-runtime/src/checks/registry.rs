//! Registry of check providers, keyed by check name.
//!
//! ## Usage
//!
//! ```ignore
//! let mut registry = CheckRegistry::new();
//! registry.register(Arc::new(DiskEncryptionCheck::new()));
//!
//! let provider = registry.lookup("diskEncryption")?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::CheckProvider;
use crate::EvaluationError;

/// Maps check names to the providers that measure them.
#[derive(Default, Clone)]
pub struct CheckRegistry {
    providers: BTreeMap<String, Arc<dyn CheckProvider>>,
}

impl CheckRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name.
    ///
    /// If a provider with the same name already exists, it will be replaced.
    pub fn register(&mut self, provider: Arc<dyn CheckProvider>) {
        let name = provider.name().to_string();
        if self.providers.insert(name.clone(), provider).is_some() {
            tracing::debug!(check = %name, "replaced registered check provider");
        }
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, provider: Arc<dyn CheckProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Get the provider registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn CheckProvider>> {
        self.providers.get(name)
    }

    /// Get the provider registered under `name`, or fail with `UnknownCheck`.
    pub fn lookup(&self, name: &str) -> Result<&Arc<dyn CheckProvider>, EvaluationError> {
        self.get(name)
            .ok_or_else(|| EvaluationError::UnknownCheck(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered check names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckRegistry")
            .field("checks", &self.names())
            .finish()
    }
}
