//! Check-name indirection.
//!
//! A logical check name in a policy may be measured by a provider registered
//! under a different name (e.g. a newer revision of the same check). The
//! alias is consulted only when dispatching; results and requirements stay
//! under the logical name.

use std::collections::BTreeMap;

use crate::config::ConfigError;

/// Aliases applied by the versioned report unless disabled in config.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[("osVersion", "osVersionV2")];

/// Logical check name → provider name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameIndirection {
    aliases: BTreeMap<String, String>,
}

impl NameIndirection {
    /// An empty table: every check dispatches under its own name.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table used by the versioned report.
    pub fn versioned_defaults() -> Self {
        let aliases = DEFAULT_ALIASES
            .iter()
            .map(|(logical, provider)| (logical.to_string(), provider.to_string()))
            .collect();
        Self { aliases }
    }

    /// Add or replace an alias.
    pub fn insert(
        &mut self,
        logical: impl Into<String>,
        provider: impl Into<String>,
    ) -> Result<(), ConfigError> {
        let logical = logical.into();
        let provider = provider.into();
        if logical.is_empty() || provider.is_empty() {
            return Err(ConfigError::InvalidAlias(format!(
                "'{}' -> '{}': names must not be empty",
                logical, provider
            )));
        }
        self.aliases.insert(logical, provider);
        Ok(())
    }

    /// Name to dispatch `logical` under. One hop only; aliases do not chain.
    pub fn dispatch_name<'a>(&'a self, logical: &'a str) -> &'a str {
        self.aliases
            .get(logical)
            .map(|provider| provider.as_str())
            .unwrap_or(logical)
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(l, p)| (l.as_str(), p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = NameIndirection::versioned_defaults();
        assert_eq!(table.dispatch_name("osVersion"), "osVersionV2");
        assert_eq!(table.dispatch_name("firewall"), "firewall");
    }

    #[test]
    fn test_aliases_do_not_chain() {
        let mut table = NameIndirection::new();
        table.insert("a", "b").unwrap();
        table.insert("b", "c").unwrap();
        assert_eq!(table.dispatch_name("a"), "b");
    }

    #[test]
    fn test_empty_alias_rejected() {
        let mut table = NameIndirection::new();
        assert!(matches!(
            table.insert("osVersion", ""),
            Err(ConfigError::InvalidAlias(_))
        ));
    }
}
