//! Policy document parsing from YAML/JSON.

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::RequirementLevel;

/// Name of the aggregate field in a report; no check may use it.
pub const STATUS_KEY: &str = "status";

/// Errors that can occur when loading a policy document.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Failed to read policy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate check: {0}")]
    DuplicateCheck(String),

    #[error("Check name '{0}' is reserved for the aggregate status")]
    ReservedName(String),

    #[error("Check name must not be empty")]
    EmptyName,

    #[error("Policy failed schema validation: {}", .0.join("; "))]
    Schema(Vec<String>),
}

/// Declared requirement for one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    /// Scalar check
    Level(RequirementLevel),

    /// List check; levels align with outcome items by position
    Sequence(Vec<RequirementLevel>),
}

impl Requirement {
    /// Level that governs a scalar outcome.
    ///
    /// A sequence offers no waiver to a scalar outcome, so it is held to
    /// `ALWAYS`.
    pub fn scalar_level(&self) -> RequirementLevel {
        match self {
            Requirement::Level(level) => *level,
            Requirement::Sequence(_) => RequirementLevel::Always,
        }
    }

    /// Level that governs the item at `index` of a list outcome.
    ///
    /// A single level applies to every item. `None` means the item has no
    /// requirement.
    pub fn level_at(&self, index: usize) -> Option<RequirementLevel> {
        match self {
            Requirement::Level(level) => Some(*level),
            Requirement::Sequence(levels) => levels.get(index).copied(),
        }
    }
}

impl From<RequirementLevel> for Requirement {
    fn from(level: RequirementLevel) -> Self {
        Requirement::Level(level)
    }
}

impl From<Vec<RequirementLevel>> for Requirement {
    fn from(levels: Vec<RequirementLevel>) -> Self {
        Requirement::Sequence(levels)
    }
}

/// An ordered check-name → requirement mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocument {
    entries: Vec<(String, Requirement)>,
}

impl PolicyDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from ordered entries, rejecting invalid names.
    pub fn from_entries<I, K>(entries: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = (K, Requirement)>,
        K: Into<String>,
    {
        let mut document = Self::new();
        for (name, requirement) in entries {
            document.insert(name, requirement)?;
        }
        Ok(document)
    }

    /// Append a check at the end of the document.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        requirement: impl Into<Requirement>,
    ) -> Result<(), PolicyError> {
        let name = name.into();
        if name.is_empty() {
            return Err(PolicyError::EmptyName);
        }
        if name == STATUS_KEY {
            return Err(PolicyError::ReservedName(name));
        }
        if self.contains(&name) {
            return Err(PolicyError::DuplicateCheck(name));
        }
        self.entries.push((name, requirement.into()));
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_check(
        mut self,
        name: impl Into<String>,
        requirement: impl Into<Requirement>,
    ) -> Result<Self, PolicyError> {
        self.insert(name, requirement)?;
        Ok(self)
    }

    /// Parse a policy from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, PolicyError> {
        let raw: RawEntries = serde_yaml::from_str(yaml)?;
        Self::from_entries(raw.0)
    }

    /// Parse a policy from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let raw: RawEntries = serde_json::from_str(json)?;
        Self::from_entries(raw.0)
    }

    /// Parse a policy from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a policy from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a policy file, picking the format from its extension.
    ///
    /// Anything other than `.json` is read as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_yaml_file(path),
        }
    }

    /// Requirement declared for `name`.
    pub fn get(&self, name: &str) -> Option<&Requirement> {
        self.entries
            .iter()
            .find(|(check, _)| check == name)
            .map(|(_, requirement)| requirement)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(check, _)| check == name)
    }

    /// Checks in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Requirement)> {
        self.entries
            .iter()
            .map(|(name, requirement)| (name.as_str(), requirement))
    }

    pub fn check_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON view of the document, for schema validation.
    ///
    /// Key order is not preserved in the returned value.
    pub fn to_json_value(&self) -> serde_json::Value {
        let map = self
            .entries
            .iter()
            .map(|(name, requirement)| {
                let value = serde_json::to_value(requirement).unwrap_or(serde_json::Value::Null);
                (name.clone(), value)
            })
            .collect();
        serde_json::Value::Object(map)
    }

    /// Check the document against the bundled policy schema.
    pub fn validate_schema(&self) -> Result<(), PolicyError> {
        super::validate_policy_schema(&self.to_json_value()).map_err(PolicyError::Schema)
    }
}

impl Serialize for PolicyDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, requirement) in &self.entries {
            map.serialize_entry(name, requirement)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PolicyDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawEntries::deserialize(deserializer)?;
        Self::from_entries(raw.0).map_err(de::Error::custom)
    }
}

/// Map entries in the order the parser saw them, before name validation.
struct RawEntries(Vec<(String, Requirement)>);

impl<'de> Deserialize<'de> for RawEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of check names to requirement levels")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(RawEntries(Vec::new()))
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                let mut seen = HashSet::new();
                while let Some((name, requirement)) =
                    access.next_entry::<String, Requirement>()?
                {
                    // serde_json silently keeps the last duplicate; catch it here
                    if !seen.insert(name.clone()) {
                        return Err(de::Error::custom(format!("duplicate check: {}", name)));
                    }
                    entries.push((name, requirement));
                }
                Ok(RawEntries(entries))
            }
        }

        deserializer.deserialize_any(EntriesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERED_POLICY: &str = r#"
osVersion: ALWAYS
diskEncryption: IF_SUPPORTED
screenLock: SUGGESTED
remoteLogin: NEVER
profiles:
  - ALWAYS
  - IF_SUPPORTED
"#;

    #[test]
    fn test_parse_preserves_declaration_order() {
        let policy = PolicyDocument::from_yaml(ORDERED_POLICY).unwrap();
        let names: Vec<&str> = policy.check_names().collect();
        assert_eq!(
            names,
            vec!["osVersion", "diskEncryption", "screenLock", "remoteLogin", "profiles"]
        );
        assert_eq!(
            policy.get("profiles"),
            Some(&Requirement::Sequence(vec![
                RequirementLevel::Always,
                RequirementLevel::IfSupported
            ]))
        );
    }

    #[test]
    fn test_json_order_is_not_alphabetized() {
        let policy =
            PolicyDocument::from_json(r#"{"zeta": "ALWAYS", "alpha": "NEVER"}"#).unwrap();
        let names: Vec<&str> = policy.check_names().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_reserved_status_name() {
        let result = PolicyDocument::from_yaml("status: ALWAYS\n");
        assert!(matches!(result, Err(PolicyError::ReservedName(_))));
    }

    #[test]
    fn test_duplicate_check_rejected() {
        let result = PolicyDocument::from_json(r#"{"a": "ALWAYS", "a": "NEVER"}"#);
        assert!(result.is_err());

        let mut policy = PolicyDocument::new();
        policy.insert("a", RequirementLevel::Always).unwrap();
        assert!(matches!(
            policy.insert("a", RequirementLevel::Never),
            Err(PolicyError::DuplicateCheck(_))
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = PolicyDocument::from_yaml("\"\": ALWAYS\n");
        assert!(matches!(result, Err(PolicyError::EmptyName)));

        let mut policy = PolicyDocument::new();
        assert!(matches!(
            policy.insert("", RequirementLevel::Never),
            Err(PolicyError::EmptyName)
        ));
    }

    #[test]
    fn test_unknown_level_rejected() {
        let result = PolicyDocument::from_yaml("diskEncryption: SOMETIMES\n");
        assert!(matches!(result, Err(PolicyError::Yaml(_))));
    }

    #[test]
    fn test_empty_document() {
        let policy = PolicyDocument::from_yaml("{}").unwrap();
        assert!(policy.is_empty());
    }

    #[test]
    fn test_requirement_positional_levels() {
        let sequence = Requirement::Sequence(vec![RequirementLevel::Never]);
        assert_eq!(sequence.level_at(0), Some(RequirementLevel::Never));
        assert_eq!(sequence.level_at(1), None);
        assert_eq!(sequence.scalar_level(), RequirementLevel::Always);

        let single = Requirement::Level(RequirementLevel::Always);
        assert_eq!(single.level_at(7), Some(RequirementLevel::Always));
    }

    #[test]
    fn test_serialize_round_trips_order() {
        let policy = PolicyDocument::from_yaml(ORDERED_POLICY).unwrap();
        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.starts_with("{\"osVersion\":\"ALWAYS\""));
        let reparsed = PolicyDocument::from_json(&json).unwrap();
        assert_eq!(reparsed, policy);
    }

    #[test]
    fn test_validate_schema() {
        let policy = PolicyDocument::from_yaml(ORDERED_POLICY).unwrap();
        assert!(policy.validate_schema().is_ok());

        let policy = PolicyDocument::from_yaml("\"disk encryption\": ALWAYS\n").unwrap();
        assert!(matches!(policy.validate_schema(), Err(PolicyError::Schema(_))));
    }
}
