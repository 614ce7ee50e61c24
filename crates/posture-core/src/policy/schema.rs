//! JSON Schema validation for policy documents.
//!
//! The schema lives in `schema/policy.schema.json` and is embedded at
//! compile time. It checks what the typed loader cannot: check name syntax.

use jsonschema::Validator;
use std::sync::OnceLock;
use thiserror::Error;

const POLICY_SCHEMA: &str = include_str!("../../../../schema/policy.schema.json");

static VALIDATOR: OnceLock<Result<Validator, SchemaError>> = OnceLock::new();

/// The bundled schema could not be compiled.
#[derive(Error, Debug, Clone)]
#[error("Policy schema unavailable: {0}")]
pub struct SchemaError(String);

fn compile() -> Result<Validator, SchemaError> {
    let schema: serde_json::Value = serde_json::from_str(POLICY_SCHEMA)
        .map_err(|e| SchemaError(format!("not valid JSON: {}", e)))?;
    jsonschema::options()
        .build(&schema)
        .map_err(|e| SchemaError(e.to_string()))
}

fn validator() -> Result<&'static Validator, SchemaError> {
    VALIDATOR.get_or_init(compile).as_ref().map_err(Clone::clone)
}

/// Validate a policy JSON value against the schema.
///
/// Each message is prefixed with the offending JSON pointer (`/` for the
/// document root).
pub fn validate_policy_schema(policy: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = validator().map_err(|e| vec![e.to_string()])?;

    let violations: Vec<String> = validator
        .iter_errors(policy)
        .map(|error| {
            let path = error.instance_path.to_string();
            let path = if path.is_empty() { "/".to_string() } else { path };
            format!("{}: {}", path, error)
        })
        .collect();

    if violations.is_empty() {
        return Ok(());
    }
    tracing::debug!(violations = violations.len(), "policy failed schema validation");
    Err(violations)
}

pub fn is_valid_policy(policy: &serde_json::Value) -> bool {
    validator().is_ok_and(|v| v.is_valid(policy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_policy_passes_schema() {
        let value = serde_json::json!({
            "osVersion": "ALWAYS",
            "diskEncryption": "IF_SUPPORTED",
            "profiles": ["ALWAYS", "SUGGESTED"]
        });
        assert!(validate_policy_schema(&value).is_ok());
    }

    #[test]
    fn test_unknown_level_fails() {
        let value = serde_json::json!({ "osVersion": "SOMETIMES" });
        let errors = validate_policy_schema(&value).unwrap_err();
        assert!(errors.iter().all(|e| e.starts_with("/osVersion: ")));
    }

    #[test]
    fn test_status_key_fails() {
        let value = serde_json::json!({ "status": "ALWAYS" });
        assert!(validate_policy_schema(&value).is_err());
    }

    #[test]
    fn test_invalid_check_name_fails() {
        let value = serde_json::json!({ "1password": "ALWAYS" });
        let errors = validate_policy_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_non_object_fails() {
        assert!(!is_valid_policy(&serde_json::json!(["ALWAYS"])));
        assert!(is_valid_policy(&serde_json::json!({})));
    }
}
