//! Policy document parsing and validation.
//!
//! A policy document is an ordered mapping from check name to requirement.
//! Declaration order is evaluation order, so parsing never goes through a
//! hash map.

mod document;
mod schema;

pub use document::{PolicyDocument, PolicyError, Requirement, STATUS_KEY};
pub use schema::{is_valid_policy, validate_policy_schema};
