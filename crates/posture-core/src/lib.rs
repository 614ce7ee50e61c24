//! # posture-core
//!
//! Deterministic compliance resolution engine.
//!
//! This crate decides whether a subject complies with a declared security
//! policy, given what each check observed:
//! - Does the subject satisfy every check it is required to?
//! - Which checks failed, and which only earned a nudge?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same outcomes always produce the same decision
//! 2. **Ordered**: Checks are resolved in declaration order, never hash order
//! 3. **Single rule table**: Every scalar outcome goes through [`resolve`]
//! 4. **No I/O during evaluation**: Checks are measured by the runtime, not here
//!
//! ## Example
//!
//! ```rust,ignore
//! use posture_core::{Outcome, PolicyDocument, Strategy, Synthesizer};
//!
//! let policy = PolicyDocument::from_yaml_file("policy.yaml")?;
//! let outcome = Outcome::Boolean(true);
//! let checks = policy.iter().map(|(name, req)| (name, req, &outcome));
//!
//! let result = Synthesizer::new().synthesize(Strategy::Versioned, checks);
//! println!("{}", result.status());
//! ```

pub mod policy;
pub mod report;
pub mod resolution;
pub mod synthesizer;
pub mod types;

// Re-export main types at crate root
pub use policy::{
    is_valid_policy, validate_policy_schema, PolicyDocument, PolicyError, Requirement, STATUS_KEY,
};
pub use report::{
    Decision, EvaluationResult, ItemStatus, Report, ReportEntry, StatusAggregation,
};
pub use resolution::{resolve, resolve_scalar};
pub use synthesizer::{find_violation, ReportBuilder, Synthesizer, Violation};
pub use types::{
    EvaluationRequest, ItemOutcome, Observation, Outcome, RequirementLevel, Status, Strategy,
    Verdict,
};
