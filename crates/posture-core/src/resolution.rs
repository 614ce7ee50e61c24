//! Compliance resolution: reconciles what a check observed with what the
//! policy requires of it.
//!
//! | observed    | ALWAYS   | SUGGESTED | IF_SUPPORTED | NEVER     |
//! |-------------|----------|-----------|--------------|-----------|
//! | false       | Violated | Violated  | Satisfied    | Satisfied |
//! | UNSUPPORTED | Violated | Violated  | Satisfied    | Violated  |
//! | true        | Satisfied| Satisfied | Satisfied    | Violated  |
//! | NUDGE       | Neutral  | Neutral   | Neutral      | Neutral   |
//!
//! Every evaluator resolves scalar outcomes through [`resolve`].

use crate::policy::Requirement;
use crate::types::{Observation, RequirementLevel, Verdict};

/// Resolve one observation against one requirement level.
pub fn resolve(observation: Observation, level: RequirementLevel) -> Verdict {
    use Observation::{Boolean, Nudge, Unsupported};
    use RequirementLevel::{Always, IfSupported, Never, Suggested};

    match (observation, level) {
        (Nudge, _) => Verdict::Neutral,

        (Boolean(true), Never) => Verdict::Violated,
        (Boolean(true), Always | Suggested | IfSupported) => Verdict::Satisfied,

        (Boolean(false), Always | Suggested) => Verdict::Violated,
        (Boolean(false), IfSupported | Never) => Verdict::Satisfied,

        (Unsupported, IfSupported) => Verdict::Satisfied,
        (Unsupported, Always | Suggested | Never) => Verdict::Violated,
    }
}

/// Resolve a scalar outcome against a declared requirement.
///
/// A requirement sequence is read as `ALWAYS` (see
/// [`Requirement::scalar_level`]).
pub fn resolve_scalar(requirement: &Requirement, observation: Observation) -> Verdict {
    resolve(observation, requirement.scalar_level())
}
