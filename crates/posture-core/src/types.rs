//! Value types shared by the resolution rule, the synthesizer and the runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::policy::PolicyDocument;

/// How strictly a check's outcome must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequirementLevel {
    /// The check must pass.
    Always,

    /// The check should pass; treated like `Always` when resolving.
    Suggested,

    /// The check must pass when the subject can support it.
    IfSupported,

    /// The monitored condition must not hold.
    Never,
}

impl RequirementLevel {
    /// All levels in declaration order.
    pub const ALL: [RequirementLevel; 4] = [
        RequirementLevel::Always,
        RequirementLevel::Suggested,
        RequirementLevel::IfSupported,
        RequirementLevel::Never,
    ];

    /// Wire token for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementLevel::Always => "ALWAYS",
            RequirementLevel::Suggested => "SUGGESTED",
            RequirementLevel::IfSupported => "IF_SUPPORTED",
            RequirementLevel::Never => "NEVER",
        }
    }
}

impl fmt::Display for RequirementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single measured value: what one scalar check, or one list item, reported.
///
/// Serialized as `true`, `false`, `"UNSUPPORTED"` or `"NUDGE"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ObservationRepr", into = "ObservationRepr")]
pub enum Observation {
    /// The monitored condition holds (`true`) or does not (`false`).
    Boolean(bool),

    /// Measurement is impossible on this subject.
    Unsupported,

    /// Soft violation; only the versioned report recognizes it.
    Nudge,
}

impl Observation {
    /// All observations, in table order.
    pub const ALL: [Observation; 4] = [
        Observation::Boolean(false),
        Observation::Unsupported,
        Observation::Boolean(true),
        Observation::Nudge,
    ];

    /// True only for a literal `false`.
    ///
    /// The detailed reports decide list items on this alone.
    pub fn is_false(&self) -> bool {
        matches!(self, Observation::Boolean(false))
    }
}

impl From<bool> for Observation {
    fn from(value: bool) -> Self {
        Observation::Boolean(value)
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::Boolean(true) => f.write_str("true"),
            Observation::Boolean(false) => f.write_str("false"),
            Observation::Unsupported => f.write_str("UNSUPPORTED"),
            Observation::Nudge => f.write_str("NUDGE"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum Marker {
    Unsupported,
    Nudge,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum ObservationRepr {
    Boolean(bool),
    Marker(Marker),
}

impl From<ObservationRepr> for Observation {
    fn from(repr: ObservationRepr) -> Self {
        match repr {
            ObservationRepr::Boolean(b) => Observation::Boolean(b),
            ObservationRepr::Marker(Marker::Unsupported) => Observation::Unsupported,
            ObservationRepr::Marker(Marker::Nudge) => Observation::Nudge,
        }
    }
}

impl From<Observation> for ObservationRepr {
    fn from(observation: Observation) -> Self {
        match observation {
            Observation::Boolean(b) => ObservationRepr::Boolean(b),
            Observation::Unsupported => ObservationRepr::Marker(Marker::Unsupported),
            Observation::Nudge => ObservationRepr::Marker(Marker::Nudge),
        }
    }
}

/// One instance reported by a list-producing check (e.g. one installed profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// Instance name as reported by the check
    pub name: String,

    /// Whether this instance passes
    pub passing: Observation,
}

impl ItemOutcome {
    pub fn new(name: impl Into<String>, passing: impl Into<Observation>) -> Self {
        Self {
            name: name.into(),
            passing: passing.into(),
        }
    }
}

/// The raw value produced by a check provider for one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OutcomeRepr", into = "OutcomeRepr")]
pub enum Outcome {
    Boolean(bool),
    Unsupported,
    Nudge,
    /// Ordered per-instance results for checks that evaluate many instances.
    Items(Vec<ItemOutcome>),
}

impl Outcome {
    /// The scalar observation, or `None` for list outcomes.
    pub fn observation(&self) -> Option<Observation> {
        match self {
            Outcome::Boolean(b) => Some(Observation::Boolean(*b)),
            Outcome::Unsupported => Some(Observation::Unsupported),
            Outcome::Nudge => Some(Observation::Nudge),
            Outcome::Items(_) => None,
        }
    }

    /// Items of a list outcome; empty for scalar outcomes.
    pub fn items(&self) -> &[ItemOutcome] {
        match self {
            Outcome::Items(items) => items,
            _ => &[],
        }
    }
}

impl From<bool> for Outcome {
    fn from(value: bool) -> Self {
        Outcome::Boolean(value)
    }
}

impl From<Observation> for Outcome {
    fn from(observation: Observation) -> Self {
        match observation {
            Observation::Boolean(b) => Outcome::Boolean(b),
            Observation::Unsupported => Outcome::Unsupported,
            Observation::Nudge => Outcome::Nudge,
        }
    }
}

impl From<Vec<ItemOutcome>> for Outcome {
    fn from(items: Vec<ItemOutcome>) -> Self {
        Outcome::Items(items)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum OutcomeRepr {
    Items(Vec<ItemOutcome>),
    Scalar(Observation),
}

impl From<OutcomeRepr> for Outcome {
    fn from(repr: OutcomeRepr) -> Self {
        match repr {
            OutcomeRepr::Items(items) => Outcome::Items(items),
            OutcomeRepr::Scalar(observation) => observation.into(),
        }
    }
}

impl From<Outcome> for OutcomeRepr {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Items(items) => OutcomeRepr::Items(items),
            Outcome::Boolean(b) => OutcomeRepr::Scalar(Observation::Boolean(b)),
            Outcome::Unsupported => OutcomeRepr::Scalar(Observation::Unsupported),
            Outcome::Nudge => OutcomeRepr::Scalar(Observation::Nudge),
        }
    }
}

/// Resolved state of one check or one list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Satisfied,
    Violated,
    /// Soft, never blocking.
    Neutral,
}

impl Verdict {
    pub fn is_violated(&self) -> bool {
        matches!(self, Verdict::Violated)
    }
}

/// Status token written into reports and returned by the fail-fast evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pass,
    Fail,
    Nudge,
}

impl Status {
    /// Ordering used by worst-of aggregation: FAIL > NUDGE > PASS.
    pub fn severity(&self) -> u8 {
        match self {
            Status::Pass => 0,
            Status::Nudge => 1,
            Status::Fail => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Nudge => "NUDGE",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which evaluator to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Boolean verdict, stops at the first violation.
    FailFast,

    /// Full per-check report with a monotonic aggregate.
    Detailed,

    /// Detailed report with the NUDGE tier and name indirection.
    Versioned,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::FailFast => f.write_str("fail-fast"),
            Strategy::Detailed => f.write_str("detailed"),
            Strategy::Versioned => f.write_str("versioned"),
        }
    }
}

/// Everything a check provider may look at for one evaluation.
///
/// Subject and context are opaque to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// State of the subject being evaluated (device, endpoint, ...)
    #[serde(default)]
    pub subject: serde_json::Value,

    /// The policy being evaluated
    pub policy: PolicyDocument,

    /// Caller-supplied context
    #[serde(default)]
    pub context: serde_json::Value,
}

impl EvaluationRequest {
    pub fn new(policy: PolicyDocument) -> Self {
        Self {
            subject: serde_json::Value::Null,
            policy,
            context: serde_json::Value::Null,
        }
    }

    pub fn with_subject(mut self, subject: serde_json::Value) -> Self {
        self.subject = subject;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}
