//! Check provider abstractions.
//!
//! A check provider measures one named check on a subject. The engine never
//! looks inside a provider; it only resolves what the provider reports.

use async_trait::async_trait;
use posture_core::{EvaluationRequest, Outcome};
use thiserror::Error;

mod fixture;
mod registry;

pub use fixture::{OutcomeFixture, StaticCheck};
pub use registry::CheckRegistry;

/// Errors raised by check providers.
///
/// These are evaluation failures, distinct from policy violations.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Measurement failed: {0}")]
    Measurement(String),

    #[error("Subject state unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A named check that produces an outcome for a subject.
///
/// # Contract
/// - MUST be deterministic for identical inputs within one evaluation
/// - MAY suspend to perform I/O
/// - MUST NOT mutate the policy document
#[async_trait]
pub trait CheckProvider: Send + Sync {
    /// Name this provider is registered under.
    fn name(&self) -> &str;

    /// Measure the check against the subject in `request`.
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<Outcome, CheckError>;
}
