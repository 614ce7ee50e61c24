//! # posture-runtime
//!
//! Async dispatch of compliance checks for Posture.
//!
//! This crate binds the declared checks of a policy document to check
//! providers, awaits their outcomes and hands them to the deterministic
//! rules in `posture-core`.
//!
//! ## Important
//!
//! Providers only measure. Every decision (violation, report entry,
//! aggregate status) is made by `posture-core`, in declaration order,
//! whichever dispatch mode is configured.
//!
//! ## Example
//!
//! ```rust,ignore
//! use posture_runtime::{PolicyEvaluator, RuntimeConfig, StaticCheck};
//!
//! let evaluator = PolicyEvaluator::builder()
//!     .check(Arc::new(StaticCheck::new("diskEncryption", true)))
//!     .config(RuntimeConfig::default())
//!     .build()?;
//!
//! let status = evaluator.fail_fast(&request).await?;
//! ```

use thiserror::Error;

pub mod checks;
pub mod config;
pub mod dispatch;
pub mod orchestrator;

pub use checks::{CheckError, CheckProvider, CheckRegistry, OutcomeFixture, StaticCheck};
pub use config::{ConfigError, DispatchMode, RuntimeConfig};
pub use dispatch::{NameIndirection, DEFAULT_ALIASES};
pub use orchestrator::{PolicyEvaluator, PolicyEvaluatorBuilder};

/// Errors from evaluating a policy.
#[derive(Error, Debug)]
pub enum EvaluationError {
    /// A declared check has no registered provider
    #[error("Unknown check: {0}")]
    UnknownCheck(String),

    #[error("Check '{check}' failed: {source}")]
    Check {
        check: String,
        #[source]
        source: CheckError,
    },
}
