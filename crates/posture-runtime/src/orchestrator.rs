//! Runtime orchestrator for policy evaluation.
//!
//! The orchestrator dispatches one check provider per declared check and
//! feeds the outcomes, in declaration order, through the core synthesizer
//! rules. It implements:
//! - Up-front provider lookup (unknown checks fail before anything runs)
//! - Sequential or concurrent dispatch with an identical in-order fold
//! - Early termination on the first fail-fast violation
//! - Check-name indirection for the versioned report

use futures::future::join_all;
use std::ops::ControlFlow;
use std::sync::Arc;

use posture_core::{
    find_violation, Decision, EvaluationRequest, EvaluationResult, Outcome, PolicyDocument,
    Report, ReportBuilder, Requirement, Status, Strategy,
};

use crate::checks::{CheckProvider, CheckRegistry};
use crate::config::{ConfigError, DispatchMode, RuntimeConfig};
use crate::dispatch::NameIndirection;
use crate::EvaluationError;

/// One declared check, bound to the provider that will measure it.
struct PlannedCheck<'a> {
    /// Logical name; results and requirements live here
    check: &'a str,
    requirement: &'a Requirement,
    /// Name the provider is registered under
    dispatch_name: &'a str,
    provider: &'a Arc<dyn CheckProvider>,
}

/// Evaluates policy documents against registered check providers.
///
/// # Architecture
/// - Plan: resolve every declared check to a provider before dispatching
/// - Dispatch: await providers one by one, or all at once
/// - Fold: apply the strategy to outcomes strictly in declaration order
pub struct PolicyEvaluator {
    registry: CheckRegistry,
    config: RuntimeConfig,
    indirection: NameIndirection,
}

impl PolicyEvaluator {
    /// Create a new evaluator.
    pub fn new(registry: CheckRegistry, config: RuntimeConfig) -> Result<Self, ConfigError> {
        let indirection = config.name_indirection()?;
        Ok(Self {
            registry,
            config,
            indirection,
        })
    }

    pub fn builder() -> PolicyEvaluatorBuilder {
        PolicyEvaluatorBuilder::new()
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run `strategy` and stamp the result.
    pub async fn evaluate(
        &self,
        strategy: Strategy,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResult, EvaluationError> {
        let decision = match strategy {
            Strategy::FailFast => Decision::Verdict(self.fail_fast(request).await?),
            Strategy::Detailed => Decision::Report(self.detailed(request).await?),
            Strategy::Versioned => Decision::Report(self.versioned(request).await?),
        };
        Ok(EvaluationResult::new(strategy, decision))
    }

    /// PASS unless some check or list item is violated.
    ///
    /// In sequential mode no provider is invoked after the first violation.
    pub async fn fail_fast(&self, request: &EvaluationRequest) -> Result<Status, EvaluationError> {
        let plan = self.plan(&request.policy, None)?;
        let mut status = Status::Pass;

        self.fold(&plan, request, |planned, outcome| {
            match find_violation(planned.check, planned.requirement, outcome) {
                Some(violation) => {
                    tracing::info!(
                        check = %violation.check,
                        item = ?violation.item,
                        observed = %violation.observed,
                        required = %violation.required,
                        "policy violated"
                    );
                    status = Status::Fail;
                    ControlFlow::Break(())
                }
                None => ControlFlow::Continue(()),
            }
        })
        .await?;

        tracing::info!(strategy = %Strategy::FailFast, status = %status, "evaluation complete");
        Ok(status)
    }

    /// Per-check report; the aggregate becomes FAIL on any violation.
    pub async fn detailed(&self, request: &EvaluationRequest) -> Result<Report, EvaluationError> {
        self.build_report(Strategy::Detailed, ReportBuilder::detailed(), None, request)
            .await
    }

    /// Per-check report with the NUDGE tier and name indirection.
    pub async fn versioned(&self, request: &EvaluationRequest) -> Result<Report, EvaluationError> {
        let builder = ReportBuilder::versioned(self.config.aggregation);
        self.build_report(Strategy::Versioned, builder, Some(&self.indirection), request)
            .await
    }

    async fn build_report(
        &self,
        strategy: Strategy,
        mut builder: ReportBuilder,
        indirection: Option<&NameIndirection>,
        request: &EvaluationRequest,
    ) -> Result<Report, EvaluationError> {
        let plan = self.plan(&request.policy, indirection)?;

        self.fold(&plan, request, |planned, outcome| {
            let written = builder.record(planned.check, planned.requirement, outcome);
            tracing::debug!(check = planned.check, status = %written, "check recorded");
            ControlFlow::Continue(())
        })
        .await?;

        let report = builder.finish();
        tracing::info!(
            strategy = %strategy,
            status = %report.status(),
            checks = report.len(),
            "evaluation complete"
        );
        Ok(report)
    }

    /// Bind every declared check to its provider, in declaration order.
    fn plan<'a>(
        &'a self,
        policy: &'a PolicyDocument,
        indirection: Option<&'a NameIndirection>,
    ) -> Result<Vec<PlannedCheck<'a>>, EvaluationError> {
        policy
            .iter()
            .map(|(check, requirement)| {
                let dispatch_name = indirection.map_or(check, |table| table.dispatch_name(check));
                let provider = self.registry.lookup(dispatch_name).inspect_err(|_| {
                    tracing::warn!(check, provider = dispatch_name, "no provider registered");
                })?;
                Ok(PlannedCheck {
                    check,
                    requirement,
                    dispatch_name,
                    provider,
                })
            })
            .collect()
    }

    /// Feed outcomes to `step` in declaration order until it breaks.
    ///
    /// Concurrent mode awaits every provider first, then walks results in
    /// order, so a provider error only surfaces if sequential mode would
    /// have reached that check.
    async fn fold<F>(
        &self,
        plan: &[PlannedCheck<'_>],
        request: &EvaluationRequest,
        mut step: F,
    ) -> Result<(), EvaluationError>
    where
        F: FnMut(&PlannedCheck<'_>, &Outcome) -> ControlFlow<()>,
    {
        match self.config.dispatch {
            DispatchMode::Sequential => {
                for planned in plan {
                    let outcome = self.dispatch(planned, request).await?;
                    if step(planned, &outcome).is_break() {
                        break;
                    }
                }
            }
            DispatchMode::Concurrent => {
                let outcomes =
                    join_all(plan.iter().map(|planned| self.dispatch(planned, request))).await;
                for (planned, outcome) in plan.iter().zip(outcomes) {
                    if step(planned, &outcome?).is_break() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        planned: &PlannedCheck<'_>,
        request: &EvaluationRequest,
    ) -> Result<Outcome, EvaluationError> {
        tracing::debug!(
            check = planned.check,
            provider = planned.dispatch_name,
            "dispatching check"
        );
        planned
            .provider
            .evaluate(request)
            .await
            .map_err(|source| EvaluationError::Check {
                check: planned.check.to_string(),
                source,
            })
    }
}

/// Builder for PolicyEvaluator.
pub struct PolicyEvaluatorBuilder {
    registry: CheckRegistry,
    config: RuntimeConfig,
}

impl PolicyEvaluatorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            registry: CheckRegistry::new(),
            config: RuntimeConfig::default(),
        }
    }

    /// Register a check provider.
    pub fn check(mut self, provider: Arc<dyn CheckProvider>) -> Self {
        self.registry.register(provider);
        self
    }

    /// Replace the registry wholesale.
    pub fn registry(mut self, registry: CheckRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the evaluator.
    pub fn build(self) -> Result<PolicyEvaluator, ConfigError> {
        PolicyEvaluator::new(self.registry, self.config)
    }
}

impl Default for PolicyEvaluatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
