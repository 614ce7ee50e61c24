//! Synthesizer: folds check outcomes, in declaration order, into a decision.
//!
//! - Fail-fast: the first violated check or list item decides FAIL.
//! - Detailed: every check gets an entry; the aggregate only ever becomes FAIL.
//! - Versioned: as detailed, plus a NUDGE tier written straight through to
//!   the aggregate.
//!
//! List checks diverge between strategies. Fail-fast gates each item by its
//! positional requirement. The reports ignore requirements for items and
//! fail an item only when it reports `false`.

use serde::Serialize;

use crate::policy::Requirement;
use crate::report::{Decision, EvaluationResult, ItemStatus, Report, ReportEntry, StatusAggregation};
use crate::resolution::{resolve, resolve_scalar};
use crate::types::{ItemOutcome, Observation, Outcome, RequirementLevel, Status, Strategy, Verdict};

/// The check (and item, for list checks) that decided a fail-fast FAIL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub check: String,

    /// Item name when the violation came from a list check
    pub item: Option<String>,

    pub observed: Observation,
    pub required: RequirementLevel,
}

/// Find the first violation within one check's outcome.
pub fn find_violation(
    check: &str,
    requirement: &Requirement,
    outcome: &Outcome,
) -> Option<Violation> {
    let Some(observed) = outcome.observation() else {
        return find_item_violation(check, requirement, outcome.items());
    };

    let required = requirement.scalar_level();
    // Neutral passes straight through here
    resolve(observed, required).is_violated().then(|| Violation {
        check: check.to_string(),
        item: None,
        observed,
        required,
    })
}

fn find_item_violation(
    check: &str,
    requirement: &Requirement,
    items: &[ItemOutcome],
) -> Option<Violation> {
    items.iter().enumerate().find_map(|(index, item)| {
        // Items past the end of the sequence carry no requirement
        let required = requirement.level_at(index)?;
        resolve(item.passing, required)
            .is_violated()
            .then(|| Violation {
                check: check.to_string(),
                item: Some(item.name.clone()),
                observed: item.passing,
                required,
            })
    })
}

/// Incrementally builds a detailed or versioned report.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    recognize_nudge: bool,
    aggregation: StatusAggregation,
    report: Report,
}

impl ReportBuilder {
    /// Builder for the detailed report: no NUDGE tier.
    pub fn detailed() -> Self {
        Self {
            recognize_nudge: false,
            aggregation: StatusAggregation::LastWrite,
            report: Report::new(),
        }
    }

    /// Builder for the versioned report.
    pub fn versioned(aggregation: StatusAggregation) -> Self {
        Self {
            recognize_nudge: true,
            aggregation,
            report: Report::new(),
        }
    }

    /// Record one check's outcome.
    ///
    /// Returns the status written for the check; FAIL for a list check
    /// with any failing item.
    pub fn record(
        &mut self,
        check: &str,
        requirement: &Requirement,
        outcome: &Outcome,
    ) -> Status {
        let Some(observed) = outcome.observation() else {
            return self.record_items(check, outcome.items());
        };

        let status = match resolve_scalar(requirement, observed) {
            Verdict::Satisfied => Status::Pass,
            Verdict::Violated => Status::Fail,
            Verdict::Neutral if self.recognize_nudge => Status::Nudge,
            Verdict::Neutral => Status::Pass,
        };
        if status != Status::Pass {
            self.write(status);
        }
        self.report.push_entry(check, ReportEntry::Status(status));
        status
    }

    fn record_items(&mut self, check: &str, items: &[ItemOutcome]) -> Status {
        let statuses: Vec<ItemStatus> = items
            .iter()
            .map(|item| ItemStatus {
                name: item.name.clone(),
                status: if item.passing.is_false() {
                    Status::Fail
                } else {
                    Status::Pass
                },
            })
            .collect();
        let status = if statuses.iter().any(|s| s.status == Status::Fail) {
            self.write(Status::Fail);
            Status::Fail
        } else {
            Status::Pass
        };
        self.report.push_entry(check, ReportEntry::Items(statuses));
        status
    }

    /// Current aggregate status.
    pub fn status(&self) -> Status {
        self.report.status()
    }

    pub fn finish(self) -> Report {
        self.report
    }

    fn write(&mut self, status: Status) {
        let combined = self.aggregation.combine(self.report.status(), status);
        self.report.set_status(combined);
    }
}

/// Applies a strategy to outcomes that are already known.
///
/// The runtime drives the same fold incrementally while dispatching
/// providers; this entry point serves callers that already hold every
/// outcome.
pub struct Synthesizer {
    aggregation: StatusAggregation,
}

impl Synthesizer {
    pub fn new() -> Self {
        Self {
            aggregation: StatusAggregation::default(),
        }
    }

    /// Use a different aggregate reducer for the versioned report.
    pub fn with_aggregation(aggregation: StatusAggregation) -> Self {
        Self { aggregation }
    }

    /// Fail-fast verdict over checks in declaration order.
    pub fn fail_fast<'a, I>(&self, checks: I) -> Status
    where
        I: IntoIterator<Item = (&'a str, &'a Requirement, &'a Outcome)>,
    {
        for (check, requirement, outcome) in checks {
            if let Some(violation) = find_violation(check, requirement, outcome) {
                tracing::debug!(
                    check = %violation.check,
                    item = ?violation.item,
                    observed = %violation.observed,
                    required = %violation.required,
                    "policy violated"
                );
                return Status::Fail;
            }
        }
        Status::Pass
    }

    /// Detailed report over checks in declaration order.
    pub fn detailed<'a, I>(&self, checks: I) -> Report
    where
        I: IntoIterator<Item = (&'a str, &'a Requirement, &'a Outcome)>,
    {
        Self::build(ReportBuilder::detailed(), checks)
    }

    /// Versioned report over checks in declaration order.
    pub fn versioned<'a, I>(&self, checks: I) -> Report
    where
        I: IntoIterator<Item = (&'a str, &'a Requirement, &'a Outcome)>,
    {
        Self::build(ReportBuilder::versioned(self.aggregation), checks)
    }

    /// Run `strategy` and stamp the result.
    pub fn synthesize<'a, I>(
        &self,
        strategy: Strategy,
        checks: I,
    ) -> EvaluationResult
    where
        I: IntoIterator<Item = (&'a str, &'a Requirement, &'a Outcome)>,
    {
        let decision = match strategy {
            Strategy::FailFast => Decision::Verdict(self.fail_fast(checks)),
            Strategy::Detailed => Decision::Report(self.detailed(checks)),
            Strategy::Versioned => Decision::Report(self.versioned(checks)),
        };
        EvaluationResult::new(strategy, decision)
    }

    fn build<'a, I>(mut builder: ReportBuilder, checks: I) -> Report
    where
        I: IntoIterator<Item = (&'a str, &'a Requirement, &'a Outcome)>,
    {
        for (check, requirement, outcome) in checks {
            builder.record(check, requirement, outcome);
        }
        builder.finish()
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyDocument;
    use crate::types::Strategy;
    use proptest::prelude::*;
    use proptest::strategy::Strategy as _;
    use RequirementLevel::{Always, IfSupported, Never, Suggested};

    fn scalar(level: RequirementLevel) -> Requirement {
        Requirement::Level(level)
    }

    fn items(pairs: &[(&str, bool)]) -> Outcome {
        Outcome::Items(
            pairs
                .iter()
                .map(|(name, passing)| ItemOutcome::new(*name, *passing))
                .collect(),
        )
    }

    #[test]
    fn test_fail_fast_disk_encryption_false_under_always() {
        let req = scalar(Always);
        let outcome = Outcome::Boolean(false);
        let status = Synthesizer::new().fail_fast([("diskEncryption", &req, &outcome)]);
        assert_eq!(status, Status::Fail);
    }

    #[test]
    fn test_fail_fast_unsupported_under_if_supported_passes() {
        let req = scalar(IfSupported);
        let outcome = Outcome::Unsupported;
        let status = Synthesizer::new().fail_fast([("diskEncryption", &req, &outcome)]);
        assert_eq!(status, Status::Pass);
    }

    #[test]
    fn test_fail_fast_nudge_passes_through() {
        let req = scalar(Always);
        let outcome = Outcome::Nudge;
        let status = Synthesizer::new().fail_fast([("osVersion", &req, &outcome)]);
        assert_eq!(status, Status::Pass);
    }

    #[test]
    fn test_fail_fast_list_uses_positional_requirements() {
        let outcome = items(&[("a", false), ("b", true)]);

        let waived = Requirement::Sequence(vec![IfSupported, Always]);
        let violation = find_violation("profiles", &waived, &outcome);
        assert_eq!(violation, None);

        let strict = Requirement::Sequence(vec![Always, Always]);
        let violation = find_violation("profiles", &strict, &outcome).unwrap();
        assert_eq!(violation.item.as_deref(), Some("a"));
        assert_eq!(violation.required, Always);
    }

    #[test]
    fn test_fail_fast_excess_items_are_satisfied() {
        let outcome = items(&[("a", true), ("b", false), ("c", false)]);
        let req = Requirement::Sequence(vec![Always]);
        assert_eq!(find_violation("profiles", &req, &outcome), None);
    }

    #[test]
    fn test_fail_fast_item_unsupported() {
        let outcome = Outcome::Items(vec![ItemOutcome::new("mdm", Observation::Unsupported)]);
        let waived = Requirement::Sequence(vec![IfSupported]);
        assert_eq!(find_violation("profiles", &waived, &outcome), None);
        let strict = Requirement::Sequence(vec![Suggested]);
        assert!(find_violation("profiles", &strict, &outcome).is_some());
    }

    #[test]
    fn test_fail_fast_scalar_level_broadcasts_to_items() {
        let outcome = items(&[("a", true), ("b", false)]);
        let req = scalar(Always);
        let violation = find_violation("profiles", &req, &outcome).unwrap();
        assert_eq!(violation.item.as_deref(), Some("b"));
    }

    #[test]
    fn test_scalar_outcome_with_sequence_requirement_is_held_to_always() {
        let req = Requirement::Sequence(vec![IfSupported]);
        let synthesizer = Synthesizer::new();

        let passed = Outcome::Boolean(true);
        assert_eq!(synthesizer.fail_fast([("osVersion", &req, &passed)]), Status::Pass);

        let failed = Outcome::Boolean(false);
        assert_eq!(synthesizer.fail_fast([("osVersion", &req, &failed)]), Status::Fail);
        let violation = find_violation("osVersion", &req, &failed).unwrap();
        assert_eq!(violation.required, Always);

        let unsupported = Outcome::Unsupported;
        let report = synthesizer.detailed([("osVersion", &req, &unsupported)]);
        assert_eq!(report.status(), Status::Fail);
        assert_eq!(report.entry("osVersion"), Some(&ReportEntry::Status(Status::Fail)));

        let nudged = Outcome::Nudge;
        let report = synthesizer.versioned([("osVersion", &req, &nudged)]);
        assert_eq!(report.status(), Status::Nudge);
        assert_eq!(report.entry("osVersion"), Some(&ReportEntry::Status(Status::Nudge)));
    }

    #[test]
    fn test_detailed_false_under_never_passes() {
        let req = scalar(Never);
        let outcome = Outcome::Boolean(false);
        let report = Synthesizer::new().detailed([("remoteLogin", &req, &outcome)]);
        assert_eq!(report.status(), Status::Pass);
        assert_eq!(
            report.entry("remoteLogin"),
            Some(&ReportEntry::Status(Status::Pass))
        );
    }

    #[test]
    fn test_detailed_list_ignores_requirements() {
        let req = Requirement::Sequence(vec![IfSupported, Always]);
        let outcome = items(&[("a", false), ("b", true)]);
        let report = Synthesizer::new().detailed([("profiles", &req, &outcome)]);

        assert_eq!(
            report.entry("profiles"),
            Some(&ReportEntry::Items(vec![
                ItemStatus {
                    name: "a".to_string(),
                    status: Status::Fail
                },
                ItemStatus {
                    name: "b".to_string(),
                    status: Status::Pass
                },
            ]))
        );
        assert_eq!(report.status(), Status::Fail);
    }

    #[test]
    fn test_detailed_does_not_recognize_nudge() {
        let req = scalar(Always);
        let outcome = Outcome::Nudge;
        let report = Synthesizer::new().detailed([("osVersion", &req, &outcome)]);
        assert_eq!(report.status(), Status::Pass);
        assert_eq!(report.entry("osVersion").and_then(|e| e.status()), Some(Status::Pass));
    }

    #[test]
    fn test_detailed_status_is_monotonic() {
        let always = scalar(Always);
        let failed = Outcome::Boolean(false);
        let passed = Outcome::Boolean(true);
        let report = Synthesizer::new().detailed([("a", &always, &failed), ("b", &always, &passed)]);
        assert_eq!(report.status(), Status::Fail);
        assert_eq!(report.failing_checks(), vec!["a"]);
    }

    #[test]
    fn test_versioned_nudge_after_fail_downgrades_aggregate() {
        let always = scalar(Always);
        let suggested = scalar(Suggested);
        let failed = Outcome::Boolean(false);
        let nudged = Outcome::Nudge;
        let report = Synthesizer::new().versioned([("checkX", &always, &failed), ("checkY", &suggested, &nudged)]);

        assert_eq!(report.status(), Status::Nudge);
        assert_eq!(report.entry("checkX").and_then(|e| e.status()), Some(Status::Fail));
        assert_eq!(report.entry("checkY").and_then(|e| e.status()), Some(Status::Nudge));
    }

    #[test]
    fn test_versioned_fail_after_nudge_is_fail() {
        let always = scalar(Always);
        let report = Synthesizer::new().versioned([
                ("checkY", &always, &Outcome::Nudge),
                ("checkX", &always, &Outcome::Boolean(false)),
            ]);
        assert_eq!(report.status(), Status::Fail);
    }

    #[test]
    fn test_versioned_worst_of_keeps_fail() {
        let always = scalar(Always);
        let report = Synthesizer::with_aggregation(StatusAggregation::WorstOf)
            .versioned([
                ("checkX", &always, &Outcome::Boolean(false)),
                ("checkY", &always, &Outcome::Nudge),
            ]);
        assert_eq!(report.status(), Status::Fail);
    }

    #[test]
    fn test_versioned_list_items_ignore_nudge_tier() {
        let req = Requirement::Sequence(vec![]);
        let outcome = Outcome::Items(vec![ItemOutcome::new("a", Observation::Nudge)]);
        let report = Synthesizer::new().versioned([("profiles", &req, &outcome)]);
        assert_eq!(report.status(), Status::Pass);
    }

    #[test]
    fn test_synthesize_stamps_strategy() {
        let policy = PolicyDocument::new()
            .with_check("firewall", Always)
            .unwrap();
        let outcome = Outcome::Boolean(true);
        let checks = policy.iter().map(|(name, req)| (name, req, &outcome));
        let result = Synthesizer::new().synthesize(Strategy::Detailed, checks);
        assert_eq!(result.strategy, Strategy::Detailed);
        assert_eq!(result.status(), Status::Pass);
        assert!(result.decision.report().is_some());
    }

    fn non_never_level() -> impl proptest::strategy::Strategy<Value = RequirementLevel> {
        prop::sample::select(vec![Always, Suggested, IfSupported])
    }

    fn scalar_outcome() -> impl proptest::strategy::Strategy<Value = Outcome> {
        prop::sample::select(vec![
            Outcome::Boolean(true),
            Outcome::Boolean(false),
            Outcome::Unsupported,
            Outcome::Nudge,
        ])
    }

    proptest! {
        #[test]
        fn prop_all_true_always_passes(
            levels in prop::collection::vec(non_never_level(), 0..12).prop_shuffle()
        ) {
            let requirements: Vec<Requirement> = levels.into_iter().map(Requirement::Level).collect();
            let names: Vec<String> = (0..requirements.len()).map(|i| format!("check{}", i)).collect();
            let outcome = Outcome::Boolean(true);
            let checks = || names.iter().zip(&requirements).map(|(n, r)| (n.as_str(), r, &outcome));

            let synthesizer = Synthesizer::new();
            prop_assert_eq!(synthesizer.fail_fast(checks()), Status::Pass);
            prop_assert_eq!(synthesizer.detailed(checks()).status(), Status::Pass);
            prop_assert_eq!(synthesizer.versioned(checks()).status(), Status::Pass);
        }

        #[test]
        fn prop_detailed_fails_iff_fail_fast_fails_for_scalars(
            pairs in prop::collection::vec(
                (prop::sample::select(RequirementLevel::ALL.to_vec()), scalar_outcome()),
                0..12,
            )
        ) {
            let requirements: Vec<Requirement> = pairs.iter().map(|(l, _)| Requirement::Level(*l)).collect();
            let names: Vec<String> = (0..pairs.len()).map(|i| format!("check{}", i)).collect();
            let checks = || names
                .iter()
                .zip(&requirements)
                .zip(&pairs)
                .map(|((n, r), (_, o))| (n.as_str(), r, o));

            let synthesizer = Synthesizer::new();
            let report = synthesizer.detailed(checks());
            let verdict = synthesizer.fail_fast(checks());
            prop_assert_eq!(report.status(), verdict);
            prop_assert_eq!(report.status() == Status::Fail, !report.failing_checks().is_empty());
        }

        #[test]
        fn prop_versioned_status_is_last_write(
            pairs in prop::collection::vec(
                (prop::sample::select(RequirementLevel::ALL.to_vec()), scalar_outcome()),
                1..12,
            )
        ) {
            let requirements: Vec<Requirement> = pairs.iter().map(|(l, _)| Requirement::Level(*l)).collect();
            let names: Vec<String> = (0..pairs.len()).map(|i| format!("check{}", i)).collect();
            let checks = names
                .iter()
                .zip(&requirements)
                .zip(&pairs)
                .map(|((n, r), (_, o))| (n.as_str(), r, o));

            let report = Synthesizer::new().versioned(checks);
            let last_write = report
                .iter()
                .filter_map(|(_, entry)| entry.status())
                .filter(|status| *status != Status::Pass)
                .last()
                .unwrap_or(Status::Pass);
            prop_assert_eq!(report.status(), last_write);
        }
    }
}
