//! Reports produced by the detailed evaluators.
//!
//! A report serializes as a flat object: the aggregate `status` first, then
//! one entry per declared check in declaration order.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::policy::STATUS_KEY;
use crate::types::{Status, Strategy};

/// How writes to the aggregate status combine.
///
/// Only FAIL and NUDGE are ever written; PASS is the seed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAggregation {
    /// The last write in declaration order wins. A NUDGE after a FAIL
    /// downgrades the aggregate to NUDGE.
    #[default]
    LastWrite,

    /// The most severe write wins (FAIL > NUDGE > PASS).
    WorstOf,
}

impl StatusAggregation {
    /// Fold one write into the current aggregate.
    pub fn combine(&self, current: Status, written: Status) -> Status {
        match self {
            StatusAggregation::LastWrite => written,
            StatusAggregation::WorstOf => {
                if written.severity() >= current.severity() {
                    written
                } else {
                    current
                }
            }
        }
    }
}

/// Status of one item of a list check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatus {
    pub name: String,
    pub status: Status,
}

/// Per-check entry in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportEntry {
    Status(Status),
    Items(Vec<ItemStatus>),
}

impl ReportEntry {
    /// Scalar status, or `None` for list entries.
    pub fn status(&self) -> Option<Status> {
        match self {
            ReportEntry::Status(status) => Some(*status),
            ReportEntry::Items(_) => None,
        }
    }

    /// True if this entry, or any of its items, reads FAIL.
    pub fn is_failing(&self) -> bool {
        match self {
            ReportEntry::Status(status) => *status == Status::Fail,
            ReportEntry::Items(items) => items.iter().any(|i| i.status == Status::Fail),
        }
    }
}

/// Output of a detailed evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    status: Status,
    entries: Vec<(String, ReportEntry)>,
}

impl Report {
    /// An empty report with aggregate status PASS.
    pub fn new() -> Self {
        Self {
            status: Status::Pass,
            entries: Vec::new(),
        }
    }

    /// Aggregate status.
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn entry(&self, check: &str) -> Option<&ReportEntry> {
        self.entries
            .iter()
            .find(|(name, _)| name == check)
            .map(|(_, entry)| entry)
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReportEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of checks whose entry reads FAIL.
    pub fn failing_checks(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, entry)| entry.is_failing())
            .map(|(name, _)| name)
            .collect()
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub(crate) fn push_entry(&mut self, check: impl Into<String>, entry: ReportEntry) {
        self.entries.push((check.into(), entry));
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for Report {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len() + 1))?;
        map.serialize_entry(STATUS_KEY, &self.status)?;
        for (name, entry) in &self.entries {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}

/// What a strategy decided: a bare verdict or a full report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Decision {
    Verdict(Status),
    Report(Report),
}

impl Decision {
    /// Overall status regardless of shape.
    pub fn status(&self) -> Status {
        match self {
            Decision::Verdict(status) => *status,
            Decision::Report(report) => report.status(),
        }
    }

    pub fn report(&self) -> Option<&Report> {
        match self {
            Decision::Verdict(_) => None,
            Decision::Report(report) => Some(report),
        }
    }
}

/// A decision stamped with the strategy that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    /// Strategy that ran
    pub strategy: Strategy,

    /// Verdict or report
    pub decision: Decision,

    /// When the evaluation finished
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn new(strategy: Strategy, decision: Decision) -> Self {
        Self {
            strategy,
            decision,
            evaluated_at: Utc::now(),
        }
    }

    pub fn status(&self) -> Status {
        self.decision.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> Report {
        let mut report = Report::new();
        report.push_entry("osVersion", ReportEntry::Status(Status::Fail));
        report.push_entry(
            "profiles",
            ReportEntry::Items(vec![
                ItemStatus {
                    name: "wifi".to_string(),
                    status: Status::Pass,
                },
                ItemStatus {
                    name: "vpn".to_string(),
                    status: Status::Fail,
                },
            ]),
        );
        report.push_entry("screenLock", ReportEntry::Status(Status::Pass));
        report.set_status(Status::Fail);
        report
    }

    #[test]
    fn test_report_serializes_flat_with_status_first() {
        let json = serde_json::to_string(&sample_report()).unwrap();
        assert!(json.starts_with("{\"status\":\"FAIL\",\"osVersion\":\"FAIL\""));

        let value = serde_json::to_value(sample_report()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "status": "FAIL",
                "osVersion": "FAIL",
                "profiles": [
                    { "name": "wifi", "status": "PASS" },
                    { "name": "vpn", "status": "FAIL" }
                ],
                "screenLock": "PASS"
            })
        );
    }

    #[test]
    fn test_failing_checks() {
        assert_eq!(sample_report().failing_checks(), vec!["osVersion", "profiles"]);
    }

    #[test]
    fn test_last_write_aggregation() {
        let agg = StatusAggregation::LastWrite;
        assert_eq!(agg.combine(Status::Fail, Status::Nudge), Status::Nudge);
        assert_eq!(agg.combine(Status::Nudge, Status::Fail), Status::Fail);
    }

    #[test]
    fn test_worst_of_aggregation() {
        let agg = StatusAggregation::WorstOf;
        assert_eq!(agg.combine(Status::Fail, Status::Nudge), Status::Fail);
        assert_eq!(agg.combine(Status::Pass, Status::Nudge), Status::Nudge);
        assert_eq!(agg.combine(Status::Nudge, Status::Fail), Status::Fail);
    }

    #[test]
    fn test_decision_serialization() {
        let verdict = Decision::Verdict(Status::Pass);
        assert_eq!(serde_json::to_value(&verdict).unwrap(), "PASS");
        assert_eq!(Decision::Report(sample_report()).status(), Status::Fail);
    }
}
