//! Sweep outcomes and the aggregated report

use crate::resource::ResourceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepAction {
    /// Deletion was requested and accepted
    Deleted,
    /// Resource was left alone
    Skipped,
    /// Deletion was attempted and rejected
    Failed,
}

impl std::fmt::Display for SweepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweepAction::Deleted => write!(f, "deleted"),
            SweepAction::Skipped => write!(f, "skipped"),
            SweepAction::Failed => write!(f, "failed"),
        }
    }
}

/// Why a resource was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Carries the exemption label
    Exempt,
    /// Younger than the age threshold
    NotExpired,
    /// Backend did not report a usable creation time
    UnknownCreationTime,
    /// Still attached to another resource
    InUse,
    /// Would have been deleted, but the sweep is a dry run
    DryRun,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Exempt => write!(f, "exempt"),
            SkipReason::NotExpired => write!(f, "not old enough"),
            SkipReason::UnknownCreationTime => write!(f, "unknown creation time"),
            SkipReason::InUse => write!(f, "in use"),
            SkipReason::DryRun => write!(f, "dry run"),
        }
    }
}

/// Outcome for one evaluated resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub resource_type: ResourceType,

    pub id: String,

    pub action: SweepAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SweepOutcome {
    pub fn deleted(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self {
            resource_type,
            id: id.into(),
            action: SweepAction::Deleted,
            reason: None,
            error: None,
        }
    }

    pub fn skipped(resource_type: ResourceType, id: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            resource_type,
            id: id.into(),
            action: SweepAction::Skipped,
            reason: Some(reason),
            error: None,
        }
    }

    pub fn failed(
        resource_type: ResourceType,
        id: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            resource_type,
            id: id.into(),
            action: SweepAction::Failed,
            reason: None,
            error: Some(error.into()),
        }
    }
}

/// A resource type (or one of its locations) that could not be enumerated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationFailure {
    pub resource_type: ResourceType,

    /// Region or zone, when only one location failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    pub error: String,
}

/// Result of one sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    /// The single instant every resource was judged against
    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,

    pub outcomes: Vec<SweepOutcome>,

    pub enumeration_failures: Vec<EnumerationFailure>,
}

impl SweepReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            duration_ms: 0,
            outcomes: Vec::new(),
            enumeration_failures: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: SweepOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn push_enumeration_failure(
        &mut self,
        resource_type: ResourceType,
        scope: Option<String>,
        error: impl Into<String>,
    ) {
        self.enumeration_failures.push(EnumerationFailure {
            resource_type,
            scope,
            error: error.into(),
        });
    }

    /// Fold another partial report (e.g. one adapter's) into this one
    pub fn merge(&mut self, other: SweepReport) {
        self.outcomes.extend(other.outcomes);
        self.enumeration_failures.extend(other.enumeration_failures);
    }

    /// True when nothing failed, neither enumeration nor deletion
    pub fn is_clean(&self) -> bool {
        self.enumeration_failures.is_empty()
            && !self.outcomes.iter().any(|o| o.action == SweepAction::Failed)
    }

    pub fn outcomes_by_action(&self, action: SweepAction) -> Vec<&SweepOutcome> {
        self.outcomes.iter().filter(|o| o.action == action).collect()
    }

    pub fn find(&self, id: &str) -> Option<&SweepOutcome> {
        self.outcomes.iter().find(|o| o.id == id)
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            deleted: self.outcomes_by_action(SweepAction::Deleted).len(),
            skipped: self.outcomes_by_action(SweepAction::Skipped).len(),
            failed: self.outcomes_by_action(SweepAction::Failed).len(),
            enumeration_failed: self.enumeration_failures.len(),
        }
    }
}

/// Counts per action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub enumeration_failed: usize,
}

impl std::fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} deleted, {} skipped, {} failed, {} enumeration failures",
            self.deleted, self.skipped, self.failed, self.enumeration_failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut report = SweepReport::new(Utc::now());
        report.push(SweepOutcome::deleted(ResourceType::ComputeInstance, "a"));
        report.push(SweepOutcome::skipped(
            ResourceType::Disk,
            "b",
            SkipReason::Exempt,
        ));
        report.push(SweepOutcome::failed(
            ResourceType::KubernetesCluster,
            "c",
            "Permission denied",
        ));
        report.push_enumeration_failure(ResourceType::DataprocCluster, None, "boom");

        let summary = report.summary();
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.enumeration_failed, 1);
        assert!(!report.is_clean());
        assert_eq!(
            summary.to_string(),
            "1 deleted, 1 skipped, 1 failed, 1 enumeration failures"
        );
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = SweepOutcome::skipped(ResourceType::Disk, "d", SkipReason::NotExpired);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["resource_type"], "compute-disk");
        assert_eq!(json["action"], "skipped");
        assert_eq!(json["reason"], "not-expired");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_empty_report_is_clean() {
        let report = SweepReport::new(Utc::now());
        assert!(report.is_clean());
        assert_eq!(report.summary().deleted, 0);
    }
}
