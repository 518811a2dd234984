use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::invariant::Verdict;
use crate::scenario::Scenario;

/// Terminal state of one (target, check) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Failed,
    Incomplete,
    Skipped,
    Passed,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Passed => "passed",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Skipped => "skipped",
            OutcomeStatus::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutcomeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "passed" => Ok(OutcomeStatus::Passed),
            "failed" => Ok(OutcomeStatus::Failed),
            "skipped" => Ok(OutcomeStatus::Skipped),
            "incomplete" => Ok(OutcomeStatus::Incomplete),
            _ => Err(format!("Unknown outcome status: {}", s)),
        }
    }
}

impl From<&Verdict> for OutcomeStatus {
    fn from(verdict: &Verdict) -> Self {
        match verdict {
            Verdict::Pass(_) => OutcomeStatus::Passed,
            Verdict::Fail(_) => OutcomeStatus::Failed,
            Verdict::Inconclusive(_) => OutcomeStatus::Skipped,
        }
    }
}

/// One recorded result. Flat so it serializes as a CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub group: String,
    pub scenario: String,
    pub target: String,
    pub check: String,
    pub status: OutcomeStatus,
    pub message: String,
}

impl Outcome {
    pub fn new(
        scenario: &Scenario,
        check: impl Into<String>,
        status: OutcomeStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            group: scenario.group.clone(),
            scenario: scenario.name.clone(),
            target: scenario.target.label(),
            check: check.into(),
            status,
            message: message.into(),
        }
    }

    pub fn from_verdict(scenario: &Scenario, check: impl Into<String>, verdict: Verdict) -> Self {
        let status = OutcomeStatus::from(&verdict);
        let message = match verdict {
            Verdict::Pass(m) | Verdict::Fail(m) | Verdict::Inconclusive(m) => m,
        };
        Self::new(scenario, check, status, message)
    }
}

/// Counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub incomplete: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checks: {} passed, {} failed, {} skipped, {} incomplete",
            self.total, self.passed, self.failed, self.skipped, self.incomplete
        )
    }
}

/// All outcomes of one run, in completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The run was cancelled or timed out before every scenario finished.
    pub cancelled: bool,
    pub outcomes: Vec<Outcome>,
}

impl RunReport {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.outcomes.len(),
            ..Summary::default()
        };
        for outcome in &self.outcomes {
            match outcome.status {
                OutcomeStatus::Passed => summary.passed += 1,
                OutcomeStatus::Failed => summary.failed += 1,
                OutcomeStatus::Skipped => summary.skipped += 1,
                OutcomeStatus::Incomplete => summary.incomplete += 1,
            }
        }
        summary
    }

    /// No failed and no incomplete outcomes.
    pub fn is_success(&self) -> bool {
        let summary = self.summary();
        summary.failed == 0 && summary.incomplete == 0 && !self.cancelled
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failed)
    }

    /// Outcomes grouped for display: by group, scenario, then target.
    pub fn sorted(&self) -> Vec<&Outcome> {
        let mut rows: Vec<&Outcome> = self.outcomes.iter().collect();
        rows.sort_by(|a, b| {
            (&a.group, &a.scenario, &a.target).cmp(&(&b.group, &b.scenario, &b.target))
        });
        rows
    }

    pub fn outcomes_for<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a Outcome> {
        self.outcomes.iter().filter(move |o| o.target == target)
    }

    pub fn duration(&self) -> chrono::TimeDelta {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Target;

    fn scenario() -> Scenario {
        Scenario::new("theme", "dark default", Target::locale("es", "/es/docs/intro"))
    }

    fn report(statuses: &[OutcomeStatus]) -> RunReport {
        let s = scenario();
        RunReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            cancelled: false,
            outcomes: statuses
                .iter()
                .map(|st| Outcome::new(&s, "check", *st, ""))
                .collect(),
        }
    }

    #[test]
    fn test_outcome_status_roundtrip() {
        for status in [
            OutcomeStatus::Passed,
            OutcomeStatus::Failed,
            OutcomeStatus::Skipped,
            OutcomeStatus::Incomplete,
        ] {
            let parsed: OutcomeStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("green".parse::<OutcomeStatus>().is_err());
    }

    #[test]
    fn test_outcome_from_verdict() {
        let s = scenario();
        let outcome = Outcome::from_verdict(
            &s,
            "theme attribute",
            Verdict::Inconclusive("transparent".into()),
        );
        assert_eq!(outcome.status, OutcomeStatus::Skipped);
        assert_eq!(outcome.target, "[es] /es/docs/intro");
        assert_eq!(outcome.group, "theme");
        assert_eq!(outcome.message, "transparent");
    }

    #[test]
    fn test_summary_and_success() {
        let ok = report(&[OutcomeStatus::Passed, OutcomeStatus::Skipped]);
        assert!(ok.is_success());
        assert_eq!(ok.summary().skipped, 1);

        let failed = report(&[OutcomeStatus::Passed, OutcomeStatus::Failed]);
        assert!(!failed.is_success());
        assert_eq!(failed.failures().count(), 1);

        let partial = report(&[OutcomeStatus::Passed, OutcomeStatus::Incomplete]);
        assert!(!partial.is_success());
        assert_eq!(
            partial.summary().to_string(),
            "2 checks: 1 passed, 0 failed, 0 skipped, 1 incomplete"
        );
    }

    #[test]
    fn test_report_serializes_lowercase_status() {
        let json = serde_json::to_value(report(&[OutcomeStatus::Incomplete])).unwrap();
        assert_eq!(json["outcomes"][0]["status"], "incomplete");
        assert_eq!(json["cancelled"], false);
    }
}
