//! Deployment reports: the aggregated outcome of a run.
//!
//! The report is append-only during execution (a step id is recorded once)
//! and finalized exactly once when the run reaches a terminal state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::step::{StepOutcome, StepResult};

/// Aggregated outcome of one deployment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentReport {
    /// Unique identifier for this run
    pub run_id: Uuid,

    /// Backend provider name
    pub backend: String,

    /// Frontend provider name
    pub frontend: String,

    /// Per-step results, keyed by step id
    pub results: BTreeMap<String, StepResult>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished (set by finalize)
    pub finished_at: Option<DateTime<Utc>>,

    /// Overall outcome (set by finalize)
    pub overall: Option<OverallOutcome>,
}

impl DeploymentReport {
    pub fn new(run_id: Uuid, backend: impl Into<String>, frontend: impl Into<String>) -> Self {
        Self {
            run_id,
            backend: backend.into(),
            frontend: frontend.into(),
            results: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: None,
            overall: None,
        }
    }

    /// Record a step result. The first write for a step id wins; results
    /// are never overwritten.
    pub fn record(&mut self, result: StepResult) {
        self.results.entry(result.step_id.clone()).or_insert(result);
    }

    /// Derive the overall outcome from recorded results and mark the run
    /// finished. Idempotent: a second call leaves the first outcome intact.
    pub fn finalize(&mut self) -> OverallOutcome {
        if let Some(overall) = self.overall {
            return overall;
        }

        let succeeded = self
            .results
            .values()
            .filter(|r| r.outcome == StepOutcome::Succeeded)
            .count();
        let total = self.results.len();

        let overall = if total > 0 && succeeded == total {
            OverallOutcome::Success
        } else if succeeded == 0 {
            OverallOutcome::Failure
        } else {
            OverallOutcome::PartialFailure
        };

        self.overall = Some(overall);
        self.finished_at = Some(Utc::now());
        overall
    }

    /// Summarize the report for display and exit-code mapping
    pub fn summarize(&self) -> Summary {
        let overall = self.overall.unwrap_or(OverallOutcome::Failure);

        let public_urls = self
            .results
            .values()
            .filter(|r| r.outcome == StepOutcome::Succeeded)
            .filter_map(|r| r.resource.clone())
            .collect();

        let failed_steps = self
            .results
            .values()
            .filter(|r| r.outcome == StepOutcome::Failed)
            .map(|r| r.step_id.clone())
            .collect();

        Summary {
            overall,
            public_urls,
            failed_steps,
        }
    }

    /// Result for a specific step, if recorded
    pub fn result_for(&self, step_id: &str) -> Option<&StepResult> {
        self.results.get(step_id)
    }
}

/// Overall outcome of a deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallOutcome {
    /// Every step succeeded
    Success,

    /// Some steps succeeded, some did not
    PartialFailure,

    /// No step succeeded
    Failure,
}

impl OverallOutcome {
    /// CLI exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            OverallOutcome::Success => 0,
            OverallOutcome::PartialFailure => 1,
            OverallOutcome::Failure => 2,
        }
    }
}

impl std::fmt::Display for OverallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OverallOutcome::Success => "success",
            OverallOutcome::PartialFailure => "partial-failure",
            OverallOutcome::Failure => "failure",
        };
        f.write_str(s)
    }
}

/// Condensed view of a finalized report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub overall: OverallOutcome,
    pub public_urls: Vec<String>,
    pub failed_steps: Vec<String>,
}
