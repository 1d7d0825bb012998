//! Plan steps and their execution records.
//!
//! A `Step` is the atomic unit of deployment work. Steps are immutable once
//! the plan is built; execution state lives in the executor, and outcomes
//! are recorded as immutable `StepResult`s.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::target::Role;

/// A single step in a deployment plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Step id (unique within the plan, e.g., "provision-db")
    pub id: String,

    /// Human-readable description
    pub description: String,

    /// Which half of the app this step acts on
    pub role: Role,

    /// What kind of work this step performs
    pub action: ActionKind,

    /// Ids of steps that must succeed before this one runs
    pub depends_on: BTreeSet<String>,
}

impl Step {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        role: Role,
        action: ActionKind,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            role,
            action,
            depends_on: BTreeSet::new(),
        }
    }

    /// Add a dependency on another step
    pub fn after(mut self, step_id: impl Into<String>) -> Self {
        self.depends_on.insert(step_id.into());
        self
    }
}

/// Kinds of deployment work a step can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Provision a managed database
    ProvisionDatabase,

    /// Set an environment variable on the service
    SetEnv,

    /// Trigger a build from the source ref
    Build,

    /// Publish a build to a public URL
    Publish,
}

impl ActionKind {
    /// Provisioning-class actions are safe to retry and safe to re-run
    /// against a provider that reports the resource already exists.
    pub fn is_provisioning(&self) -> bool {
        matches!(self, ActionKind::ProvisionDatabase | ActionKind::SetEnv)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionKind::ProvisionDatabase => "provision-db",
            ActionKind::SetEnv => "set-env",
            ActionKind::Build => "build",
            ActionKind::Publish => "publish",
        };
        f.write_str(s)
    }
}

/// Execution state of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Waiting on dependencies
    Pending,

    /// Currently executing against an adapter
    Running,

    /// Completed successfully
    Succeeded,

    /// Failed (retries exhausted or not retryable)
    Failed,

    /// Never ran: a prerequisite failed or the run was cancelled
    Skipped,
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Succeeded | StepState::Failed | StepState::Skipped
        )
    }
}

impl Default for StepState {
    fn default() -> Self {
        Self::Pending
    }
}

/// Terminal outcome of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    Failed,
    Skipped,
}

/// Immutable record of a step's terminal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Step this result belongs to
    pub step_id: String,

    /// Terminal outcome
    pub outcome: StepOutcome,

    /// Human-readable detail (error message, skip reason, success note)
    pub detail: String,

    /// Resulting resource, if any (public URL, connection string host)
    pub resource: Option<String>,

    /// When the step reached its terminal state
    pub timestamp: DateTime<Utc>,

    /// Number of attempts made (0 for skipped steps)
    pub attempts: u32,

    /// Wall-clock duration in milliseconds (None for skipped steps)
    pub duration_ms: Option<u64>,
}

impl StepResult {
    pub fn new(step_id: impl Into<String>, outcome: StepOutcome, detail: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            outcome,
            detail: detail.into(),
            resource: None,
            timestamp: Utc::now(),
            attempts: 0,
            duration_ms: None,
        }
    }

    /// Record a skip with the given reason
    pub fn skipped(step_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(step_id, StepOutcome::Skipped, reason)
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}
