//! Report aggregation and persistence.
//!
//! The reporter owns the `DeploymentReport` for the duration of a run;
//! the executor's scheduling loop is its only caller, which keeps report
//! writes serialized without locking.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use uuid::Uuid;

use crate::config;
use crate::domain::{DeploymentReport, StepResult};

/// Collects step results into a report and finalizes it once
pub struct StatusReporter {
    report: DeploymentReport,
}

impl StatusReporter {
    pub fn new(run_id: Uuid, backend: &str, frontend: &str) -> Self {
        Self {
            report: DeploymentReport::new(run_id, backend, frontend),
        }
    }

    /// Append a step result (first write for a step id wins)
    pub fn record(&mut self, result: StepResult) {
        debug!(step = %result.step_id, outcome = ?result.outcome, "recording step result");
        self.report.record(result);
    }

    /// Derive the overall outcome and hand the report back
    pub fn finalize(mut self) -> DeploymentReport {
        self.report.finalize();
        self.report
    }
}

/// Write a report as pretty JSON for audit.
///
/// With no explicit path, the report lands in the default runs directory
/// (`~/.shipwright/runs/<run-id>/report.json`). Returns the path written.
pub async fn write_report(report: &DeploymentReport, path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config::runs_dir()?
            .join(report.run_id.to_string())
            .join("report.json"),
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create report directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write report: {}", path.display()))?;

    Ok(path)
}
