//! Step execution against provider adapters.
//!
//! The executor drives a plan's dependency graph: ready steps run as
//! spawned tasks bounded by a per-provider semaphore, and every task
//! reports back over an mpsc channel to the scheduling loop, which is the
//! single writer of the deployment report. Failures skip dependents;
//! cancellation lets in-flight calls finish but starts nothing new.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{AdapterError, AdapterErrorKind, BuildHandle, ProviderAdapter};
use crate::config::DeployConfig;
use crate::domain::{ActionKind, DeploymentReport, Role, Step, StepOutcome, StepResult, StepState};

use super::planner::DeploymentPlan;
use super::registry::ValidationError;
use super::reporter::StatusReporter;
use super::retry::RetryPolicy;

/// Signal to stop starting new steps. In-flight adapter calls are allowed
/// to complete; remaining pending steps end up skipped.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Executes deployment plans against a backend and a frontend adapter
pub struct StepExecutor {
    backend: Arc<dyn ProviderAdapter>,
    frontend: Arc<dyn ProviderAdapter>,
    cancel: CancelHandle,
}

impl StepExecutor {
    pub fn new(backend: Arc<dyn ProviderAdapter>, frontend: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            backend,
            frontend,
            cancel: CancelHandle::new(),
        }
    }

    /// Handle callers can use to cancel the run (e.g., from a ctrl-c task)
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn adapter_for(&self, role: Role) -> Arc<dyn ProviderAdapter> {
        match role {
            Role::Backend => Arc::clone(&self.backend),
            Role::Frontend => Arc::clone(&self.frontend),
        }
    }

    /// Execute a plan to completion.
    ///
    /// The only error is an invalid plan, raised before any step runs.
    /// Step failures never propagate: every step's terminal state and
    /// message end up in the returned report.
    #[instrument(skip(self, plan, config), fields(backend = %plan.backend, frontend = %plan.frontend))]
    pub async fn run(
        &self,
        plan: &DeploymentPlan,
        config: &DeployConfig,
    ) -> Result<DeploymentReport, ValidationError> {
        plan.validate()?;

        let run_id = Uuid::new_v4();
        info!(%run_id, "starting deployment run");

        let mut reporter = StatusReporter::new(run_id, &plan.backend, &plan.frontend);
        let mut states: HashMap<String, StepState> = plan
            .steps
            .iter()
            .map(|s| (s.id.clone(), StepState::Pending))
            .collect();
        let mut ctx = RunContext::default();
        let requires_database = plan
            .steps
            .iter()
            .any(|s| s.action == ActionKind::ProvisionDatabase);

        // One semaphore per provider keeps concurrent calls under the
        // provider's rate-limit headroom.
        let concurrency = config.options.provider_concurrency.max(1);
        let mut permits: HashMap<String, Arc<Semaphore>> = HashMap::new();
        for provider in [plan.backend.as_str(), plan.frontend.as_str()] {
            permits
                .entry(provider.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(concurrency)));
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<WorkerResult>();

        loop {
            if !self.cancel.is_cancelled() {
                for step in &plan.steps {
                    if states[&step.id] != StepState::Pending {
                        continue;
                    }
                    let ready = step
                        .depends_on
                        .iter()
                        .all(|d| states.get(d) == Some(&StepState::Succeeded));
                    if !ready {
                        continue;
                    }

                    states.insert(step.id.clone(), StepState::Running);
                    let provider = plan.provider_for(step);
                    self.launch(
                        step.clone(),
                        Arc::clone(&permits[provider]),
                        config,
                        &ctx,
                        requires_database,
                        tx.clone(),
                    );
                }
            }

            let running = states
                .values()
                .filter(|s| **s == StepState::Running)
                .count();
            if running == 0 {
                break;
            }

            let Some(result) = rx.recv().await else {
                break;
            };
            self.absorb(result, plan, &mut states, &mut ctx, &mut reporter);
        }

        // Whatever is still pending can no longer run: either the run was
        // cancelled or a prerequisite failed.
        for step in &plan.steps {
            if states[&step.id] == StepState::Pending {
                states.insert(step.id.clone(), StepState::Skipped);
                let reason = if self.cancel.is_cancelled() {
                    "run cancelled".to_string()
                } else {
                    "prerequisite did not succeed".to_string()
                };
                reporter.record(StepResult::skipped(&step.id, reason));
            }
        }

        let report = reporter.finalize();
        info!(%run_id, overall = %report.overall.unwrap_or(crate::domain::OverallOutcome::Failure), "run finished");
        Ok(report)
    }

    /// Spawn a worker task for one step
    fn launch(
        &self,
        step: Step,
        semaphore: Arc<Semaphore>,
        config: &DeployConfig,
        ctx: &RunContext,
        requires_database: bool,
        tx: mpsc::UnboundedSender<WorkerResult>,
    ) {
        let input = WorkerInput {
            adapter: self.adapter_for(step.role),
            step_timeout: config.options.step_timeout(),
            config: config.clone(),
            database_url: ctx.database_url.clone(),
            backend_url: ctx.backend_url.clone(),
            build: ctx.builds.get(&step.role).cloned(),
            requires_database,
            step,
        };

        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            let result = execute_step(input).await;
            // The receiver only drops once no step is running, so a send
            // failure here means the run is already over.
            let _ = tx.send(result);
        });
    }

    /// Apply a worker result to the run state
    fn absorb(
        &self,
        result: WorkerResult,
        plan: &DeploymentPlan,
        states: &mut HashMap<String, StepState>,
        ctx: &mut RunContext,
        reporter: &mut StatusReporter,
    ) {
        let state = match result.outcome {
            StepOutcome::Succeeded => StepState::Succeeded,
            StepOutcome::Failed => StepState::Failed,
            StepOutcome::Skipped => StepState::Skipped,
        };
        states.insert(result.step_id.clone(), state);

        match &result.artifact {
            Some(WorkerArtifact::Database { url }) => {
                ctx.database_url = Some(url.clone());
            }
            Some(WorkerArtifact::Build(handle)) => {
                ctx.builds.insert(result.role, handle.clone());
            }
            Some(WorkerArtifact::Published { url }) => {
                if result.role == Role::Backend {
                    ctx.backend_url = Some(url.clone());
                }
            }
            None => {}
        }

        let mut record = StepResult::new(
            &result.step_id,
            result.outcome,
            result.detail.clone(),
        )
        .with_attempts(result.attempts)
        .with_duration(result.duration_ms);
        if let Some(resource) = &result.resource {
            record = record.with_resource(resource.clone());
        }
        reporter.record(record);

        if state == StepState::Failed {
            error!(step = %result.step_id, detail = %result.detail, "step failed");
            for dependent in plan.dependents_of(&result.step_id) {
                if states.get(&dependent) == Some(&StepState::Pending) {
                    states.insert(dependent.clone(), StepState::Skipped);
                    reporter.record(StepResult::skipped(
                        &dependent,
                        format!("prerequisite '{}' failed", result.step_id),
                    ));
                }
            }
        }
    }
}

/// Mutable run context, owned by the scheduling loop
#[derive(Debug, Clone, Default)]
struct RunContext {
    database_url: Option<String>,
    backend_url: Option<String>,
    builds: HashMap<Role, BuildHandle>,
}

/// Everything a worker task needs, snapshotted at launch time
struct WorkerInput {
    step: Step,
    adapter: Arc<dyn ProviderAdapter>,
    step_timeout: Duration,
    config: DeployConfig,
    database_url: Option<String>,
    backend_url: Option<String>,
    build: Option<BuildHandle>,
    requires_database: bool,
}

/// What a worker sends back to the scheduling loop
struct WorkerResult {
    step_id: String,
    role: Role,
    outcome: StepOutcome,
    detail: String,
    resource: Option<String>,
    attempts: u32,
    duration_ms: u64,
    artifact: Option<WorkerArtifact>,
}

/// Step outputs the rest of the run needs
enum WorkerArtifact {
    Database { url: String },
    Build(BuildHandle),
    Published { url: String },
}

/// Outcome of one successful adapter operation
struct StepSuccess {
    detail: String,
    resource: Option<String>,
    artifact: Option<WorkerArtifact>,
}

/// Run one step with per-kind retry and a per-attempt timeout
async fn execute_step(input: WorkerInput) -> WorkerResult {
    let policy = RetryPolicy::for_action(input.step.action);
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        debug!(step = %input.step.id, attempt, "executing step");

        let outcome = match timeout(input.step_timeout, perform_action(&input)).await {
            Err(_) => Err(AdapterError::timeout(format!(
                "step '{}' exceeded {:?}",
                input.step.id, input.step_timeout
            ))),
            Ok(result) => result,
        };

        match outcome {
            Ok(success) => {
                info!(step = %input.step.id, attempt, "step succeeded");
                return WorkerResult {
                    step_id: input.step.id.clone(),
                    role: input.step.role,
                    outcome: StepOutcome::Succeeded,
                    detail: success.detail,
                    resource: success.resource,
                    attempts: attempt,
                    duration_ms: started.elapsed().as_millis() as u64,
                    artifact: success.artifact,
                };
            }
            // Re-provisioning something that exists is success: the
            // resource is there, which is all the plan asked for.
            Err(e)
                if e.kind == AdapterErrorKind::AlreadyExists
                    && input.step.action == ActionKind::ProvisionDatabase =>
            {
                info!(step = %input.step.id, "resource already exists, treating as success");
                return WorkerResult {
                    step_id: input.step.id.clone(),
                    role: input.step.role,
                    outcome: StepOutcome::Succeeded,
                    detail: format!("already provisioned: {}", e.message),
                    resource: None,
                    attempts: attempt,
                    duration_ms: started.elapsed().as_millis() as u64,
                    artifact: None,
                };
            }
            Err(e) if e.retryable && policy.should_retry(attempt) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    step = %input.step.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "step failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return WorkerResult {
                    step_id: input.step.id.clone(),
                    role: input.step.role,
                    outcome: StepOutcome::Failed,
                    detail: e.to_string(),
                    resource: None,
                    attempts: attempt,
                    duration_ms: started.elapsed().as_millis() as u64,
                    artifact: None,
                };
            }
        }
    }
}

/// Dispatch one step to the right adapter operation
async fn perform_action(input: &WorkerInput) -> Result<StepSuccess, AdapterError> {
    match input.step.action {
        ActionKind::ProvisionDatabase => {
            let conn = input.adapter.provision_database(&input.config).await?;
            Ok(StepSuccess {
                detail: format!("database ready at {}", conn.host),
                resource: Some(conn.host.clone()),
                artifact: Some(WorkerArtifact::Database { url: conn.url }),
            })
        }
        ActionKind::SetEnv => {
            if let Some(url) = &input.database_url {
                input.adapter.set_env_var("DATABASE_URL", url).await?;
                Ok(StepSuccess {
                    detail: "DATABASE_URL configured".to_string(),
                    resource: None,
                    artifact: None,
                })
            } else if input.requires_database {
                // The plan provisioned a database but its connection URL
                // never reached the run context. Silently succeeding here
                // would deploy a backend with no DATABASE_URL.
                Err(AdapterError::command_failed(
                    "database connection URL unavailable; cannot set DATABASE_URL",
                ))
            } else {
                Ok(StepSuccess {
                    detail: "no database to configure".to_string(),
                    resource: None,
                    artifact: None,
                })
            }
        }
        ActionKind::Build => {
            // Frontend builds bake the backend URL in when the plan linked
            // them; the env var must land before the build starts.
            if input.step.role == Role::Frontend {
                if let Some(url) = &input.backend_url {
                    input.adapter.set_env_var("BACKEND_URL", url).await?;
                }
            }

            let handle = input
                .adapter
                .trigger_build(&input.config.options.source_ref)
                .await?;
            Ok(StepSuccess {
                detail: format!("build {} ({})", handle.id, handle.content_hash),
                resource: None,
                artifact: Some(WorkerArtifact::Build(handle)),
            })
        }
        ActionKind::Publish => {
            let build = input.build.clone().ok_or_else(|| {
                AdapterError::command_failed(format!(
                    "no build handle available for step '{}'",
                    input.step.id
                ))
            })?;

            let url = input.adapter.publish(&build).await?;
            Ok(StepSuccess {
                detail: format!("published build {}", build.id),
                resource: Some(url.to_string()),
                artifact: Some(WorkerArtifact::Published {
                    url: url.to_string(),
                }),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_handle_flips_once() {
        let handle = CancelHandle::new();
        assert!(!handle.is_cancelled());

        let clone = handle.clone();
        clone.cancel();

        assert!(handle.is_cancelled());
        assert!(clone.is_cancelled());
    }
}
