//! Core orchestration logic.
//!
//! This module contains:
//! - Registry: available deployment targets and pre-execution validation
//! - Planner: plan construction and ordering invariants
//! - Retry: per-action-kind retry policies
//! - Executor: concurrent step execution with skip/cancel semantics
//! - Reporter: report aggregation and audit persistence

pub mod executor;
pub mod planner;
pub mod registry;
pub mod reporter;
pub mod retry;

// Re-export commonly used types
pub use executor::{CancelHandle, StepExecutor};
pub use planner::{DeploymentPlan, PlanBuilder};
pub use registry::{TargetRegistry, ValidationError};
pub use reporter::{write_report, StatusReporter};
pub use retry::RetryPolicy;
