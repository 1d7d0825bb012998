//! shipwright - deployment orchestration core
//!
//! Orchestrates multi-provider deployment of a web app's backend and
//! frontend: plan construction, concurrent step execution against provider
//! adapters, and report aggregation.
//!
//! # Architecture
//!
//! - A static target registry describes the available providers
//! - The plan builder turns a target pair plus config into an ordered,
//!   dependency-annotated plan
//! - The step executor drives the plan's dependency graph with bounded
//!   per-provider concurrency, retries, timeouts and cancellation
//! - The status reporter aggregates step results into a final report
//!
//! # Modules
//!
//! - `adapters`: provider integrations (railway, render, vercel, netlify, docker)
//! - `core`: orchestration logic (registry, planner, executor, reporter)
//! - `domain`: data structures (targets, steps, reports)
//! - `config`: deploy config files and API token resolution
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Preview the plan
//! shipwright plan --backend railway --frontend vercel --config deploy.yaml
//!
//! # Execute a deployment
//! shipwright run --backend railway --frontend vercel --config deploy.yaml
//!
//! # See what providers are available
//! shipwright targets
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::core::{
    CancelHandle, DeploymentPlan, PlanBuilder, StatusReporter, StepExecutor, TargetRegistry,
    ValidationError,
};
pub use adapters::{AdapterError, AdapterErrorKind, ProviderAdapter};
pub use config::DeployConfig;
pub use domain::{
    ActionKind, DeploymentReport, DeploymentTarget, OverallOutcome, Role, Step, StepOutcome,
    StepResult,
};
