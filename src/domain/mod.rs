//! Domain types for the shipwright orchestrator.
//!
//! This module contains the core data structures:
//! - Target: static provider/role descriptions
//! - Step: atomic units of deployment work and their results
//! - Report: aggregated run outcomes

pub mod report;
pub mod step;
pub mod target;

// Re-export commonly used types
pub use report::{DeploymentReport, OverallOutcome, Summary};
pub use step::{ActionKind, Step, StepOutcome, StepResult, StepState};
pub use target::{Capability, DeploymentTarget, Role};
