//! The target registry: which providers exist and what they need.
//!
//! Static data, loaded once at startup. The registry is also the first
//! validation surface, so the pre-execution error taxonomy lives here.

use thiserror::Error;

use crate::domain::{Capability, DeploymentTarget, Role};

/// Errors raised before any step runs. Always fatal, never retried;
/// the CLI maps them to exit code 3.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("unknown provider '{provider}' for role {role}")]
    UnknownProvider { provider: String, role: Role },

    #[error("unknown role '{role}' (expected 'backend' or 'frontend')")]
    UnknownRole { role: String },

    #[error("missing required config keys: {}", keys.join(", "))]
    MissingConfig { keys: Vec<String> },

    #[error("step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("step '{step}' depends on later step '{dependency}' (forward references not allowed)")]
    ForwardDependency { step: String, dependency: String },
}

/// Read-only table of available deployment targets
pub struct TargetRegistry {
    targets: Vec<DeploymentTarget>,
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TargetRegistry {
    /// The built-in provider set
    pub fn builtin() -> Self {
        let backend_caps = [
            Capability::SupportsDatabase,
            Capability::SupportsEnvVars,
            Capability::SupportsBuilds,
            Capability::SupportsPublish,
        ];
        let frontend_caps = [
            Capability::SupportsEnvVars,
            Capability::SupportsBuilds,
            Capability::SupportsPublish,
        ];

        Self {
            targets: vec![
                DeploymentTarget::new(
                    "railway",
                    Role::Backend,
                    &["railway_project", "database_name"],
                    &backend_caps,
                ),
                DeploymentTarget::new(
                    "render",
                    Role::Backend,
                    &["render_service", "database_name"],
                    &backend_caps,
                ),
                DeploymentTarget::new("docker", Role::Backend, &["database_name"], &backend_caps),
                DeploymentTarget::new(
                    "vercel",
                    Role::Frontend,
                    &["vercel_project"],
                    &frontend_caps,
                ),
                DeploymentTarget::new(
                    "netlify",
                    Role::Frontend,
                    &["netlify_site"],
                    &frontend_caps,
                ),
            ],
        }
    }

    /// All targets for a role, in declaration order
    pub fn list(&self, role: Role) -> Vec<&DeploymentTarget> {
        self.targets.iter().filter(|t| t.role == role).collect()
    }

    /// Find a target by provider name and role
    pub fn find(&self, provider: &str, role: Role) -> Result<&DeploymentTarget, ValidationError> {
        self.targets
            .iter()
            .find(|t| t.provider == provider && t.role == role)
            .ok_or_else(|| ValidationError::UnknownProvider {
                provider: provider.to_string(),
                role,
            })
    }

    /// Parse a role name, failing with `UnknownRole` for anything that is
    /// not "backend" or "frontend"
    pub fn parse_role(role: &str) -> Result<Role, ValidationError> {
        match role {
            "backend" => Ok(Role::Backend),
            "frontend" => Ok(Role::Frontend),
            other => Err(ValidationError::UnknownRole {
                role: other.to_string(),
            }),
        }
    }
}
