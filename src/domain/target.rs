//! Deployment targets: which provider hosts which half of the app.
//!
//! Targets are static descriptions loaded at startup; nothing mutates them.

use serde::{Deserialize, Serialize};

/// A hosting provider assigned to one role of the application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentTarget {
    /// Provider name as used on the CLI (e.g., "railway", "vercel")
    pub provider: String,

    /// Which half of the app this target hosts
    pub role: Role,

    /// Config keys that must be present before a plan can be built
    pub required_keys: Vec<String>,

    /// What the provider can do
    pub capabilities: Vec<Capability>,
}

impl DeploymentTarget {
    pub fn new(
        provider: impl Into<String>,
        role: Role,
        required_keys: &[&str],
        capabilities: &[Capability],
    ) -> Self {
        Self {
            provider: provider.into(),
            role,
            required_keys: required_keys.iter().map(|k| k.to_string()).collect(),
            capabilities: capabilities.to_vec(),
        }
    }

    /// Check whether this target advertises a capability
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Environment variable holding this provider's API token
    pub fn token_env_var(&self) -> String {
        format!("{}_API_TOKEN", self.provider.to_uppercase())
    }
}

/// Role a target plays in the deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Backend,
    Frontend,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Backend => "backend",
            Role::Frontend => "frontend",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider capabilities relevant to plan construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Can provision a managed database
    SupportsDatabase,

    /// Can set environment variables on the deployed service
    SupportsEnvVars,

    /// Can trigger builds from a source ref
    SupportsBuilds,

    /// Can publish a build to a public URL
    SupportsPublish,
}
