//! Provider adapters: the capability-set interface to hosting providers.
//!
//! Every provider implements the same contract; only a subset of operations
//! is meaningful per role. Frontend providers reject `provision_database`
//! with `AdapterErrorKind::Unsupported`.

pub mod docker;
pub mod netlify;
pub mod process;
pub mod railway;
pub mod render;
pub mod vercel;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DeployConfig;
use crate::domain::{DeploymentTarget, Role};

pub use docker::DockerAdapter;
pub use netlify::NetlifyAdapter;
pub use railway::RailwayAdapter;
pub use render::RenderAdapter;
pub use vercel::VercelAdapter;

/// Connection details for a provisioned database
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Connection URL (contains credentials; never logged verbatim)
    pub url: String,

    /// Host portion, safe to display
    pub host: String,
}

/// Handle to a triggered build
#[derive(Debug, Clone)]
pub struct BuildHandle {
    /// Provider-assigned build identifier
    pub id: String,

    /// Content hash of the built source. Providers deduplicate repeated
    /// publishes of the same hash, which is what makes re-triggering
    /// publish safe.
    pub content_hash: String,
}

/// Public URL of a published deployment
#[derive(Debug, Clone)]
pub struct PublicUrl(pub String);

impl std::fmt::Display for PublicUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Common error wrapper for all provider operations
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    /// Transient network failure, worth retrying
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Network, message, true)
    }

    /// Provider rate limit hit, worth retrying after backoff
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::RateLimited, message, true)
    }

    /// Missing or rejected credentials; retrying will not help
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Auth, message, false)
    }

    /// Operation exceeded its deadline
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Timeout, message, false)
    }

    /// The resource already exists. The executor treats this as success
    /// for provisioning steps.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::AlreadyExists, message, false)
    }

    /// The provider does not support this operation
    pub fn unsupported(provider: &str, operation: &str) -> Self {
        Self::new(
            AdapterErrorKind::Unsupported,
            format!("provider '{}' does not support {}", provider, operation),
            false,
        )
    }

    /// Provider CLI exited non-zero
    pub fn command_failed(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::CommandFailed, message, false)
    }
}

/// Classification of provider failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorKind {
    Network,
    RateLimited,
    Auth,
    Timeout,
    AlreadyExists,
    Unsupported,
    CommandFailed,
}

impl std::fmt::Display for AdapterErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdapterErrorKind::Network => "network error",
            AdapterErrorKind::RateLimited => "rate limited",
            AdapterErrorKind::Auth => "authentication failed",
            AdapterErrorKind::Timeout => "timed out",
            AdapterErrorKind::AlreadyExists => "already exists",
            AdapterErrorKind::Unsupported => "unsupported operation",
            AdapterErrorKind::CommandFailed => "command failed",
        };
        f.write_str(s)
    }
}

/// Trait implemented by every provider adapter
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name this adapter talks to
    fn provider(&self) -> &str;

    /// Provision a managed database, returning connection details
    async fn provision_database(
        &self,
        config: &DeployConfig,
    ) -> Result<ConnectionInfo, AdapterError>;

    /// Set an environment variable on the deployed service
    async fn set_env_var(&self, key: &str, value: &str) -> Result<(), AdapterError>;

    /// Trigger a build of the given source ref
    async fn trigger_build(&self, source_ref: &str) -> Result<BuildHandle, AdapterError>;

    /// Publish a build, returning the public URL
    async fn publish(&self, build: &BuildHandle) -> Result<PublicUrl, AdapterError>;
}

/// Collapse an `AlreadyExists` failure from a create command into success,
/// so the caller can look up the existing resource instead of failing a
/// re-run.
pub(crate) fn tolerate_existing(result: Result<String, AdapterError>) -> Result<(), AdapterError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.kind == AdapterErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Content hash for publish deduplication (first 16 hex chars of SHA-256)
pub(crate) fn content_hash(input: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

/// Construct the adapter for a registry target
pub fn for_target(target: &DeploymentTarget) -> Arc<dyn ProviderAdapter> {
    match (target.provider.as_str(), target.role) {
        ("railway", Role::Backend) => Arc::new(RailwayAdapter::new()),
        ("render", Role::Backend) => Arc::new(RenderAdapter::new()),
        ("docker", Role::Backend) => Arc::new(DockerAdapter::new()),
        ("vercel", Role::Frontend) => Arc::new(VercelAdapter::new()),
        ("netlify", Role::Frontend) => Arc::new(NetlifyAdapter::new()),
        // The registry only hands out the pairs above; anything else is a
        // registry bug, not user input.
        (provider, role) => unreachable!("no adapter for {}/{}", provider, role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AdapterError::network("connection reset").retryable);
        assert!(AdapterError::rate_limited("429").retryable);
        assert!(!AdapterError::auth("bad token").retryable);
        assert!(!AdapterError::timeout("deadline exceeded").retryable);
        assert!(!AdapterError::already_exists("db exists").retryable);
    }

    #[test]
    fn test_tolerate_existing_recovers_only_that_kind() {
        assert!(tolerate_existing(Ok("created".to_string())).is_ok());
        assert!(tolerate_existing(Err(AdapterError::already_exists("db exists"))).is_ok());
        assert!(tolerate_existing(Err(AdapterError::auth("bad token"))).is_err());
        assert!(tolerate_existing(Err(AdapterError::network("reset"))).is_err());
    }

    #[test]
    fn test_content_hash_is_stable() {
        let h1 = content_hash("main");
        let h2 = content_hash("main");
        let h3 = content_hash("release");

        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert_eq!(h1.len(), 16);
    }

    #[test]
    fn test_error_display() {
        let err = AdapterError::unsupported("vercel", "provision_database");
        let text = err.to_string();
        assert!(text.contains("unsupported operation"));
        assert!(text.contains("vercel"));
    }
}
