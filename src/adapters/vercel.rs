//! Vercel adapter, driving the `vercel` CLI.
//!
//! Frontend provider: env vars, builds and publishes only. Database
//! provisioning is not part of Vercel's capability set here and fails
//! with `Unsupported`.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{api_token, DeployConfig};

use super::process::ProviderCommand;
use super::railway::first_line;
use super::{content_hash, AdapterError, BuildHandle, ConnectionInfo, ProviderAdapter, PublicUrl};

const DEFAULT_CLI_TIMEOUT: Duration = Duration::from_secs(300);

pub struct VercelAdapter {
    binary_path: String,
    token: Option<String>,
    cli_timeout: Duration,
}

impl Default for VercelAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl VercelAdapter {
    pub fn new() -> Self {
        Self {
            binary_path: "vercel".to_string(),
            token: api_token("vercel"),
            cli_timeout: DEFAULT_CLI_TIMEOUT,
        }
    }

    fn command(&self, args: &[&str]) -> ProviderCommand {
        let mut cmd = ProviderCommand::new(&self.binary_path).args(args.iter().copied());
        if let Some(token) = &self.token {
            // The vercel CLI only takes the token as an argument; mark it
            // secret so the command logging redacts it.
            cmd = cmd.arg("--token").secret_arg(token.clone());
        }
        cmd
    }
}

#[async_trait]
impl ProviderAdapter for VercelAdapter {
    fn provider(&self) -> &str {
        "vercel"
    }

    async fn provision_database(
        &self,
        _config: &DeployConfig,
    ) -> Result<ConnectionInfo, AdapterError> {
        Err(AdapterError::unsupported("vercel", "provision_database"))
    }

    async fn set_env_var(&self, key: &str, value: &str) -> Result<(), AdapterError> {
        self.command(&["env", "add", key, "production"])
            .stdin(value)
            .run(self.cli_timeout)
            .await?;
        Ok(())
    }

    async fn trigger_build(&self, source_ref: &str) -> Result<BuildHandle, AdapterError> {
        let output = self
            .command(&["build", "--yes"])
            .env("VERCEL_GIT_COMMIT_REF", source_ref)
            .run(self.cli_timeout)
            .await?;

        Ok(BuildHandle {
            id: first_line(&output),
            content_hash: content_hash(source_ref),
        })
    }

    async fn publish(&self, _build: &BuildHandle) -> Result<PublicUrl, AdapterError> {
        let output = self
            .command(&["deploy", "--prebuilt", "--prod"])
            .run(self.cli_timeout)
            .await?;

        Ok(PublicUrl(first_line(&output)))
    }
}
