//! Render adapter, driving the `render` CLI.
//!
//! Backend provider. Managed Postgres is created per config; builds and
//! deploys are keyed to a service id from the config values.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{api_token, DeployConfig};

use super::process::ProviderCommand;
use super::railway::{first_line, host_of};
use super::{
    content_hash, tolerate_existing, AdapterError, BuildHandle, ConnectionInfo, ProviderAdapter,
    PublicUrl,
};

const DEFAULT_CLI_TIMEOUT: Duration = Duration::from_secs(300);

pub struct RenderAdapter {
    binary_path: String,
    token: Option<String>,
    cli_timeout: Duration,
}

impl Default for RenderAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderAdapter {
    pub fn new() -> Self {
        Self {
            binary_path: "render".to_string(),
            token: api_token("render"),
            cli_timeout: DEFAULT_CLI_TIMEOUT,
        }
    }

    fn command(&self, args: &[&str]) -> ProviderCommand {
        let mut cmd = ProviderCommand::new(&self.binary_path).args(args.iter().copied());
        if let Some(token) = &self.token {
            cmd = cmd.env("RENDER_API_KEY", token.clone());
        }
        cmd
    }
}

#[async_trait]
impl ProviderAdapter for RenderAdapter {
    fn provider(&self) -> &str {
        "render"
    }

    async fn provision_database(
        &self,
        config: &DeployConfig,
    ) -> Result<ConnectionInfo, AdapterError> {
        let db_name = config.value("database_name").unwrap_or("app-db");
        let region = config.value("render_region").unwrap_or("oregon");

        let created = self
            .command(&["postgres", "create", "--name", db_name, "--region", region])
            .run(self.cli_timeout)
            .await;
        tolerate_existing(created)?;

        // Connection string lookup works for an existing database too
        let url = self
            .command(&["postgres", "connection-string", "--name", db_name])
            .run(self.cli_timeout)
            .await?;

        let host = host_of(&url);
        Ok(ConnectionInfo { url, host })
    }

    async fn set_env_var(&self, key: &str, value: &str) -> Result<(), AdapterError> {
        self.command(&["env", "set", &format!("{}={}", key, value)])
            .run(self.cli_timeout)
            .await?;
        Ok(())
    }

    async fn trigger_build(&self, source_ref: &str) -> Result<BuildHandle, AdapterError> {
        let output = self
            .command(&["builds", "create", "--ref", source_ref, "--wait"])
            .run(self.cli_timeout)
            .await?;

        Ok(BuildHandle {
            id: first_line(&output),
            content_hash: content_hash(source_ref),
        })
    }

    async fn publish(&self, build: &BuildHandle) -> Result<PublicUrl, AdapterError> {
        let output = self
            .command(&["deploys", "create", "--build", &build.id, "--wait"])
            .run(self.cli_timeout)
            .await?;

        Ok(PublicUrl(first_line(&output)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_name() {
        assert_eq!(RenderAdapter::new().provider(), "render");
    }
}
