//! Netlify adapter, driving the `netlify` CLI.
//!
//! Frontend provider; same shape as the Vercel adapter with Netlify's
//! command vocabulary.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{api_token, DeployConfig};

use super::process::ProviderCommand;
use super::railway::first_line;
use super::{content_hash, AdapterError, BuildHandle, ConnectionInfo, ProviderAdapter, PublicUrl};

const DEFAULT_CLI_TIMEOUT: Duration = Duration::from_secs(300);

pub struct NetlifyAdapter {
    binary_path: String,
    token: Option<String>,
    cli_timeout: Duration,
}

impl Default for NetlifyAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl NetlifyAdapter {
    pub fn new() -> Self {
        Self {
            binary_path: "netlify".to_string(),
            token: api_token("netlify"),
            cli_timeout: DEFAULT_CLI_TIMEOUT,
        }
    }

    fn command(&self, args: &[&str]) -> ProviderCommand {
        let mut cmd = ProviderCommand::new(&self.binary_path).args(args.iter().copied());
        if let Some(token) = &self.token {
            cmd = cmd.env("NETLIFY_AUTH_TOKEN", token.clone());
        }
        cmd
    }
}

#[async_trait]
impl ProviderAdapter for NetlifyAdapter {
    fn provider(&self) -> &str {
        "netlify"
    }

    async fn provision_database(
        &self,
        _config: &DeployConfig,
    ) -> Result<ConnectionInfo, AdapterError> {
        Err(AdapterError::unsupported("netlify", "provision_database"))
    }

    async fn set_env_var(&self, key: &str, value: &str) -> Result<(), AdapterError> {
        self.command(&["env:set", key, value])
            .run(self.cli_timeout)
            .await?;
        Ok(())
    }

    async fn trigger_build(&self, source_ref: &str) -> Result<BuildHandle, AdapterError> {
        let output = self
            .command(&["build", "--context", "production"])
            .env("COMMIT_REF", source_ref)
            .run(self.cli_timeout)
            .await?;

        Ok(BuildHandle {
            id: first_line(&output),
            content_hash: content_hash(source_ref),
        })
    }

    async fn publish(&self, _build: &BuildHandle) -> Result<PublicUrl, AdapterError> {
        let output = self
            .command(&["deploy", "--prod", "--json"])
            .run(self.cli_timeout)
            .await?;

        // `deploy --json` emits a JSON object with the site URL; fall back
        // to raw output when parsing fails.
        let url = serde_json::from_str::<serde_json::Value>(&output)
            .ok()
            .and_then(|v| v.get("deploy_url").and_then(|u| u.as_str()).map(String::from))
            .unwrap_or_else(|| first_line(&output));

        Ok(PublicUrl(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AdapterErrorKind;

    #[test]
    fn test_adapter_name() {
        assert_eq!(NetlifyAdapter::new().provider(), "netlify");
    }

    #[tokio::test]
    async fn test_provision_database_unsupported() {
        let err = NetlifyAdapter::new()
            .provision_database(&DeployConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind, AdapterErrorKind::Unsupported);
    }
}
