//! Generic Docker adapter, driving the `docker` CLI.
//!
//! Local fallback backend for environments without a managed provider:
//! the database is a Postgres container, builds are `docker build`, and
//! publish runs the built image with a published port.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::DeployConfig;

use super::process::ProviderCommand;
use super::railway::first_line;
use super::{
    content_hash, tolerate_existing, AdapterError, BuildHandle, ConnectionInfo, ProviderAdapter,
    PublicUrl,
};

const DEFAULT_CLI_TIMEOUT: Duration = Duration::from_secs(600);

pub struct DockerAdapter {
    binary_path: String,
    cli_timeout: Duration,
}

impl Default for DockerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerAdapter {
    pub fn new() -> Self {
        Self {
            binary_path: "docker".to_string(),
            cli_timeout: DEFAULT_CLI_TIMEOUT,
        }
    }

    fn command(&self, args: &[&str]) -> ProviderCommand {
        ProviderCommand::new(&self.binary_path).args(args.iter().copied())
    }
}

#[async_trait]
impl ProviderAdapter for DockerAdapter {
    fn provider(&self) -> &str {
        "docker"
    }

    async fn provision_database(
        &self,
        config: &DeployConfig,
    ) -> Result<ConnectionInfo, AdapterError> {
        let db_name = config.value("database_name").unwrap_or("app-db");
        let password = config.value("database_password").unwrap_or("postgres");

        // A name conflict means the database container is already up; the
        // connection info below is the same either way.
        let created = self
            .command(&[
                "run",
                "--detach",
                "--name",
                db_name,
                "--publish",
                "5432:5432",
                "--env",
                &format!("POSTGRES_PASSWORD={}", password),
                "postgres:16",
            ])
            .run(self.cli_timeout)
            .await;
        tolerate_existing(created)?;

        Ok(ConnectionInfo {
            url: format!("postgres://postgres:{}@localhost:5432/postgres", password),
            host: "localhost:5432".to_string(),
        })
    }

    async fn set_env_var(&self, key: &str, value: &str) -> Result<(), AdapterError> {
        use tokio::io::AsyncWriteExt;

        // No remote service to configure; env vars land in an env file the
        // published container is started with.
        let line = format!("{}={}\n", key, value);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(".deploy.env")
            .await
            .map_err(|e| AdapterError::command_failed(format!("failed to open env file: {}", e)))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AdapterError::command_failed(format!("failed to write env file: {}", e)))?;

        Ok(())
    }

    async fn trigger_build(&self, source_ref: &str) -> Result<BuildHandle, AdapterError> {
        let hash = content_hash(source_ref);
        let tag = format!("app:{}", hash);

        self.command(&["build", "--tag", &tag, "."])
            .run(self.cli_timeout)
            .await?;

        Ok(BuildHandle {
            id: tag,
            content_hash: hash,
        })
    }

    async fn publish(&self, build: &BuildHandle) -> Result<PublicUrl, AdapterError> {
        // Container name derives from the content hash, so republishing the
        // same build is a no-op the classifier reports as AlreadyExists.
        let name = format!("app-{}", build.content_hash);

        let output = self
            .command(&[
                "run",
                "--detach",
                "--name",
                &name,
                "--env-file",
                ".deploy.env",
                "--publish",
                "8080:8080",
                &build.id,
            ])
            .run(self.cli_timeout)
            .await;

        match output {
            Ok(out) => {
                let _container_id = first_line(&out);
                Ok(PublicUrl("http://localhost:8080".to_string()))
            }
            Err(e) if e.kind == super::AdapterErrorKind::AlreadyExists => {
                Ok(PublicUrl("http://localhost:8080".to_string()))
            }
            Err(e) => Err(e),
        }
    }
}
