//! Shared subprocess runner for provider CLIs.
//!
//! All adapters drive their provider's CLI the same way: spawn with piped
//! stdio, optionally feed stdin, wait with a deadline, and map failures
//! into the common `AdapterError` taxonomy.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::AdapterError;

/// A provider CLI invocation, built up before running
pub struct ProviderCommand {
    binary: String,
    args: Vec<CommandArg>,
    envs: Vec<(String, String)>,
    stdin: Option<String>,
}

struct CommandArg {
    value: String,
    secret: bool,
}

impl ProviderCommand {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            envs: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(CommandArg {
            value: arg.into(),
            secret: false,
        });
        self
    }

    /// Append an argument whose value must never reach logs (API tokens
    /// some CLIs only accept on the command line).
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(CommandArg {
            value: arg.into(),
            secret: true,
        });
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|a| CommandArg {
            value: a.into(),
            secret: false,
        }));
        self
    }

    /// Arguments as they appear in logs: secret values are redacted
    pub(super) fn display_args(&self) -> Vec<&str> {
        self.args
            .iter()
            .map(|a| if a.secret { "<redacted>" } else { a.value.as_str() })
            .collect()
    }

    /// Pass an environment variable to the child only. Values are not
    /// logged; this is how API tokens reach provider CLIs.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Run to completion with a deadline, returning trimmed stdout.
    pub async fn run(self, deadline: Duration) -> Result<String, AdapterError> {
        debug!(binary = %self.binary, args = ?self.display_args(), "running provider command");

        let mut command = Command::new(&self.binary);
        command
            .args(self.args.iter().map(|a| &a.value))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out child must not outlive the dropped wait future
            .kill_on_drop(true);

        for (key, value) in &self.envs {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|e| {
            AdapterError::command_failed(format!("failed to spawn '{}': {}", self.binary, e))
        })?;

        if let Some(input) = self.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes()).await.map_err(|e| {
                    AdapterError::command_failed(format!(
                        "failed to write to '{}' stdin: {}",
                        self.binary, e
                    ))
                })?;
                // Drop stdin to signal EOF
            }
        } else {
            drop(child.stdin.take());
        }

        let output = timeout(deadline, child.wait_with_output())
            .await
            .map_err(|_| {
                AdapterError::timeout(format!(
                    "'{}' did not finish within {:?}",
                    self.binary, deadline
                ))
            })?
            .map_err(|e| {
                AdapterError::command_failed(format!("failed to wait for '{}': {}", self.binary, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&self.binary, stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim().to_string())
    }
}

/// Classify a non-zero exit by inspecting stderr.
///
/// Provider CLIs do not share an error vocabulary, so this is heuristic:
/// recognized phrases map to a specific kind, everything else stays a
/// plain command failure.
fn classify_failure(binary: &str, stderr: &str) -> AdapterError {
    let lower = stderr.to_lowercase();

    if lower.contains("already exists")
        || lower.contains("already provisioned")
        || lower.contains("already in use")
    {
        AdapterError::already_exists(stderr)
    } else if lower.contains("rate limit") || lower.contains("too many requests") {
        AdapterError::rate_limited(stderr)
    } else if lower.contains("unauthorized")
        || lower.contains("forbidden")
        || lower.contains("not logged in")
        || lower.contains("invalid token")
    {
        AdapterError::auth(stderr)
    } else if lower.contains("could not resolve")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("network")
    {
        AdapterError::network(stderr)
    } else {
        AdapterError::command_failed(format!("'{}' failed: {}", binary, stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AdapterErrorKind;

    #[test]
    fn test_classify_already_exists() {
        let err = classify_failure("railway", "error: database 'app' already exists");
        assert_eq!(err.kind, AdapterErrorKind::AlreadyExists);
        assert!(!err.retryable);
    }

    #[test]
    fn test_classify_rate_limit_is_retryable() {
        let err = classify_failure("vercel", "Error: rate limit exceeded, retry later");
        assert_eq!(err.kind, AdapterErrorKind::RateLimited);
        assert!(err.retryable);
    }

    #[test]
    fn test_classify_auth() {
        let err = classify_failure("netlify", "You are not logged in");
        assert_eq!(err.kind, AdapterErrorKind::Auth);
        assert!(!err.retryable);
    }

    #[test]
    fn test_classify_unknown_failure() {
        let err = classify_failure("docker", "some unexpected explosion");
        assert_eq!(err.kind, AdapterErrorKind::CommandFailed);
    }

    #[tokio::test]
    async fn test_run_missing_binary() {
        let result = ProviderCommand::new("definitely-not-a-real-binary-xyz")
            .arg("--version")
            .run(Duration::from_secs(1))
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::CommandFailed);
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let output = ProviderCommand::new("echo")
            .arg("hello")
            .run(Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(output, "hello");
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let result = ProviderCommand::new("sleep")
            .arg("5")
            .run(Duration::from_millis(100))
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_timed_out_child_is_killed() {
        let temp = tempfile::TempDir::new().unwrap();
        let marker = temp.path().join("marker");
        let script = format!("sleep 1 && touch {}", marker.display());

        let result = ProviderCommand::new("sh")
            .arg("-c")
            .arg(script)
            .run(Duration::from_millis(100))
            .await;
        assert_eq!(result.unwrap_err().kind, AdapterErrorKind::Timeout);

        // Had the shell survived the timeout it would create the marker
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[test]
    fn test_secret_args_are_redacted_from_logging() {
        let cmd = ProviderCommand::new("vercel")
            .arg("deploy")
            .arg("--token")
            .secret_arg("super-secret-token");

        assert_eq!(cmd.display_args(), vec!["deploy", "--token", "<redacted>"]);
    }
}
