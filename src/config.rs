//! Deployment configuration.
//!
//! A deploy config is a YAML file with two blocks:
//! - `values`: provider settings (project names, database name, region...)
//!   validated against the selected targets' required keys
//! - `options`: run tuning (per-provider concurrency, step timeout, the
//!   frontend -> backend-URL dependency, source ref)
//!
//! Provider API tokens are NOT part of the config file. They come from
//! `<PROVIDER>_API_TOKEN` environment variables and are never logged or
//! written into reports.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Parsed deployment configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Provider settings, key -> value
    #[serde(default)]
    pub values: BTreeMap<String, String>,

    /// Run tuning
    #[serde(default)]
    pub options: RunOptions,
}

impl DeployConfig {
    /// Load a deploy config from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&content)
    }

    /// Parse a deploy config from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config YAML")
    }

    /// Look up a config value
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Config keys from `required` that are absent from this config,
    /// in the order given.
    pub fn missing_keys(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|k| !self.values.contains_key(*k))
            .cloned()
            .collect()
    }
}

/// Tuning knobs for a deployment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Max concurrent steps per provider (rate-limit protection)
    #[serde(default = "default_provider_concurrency")]
    pub provider_concurrency: usize,

    /// Per-step timeout in seconds
    #[serde(default = "default_step_timeout")]
    pub step_timeout_seconds: u64,

    /// Whether the frontend build waits for the backend publish so it can
    /// be handed the backend URL
    #[serde(default = "default_frontend_needs_backend_url")]
    pub frontend_needs_backend_url: bool,

    /// Source ref to build (branch, tag, or commit)
    #[serde(default = "default_source_ref")]
    pub source_ref: String,
}

fn default_provider_concurrency() -> usize {
    2
}
fn default_step_timeout() -> u64 {
    300
} // 5 min
fn default_frontend_needs_backend_url() -> bool {
    true
}
fn default_source_ref() -> String {
    "main".to_string()
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            provider_concurrency: default_provider_concurrency(),
            step_timeout_seconds: default_step_timeout(),
            frontend_needs_backend_url: default_frontend_needs_backend_url(),
            source_ref: default_source_ref(),
        }
    }
}

impl RunOptions {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_seconds)
    }
}

/// API token for a provider, read from `<PROVIDER>_API_TOKEN`.
///
/// Returns None when unset; adapters then fall back to the provider CLI's
/// own login state.
pub fn api_token(provider: &str) -> Option<String> {
    let var = format!("{}_API_TOKEN", provider.to_uppercase());
    std::env::var(var).ok().filter(|t| !t.is_empty())
}

/// Directory where run reports are written by default
/// (`$SHIPWRIGHT_HOME/runs` or `~/.shipwright/runs`)
pub fn runs_dir() -> Result<PathBuf> {
    let home = if let Ok(env_home) = std::env::var("SHIPWRIGHT_HOME") {
        PathBuf::from(env_home)
    } else {
        dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".shipwright")
    };

    Ok(home.join("runs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CONFIG_YAML: &str = r#"
values:
  railway_project: my-app
  database_name: my-app-db
  vercel_project: my-app-web

options:
  provider_concurrency: 1
  step_timeout_seconds: 60
  frontend_needs_backend_url: false
  source_ref: release
"#;

    #[test]
    fn test_config_parsing() {
        let config = DeployConfig::from_yaml(TEST_CONFIG_YAML).unwrap();

        assert_eq!(config.value("railway_project"), Some("my-app"));
        assert_eq!(config.options.provider_concurrency, 1);
        assert_eq!(config.options.step_timeout_seconds, 60);
        assert!(!config.options.frontend_needs_backend_url);
        assert_eq!(config.options.source_ref, "release");
    }

    #[test]
    fn test_options_default_when_absent() {
        let config = DeployConfig::from_yaml("values:\n  a: b\n").unwrap();

        assert_eq!(config.options.provider_concurrency, 2);
        assert_eq!(config.options.step_timeout_seconds, 300);
        assert!(config.options.frontend_needs_backend_url);
        assert_eq!(config.options.source_ref, "main");
    }

    #[test]
    fn test_missing_keys_preserves_order() {
        let config = DeployConfig::from_yaml("values:\n  b: present\n").unwrap();

        let required = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(config.missing_keys(&required), vec!["a", "c"]);
    }

    #[test]
    fn test_api_token_absent() {
        assert_eq!(api_token("no-such-provider-zz"), None);
    }
}
