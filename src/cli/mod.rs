//! Command-line interface for shipwright.
//!
//! Provides commands for executing deployments, previewing plans without
//! running them, and listing the available targets.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters;
use crate::config::DeployConfig;
use crate::core::{reporter, DeploymentPlan, PlanBuilder, StepExecutor, TargetRegistry, ValidationError};
use crate::domain::Role;

/// Exit code for rejected input (unknown provider, missing config keys)
const EXIT_INVALID_INPUT: u8 = 3;

/// shipwright - deployment orchestration for multi-provider web apps
#[derive(Parser, Debug)]
#[command(name = "shipwright")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a full deployment
    Run {
        /// Backend provider (e.g., railway, render, docker)
        #[arg(long)]
        backend: String,

        /// Frontend provider (e.g., vercel, netlify)
        #[arg(long)]
        frontend: String,

        /// Deploy config file (YAML)
        #[arg(long)]
        config: PathBuf,

        /// Write the run report to this path instead of the default
        /// runs directory
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Compute and print a plan without executing it
    Plan {
        /// Backend provider
        #[arg(long)]
        backend: String,

        /// Frontend provider
        #[arg(long)]
        frontend: String,

        /// Deploy config file (YAML)
        #[arg(long)]
        config: PathBuf,
    },

    /// List available deployment targets
    Targets {
        /// Only show targets for this role
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
    },
}

/// Role filter for the targets command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Backend,
    Frontend,
}

impl From<RoleArg> for Role {
    fn from(r: RoleArg) -> Self {
        match r {
            RoleArg::Backend => Role::Backend,
            RoleArg::Frontend => Role::Frontend,
        }
    }
}

impl Cli {
    /// Execute the CLI command, returning the process exit code
    pub async fn execute(self) -> Result<ExitCode> {
        match self.command {
            Commands::Run {
                backend,
                frontend,
                config,
                report,
            } => run_deployment(&backend, &frontend, &config, report).await,
            Commands::Plan {
                backend,
                frontend,
                config,
            } => show_plan(&backend, &frontend, &config),
            Commands::Targets { role } => {
                show_targets(role.map(Role::from));
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// Build a plan from CLI arguments, distinguishing validation failures
/// (exit 3) from operational ones
fn build_plan(
    backend: &str,
    frontend: &str,
    config_path: &PathBuf,
) -> Result<Result<(DeploymentPlan, DeployConfig), ValidationError>> {
    let config = DeployConfig::from_file(config_path)?;
    let registry = TargetRegistry::builtin();

    let backend_target = match registry.find(backend, Role::Backend) {
        Ok(t) => t,
        Err(e) => return Ok(Err(e)),
    };
    let frontend_target = match registry.find(frontend, Role::Frontend) {
        Ok(t) => t,
        Err(e) => return Ok(Err(e)),
    };

    match PlanBuilder::build(backend_target, frontend_target, &config) {
        Ok(plan) => Ok(Ok((plan, config))),
        Err(e) => Ok(Err(e)),
    }
}

/// Execute a full deployment run
async fn run_deployment(
    backend: &str,
    frontend: &str,
    config_path: &PathBuf,
    report_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let (plan, config) = match build_plan(backend, frontend, config_path)? {
        Ok(built) => built,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ExitCode::from(EXIT_INVALID_INPUT));
        }
    };

    let registry = TargetRegistry::builtin();
    let backend_adapter = adapters::for_target(registry.find(backend, Role::Backend)?);
    let frontend_adapter = adapters::for_target(registry.find(frontend, Role::Frontend)?);

    let executor = StepExecutor::new(backend_adapter, frontend_adapter);

    // Ctrl-C requests graceful cancellation: running steps finish, the
    // rest are skipped and reported.
    let cancel = executor.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ncancellation requested, letting running steps finish...");
            cancel.cancel();
        }
    });

    let report = executor.run(&plan, &config).await?;

    let written = reporter::write_report(&report, report_path.as_deref())
        .await
        .context("Failed to persist run report")?;

    let summary = report.summarize();
    println!("Run {} — {}", report.run_id, summary.overall);
    for result in report.results.values() {
        let resource = result
            .resource
            .as_deref()
            .map(|r| format!(" -> {}", r))
            .unwrap_or_default();
        println!(
            "  {:<18} {:<10} {}{}",
            result.step_id,
            format!("{:?}", result.outcome).to_lowercase(),
            result.detail,
            resource
        );
    }
    if !summary.public_urls.is_empty() {
        println!("\nPublic URLs:");
        for url in &summary.public_urls {
            println!("  {}", url);
        }
    }
    if !summary.failed_steps.is_empty() {
        println!("\nFailed steps: {}", summary.failed_steps.join(", "));
    }
    eprintln!("\nreport written to {}", written.display());

    Ok(ExitCode::from(summary.overall.exit_code()))
}

/// Print the computed plan without executing anything
fn show_plan(backend: &str, frontend: &str, config_path: &PathBuf) -> Result<ExitCode> {
    let (plan, _config) = match build_plan(backend, frontend, config_path)? {
        Ok(built) => built,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ExitCode::from(EXIT_INVALID_INPUT));
        }
    };

    println!(
        "Plan: backend={} frontend={} ({} steps)",
        plan.backend,
        plan.frontend,
        plan.steps.len()
    );
    for (i, step) in plan.steps.iter().enumerate() {
        let deps = if step.depends_on.is_empty() {
            String::new()
        } else {
            format!(
                "  (after: {})",
                step.depends_on.iter().cloned().collect::<Vec<_>>().join(", ")
            )
        };
        println!(
            "  {}. [{:<12}] {} — {}{}",
            i + 1,
            step.action.to_string(),
            step.id,
            step.description,
            deps
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// List registry targets, optionally filtered by role
fn show_targets(role: Option<Role>) {
    let registry = TargetRegistry::builtin();

    let roles = match role {
        Some(r) => vec![r],
        None => vec![Role::Backend, Role::Frontend],
    };

    println!(
        "{:<10} {:<10} {:<34} {:<20}",
        "PROVIDER", "ROLE", "REQUIRED KEYS", "TOKEN ENV"
    );
    println!("{}", "-".repeat(76));

    for r in roles {
        for target in registry.list(r) {
            println!(
                "{:<10} {:<10} {:<34} {:<20}",
                target.provider,
                target.role.to_string(),
                target.required_keys.join(", "),
                target.token_env_var()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "shipwright",
            "run",
            "--backend",
            "railway",
            "--frontend",
            "vercel",
            "--config",
            "deploy.yaml",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                backend, frontend, ..
            } => {
                assert_eq!(backend, "railway");
                assert_eq!(frontend, "vercel");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_targets_filter() {
        let cli =
            Cli::try_parse_from(["shipwright", "targets", "--role", "frontend"]).unwrap();

        match cli.command {
            Commands::Targets { role } => {
                assert!(matches!(role, Some(RoleArg::Frontend)));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
