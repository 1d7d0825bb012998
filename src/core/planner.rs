//! Plan construction: from a target pair and a config to an ordered,
//! dependency-annotated deployment plan.
//!
//! Plans are immutable after construction. The builder only emits valid
//! topological orders, and `DeploymentPlan::validate` re-checks the
//! invariant before execution anyway.

use serde::{Deserialize, Serialize};

use crate::config::DeployConfig;
use crate::domain::{ActionKind, Capability, DeploymentTarget, Role, Step};

use super::registry::ValidationError;

/// Well-known step ids
pub const STEP_PROVISION_DB: &str = "provision-db";
pub const STEP_SET_ENV: &str = "set-env";
pub const STEP_BUILD_BACKEND: &str = "build-backend";
pub const STEP_PUBLISH_BACKEND: &str = "publish-backend";
pub const STEP_BUILD_FRONTEND: &str = "build-frontend";
pub const STEP_PUBLISH_FRONTEND: &str = "publish-frontend";

/// An ordered deployment plan for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentPlan {
    /// Backend provider name
    pub backend: String,

    /// Frontend provider name
    pub frontend: String,

    /// Steps in execution order (a valid topological order of the
    /// dependency graph; ties keep declaration order, backend first)
    pub steps: Vec<Step>,
}

impl DeploymentPlan {
    /// Get a step by id
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Get the index of a step by id
    pub fn step_index(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    /// Provider name for a step, given the plan's target pair
    pub fn provider_for(&self, step: &Step) -> &str {
        match step.role {
            Role::Backend => &self.backend,
            Role::Frontend => &self.frontend,
        }
    }

    /// Check the ordering invariant: every dependency references a step
    /// that exists and appears strictly earlier in the plan.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (i, step) in self.steps.iter().enumerate() {
            for dep in &step.depends_on {
                match self.step_index(dep) {
                    None => {
                        return Err(ValidationError::UnknownDependency {
                            step: step.id.clone(),
                            dependency: dep.clone(),
                        });
                    }
                    Some(idx) if idx >= i => {
                        return Err(ValidationError::ForwardDependency {
                            step: step.id.clone(),
                            dependency: dep.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    /// Step ids that transitively depend on `step_id`
    pub fn dependents_of(&self, step_id: &str) -> Vec<String> {
        let mut affected = vec![step_id.to_string()];
        let mut result = Vec::new();

        // Steps are topologically ordered, so one forward pass finds all
        // transitive dependents.
        for step in &self.steps {
            if step.id == step_id {
                continue;
            }
            if step.depends_on.iter().any(|d| affected.contains(d)) {
                affected.push(step.id.clone());
                result.push(step.id.clone());
            }
        }

        result
    }
}

/// Builds deployment plans from a validated target pair and config
pub struct PlanBuilder;

impl PlanBuilder {
    /// Build a plan for the given backend/frontend pair.
    ///
    /// Fails with `MissingConfig` naming exactly the absent keys when the
    /// config does not cover both targets' requirements.
    pub fn build(
        backend: &DeploymentTarget,
        frontend: &DeploymentTarget,
        config: &DeployConfig,
    ) -> Result<DeploymentPlan, ValidationError> {
        let mut required: Vec<String> = backend.required_keys.clone();
        for key in &frontend.required_keys {
            if !required.contains(key) {
                required.push(key.clone());
            }
        }

        let missing = config.missing_keys(&required);
        if !missing.is_empty() {
            return Err(ValidationError::MissingConfig { keys: missing });
        }

        let mut steps = Vec::new();
        let has_database = backend.supports(Capability::SupportsDatabase);

        if has_database {
            steps.push(Step::new(
                STEP_PROVISION_DB,
                format!("Provision database on {}", backend.provider),
                Role::Backend,
                ActionKind::ProvisionDatabase,
            ));
        }

        let mut set_env = Step::new(
            STEP_SET_ENV,
            format!("Configure environment on {}", backend.provider),
            Role::Backend,
            ActionKind::SetEnv,
        );
        if has_database {
            // The database URL is the main thing set-env propagates.
            set_env = set_env.after(STEP_PROVISION_DB);
        }
        steps.push(set_env);

        steps.push(
            Step::new(
                STEP_BUILD_BACKEND,
                format!("Build backend on {}", backend.provider),
                Role::Backend,
                ActionKind::Build,
            )
            .after(STEP_SET_ENV),
        );

        steps.push(
            Step::new(
                STEP_PUBLISH_BACKEND,
                format!("Publish backend on {}", backend.provider),
                Role::Backend,
                ActionKind::Publish,
            )
            .after(STEP_BUILD_BACKEND),
        );

        let mut build_frontend = Step::new(
            STEP_BUILD_FRONTEND,
            format!("Build frontend on {}", frontend.provider),
            Role::Frontend,
            ActionKind::Build,
        );
        if config.options.frontend_needs_backend_url {
            // The frontend bakes the backend URL in at build time.
            build_frontend = build_frontend.after(STEP_PUBLISH_BACKEND);
        }
        steps.push(build_frontend);

        steps.push(
            Step::new(
                STEP_PUBLISH_FRONTEND,
                format!("Publish frontend on {}", frontend.provider),
                Role::Frontend,
                ActionKind::Publish,
            )
            .after(STEP_BUILD_FRONTEND),
        );

        let plan = DeploymentPlan {
            backend: backend.provider.clone(),
            frontend: frontend.provider.clone(),
            steps,
        };

        plan.validate()?;
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::TargetRegistry;

    fn config_with(keys: &[&str]) -> DeployConfig {
        let mut config = DeployConfig::default();
        for key in keys {
            config.values.insert(key.to_string(), "value".to_string());
        }
        config
    }

    fn full_config() -> DeployConfig {
        config_with(&["railway_project", "database_name", "vercel_project"])
    }

    fn targets() -> (DeploymentTarget, DeploymentTarget) {
        let registry = TargetRegistry::builtin();
        let backend = registry.find("railway", Role::Backend).unwrap().clone();
        let frontend = registry.find("vercel", Role::Frontend).unwrap().clone();
        (backend, frontend)
    }

    #[test]
    fn test_full_plan_shape() {
        let (backend, frontend) = targets();
        let plan = PlanBuilder::build(&backend, &frontend, &full_config()).unwrap();

        let ids: Vec<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                STEP_PROVISION_DB,
                STEP_SET_ENV,
                STEP_BUILD_BACKEND,
                STEP_PUBLISH_BACKEND,
                STEP_BUILD_FRONTEND,
                STEP_PUBLISH_FRONTEND,
            ]
        );

        // db before backend build, backend publish before frontend build
        assert!(plan.step_index(STEP_PROVISION_DB) < plan.step_index(STEP_BUILD_BACKEND));
        assert!(plan.step_index(STEP_PUBLISH_BACKEND) < plan.step_index(STEP_BUILD_FRONTEND));
        assert!(plan
            .step(STEP_BUILD_FRONTEND)
            .unwrap()
            .depends_on
            .contains(STEP_PUBLISH_BACKEND));
    }

    #[test]
    fn test_plan_is_valid_topological_order() {
        let (backend, frontend) = targets();
        let plan = PlanBuilder::build(&backend, &frontend, &full_config()).unwrap();
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_missing_keys_exact_set() {
        let (backend, frontend) = targets();
        let config = config_with(&["database_name"]);

        let err = PlanBuilder::build(&backend, &frontend, &config).unwrap_err();
        match err {
            ValidationError::MissingConfig { keys } => {
                assert_eq!(keys, vec!["railway_project", "vercel_project"]);
            }
            other => panic!("expected MissingConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_frontend_standalone_drops_backend_edge() {
        let (backend, frontend) = targets();
        let mut config = full_config();
        config.options.frontend_needs_backend_url = false;

        let plan = PlanBuilder::build(&backend, &frontend, &config).unwrap();
        assert!(plan
            .step(STEP_BUILD_FRONTEND)
            .unwrap()
            .depends_on
            .is_empty());
    }

    #[test]
    fn test_validate_rejects_forward_reference() {
        let (backend, frontend) = targets();
        let mut plan = PlanBuilder::build(&backend, &frontend, &full_config()).unwrap();

        // Move publish-frontend before its dependency
        let last = plan.steps.pop().unwrap();
        plan.steps.insert(0, last);

        assert!(matches!(
            plan.validate(),
            Err(ValidationError::ForwardDependency { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_dependency() {
        let (backend, frontend) = targets();
        let mut plan = PlanBuilder::build(&backend, &frontend, &full_config()).unwrap();

        plan.steps[3].depends_on.insert("no-such-step".to_string());

        assert!(matches!(
            plan.validate(),
            Err(ValidationError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_transitive_dependents() {
        let (backend, frontend) = targets();
        let plan = PlanBuilder::build(&backend, &frontend, &full_config()).unwrap();

        let dependents = plan.dependents_of(STEP_PROVISION_DB);
        assert_eq!(
            dependents,
            vec![
                STEP_SET_ENV,
                STEP_BUILD_BACKEND,
                STEP_PUBLISH_BACKEND,
                STEP_BUILD_FRONTEND,
                STEP_PUBLISH_FRONTEND,
            ]
        );
    }
}
