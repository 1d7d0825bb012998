//! End-to-end executor runs against scripted adapters.

mod common;

use std::sync::Arc;

use shipwright::adapters::AdapterError;
use shipwright::core::planner::{
    STEP_BUILD_BACKEND, STEP_BUILD_FRONTEND, STEP_PROVISION_DB, STEP_PUBLISH_BACKEND,
    STEP_PUBLISH_FRONTEND, STEP_SET_ENV,
};
use shipwright::core::{StepExecutor, ValidationError};
use shipwright::domain::{OverallOutcome, StepOutcome};

use common::{full_config, railway_vercel_plan, MockAdapter};

#[tokio::test]
async fn test_full_run_succeeds_end_to_end() {
    let config = full_config();
    let plan = railway_vercel_plan(&config);

    let backend = Arc::new(MockAdapter::new("railway"));
    let frontend = Arc::new(MockAdapter::new("vercel"));
    let executor = StepExecutor::new(backend.clone(), frontend.clone());

    let report = executor.run(&plan, &config).await.unwrap();

    assert_eq!(report.results.len(), 6);
    assert!(report
        .results
        .values()
        .all(|r| r.outcome == StepOutcome::Succeeded));
    assert_eq!(report.overall, Some(OverallOutcome::Success));

    // Each half of the app got exactly one build and one publish
    assert_eq!(backend.build_calls(), 1);
    assert_eq!(backend.publish_calls(), 1);
    assert_eq!(frontend.build_calls(), 1);
    assert_eq!(frontend.publish_calls(), 1);

    // DATABASE_URL on the backend, BACKEND_URL on the frontend
    assert_eq!(backend.env_calls(), 1);
    assert_eq!(frontend.env_calls(), 1);

    let summary = report.summarize();
    assert!(summary
        .public_urls
        .contains(&"https://railway.example.dev".to_string()));
    assert!(summary
        .public_urls
        .contains(&"https://vercel.example.dev".to_string()));
    assert!(summary.failed_steps.is_empty());
}

#[tokio::test]
async fn test_set_env_receives_database_url() {
    let config = full_config();
    let plan = railway_vercel_plan(&config);

    let backend = Arc::new(MockAdapter::new("railway"));
    let frontend = Arc::new(MockAdapter::new("vercel"));
    let executor = StepExecutor::new(backend.clone(), frontend.clone());

    let report = executor.run(&plan, &config).await.unwrap();

    let set_env = report.result_for(STEP_SET_ENV).unwrap();
    assert_eq!(set_env.outcome, StepOutcome::Succeeded);
    assert_eq!(set_env.detail, "DATABASE_URL configured");
}

#[tokio::test]
async fn test_failed_step_skips_transitive_dependents() {
    let config = full_config();
    let plan = railway_vercel_plan(&config);

    let backend = Arc::new(
        MockAdapter::new("railway")
            .build_responses(vec![Err(AdapterError::command_failed("compile error"))]),
    );
    let frontend = Arc::new(MockAdapter::new("vercel"));
    let executor = StepExecutor::new(backend.clone(), frontend.clone());

    let report = executor.run(&plan, &config).await.unwrap();

    assert_eq!(
        report.result_for(STEP_PROVISION_DB).unwrap().outcome,
        StepOutcome::Succeeded
    );
    assert_eq!(
        report.result_for(STEP_SET_ENV).unwrap().outcome,
        StepOutcome::Succeeded
    );

    let build = report.result_for(STEP_BUILD_BACKEND).unwrap();
    assert_eq!(build.outcome, StepOutcome::Failed);
    assert!(build.detail.contains("compile error"));

    for skipped in [STEP_PUBLISH_BACKEND, STEP_BUILD_FRONTEND, STEP_PUBLISH_FRONTEND] {
        let result = report.result_for(skipped).unwrap();
        assert_eq!(result.outcome, StepOutcome::Skipped, "{}", skipped);
    }
    assert!(report
        .result_for(STEP_PUBLISH_BACKEND)
        .unwrap()
        .detail
        .contains("build-backend"));

    // Nothing downstream of the failure ever reached an adapter
    assert_eq!(backend.publish_calls(), 0);
    assert_eq!(frontend.build_calls(), 0);
    assert_eq!(frontend.publish_calls(), 0);

    assert_eq!(report.overall, Some(OverallOutcome::PartialFailure));
}

#[tokio::test]
async fn test_rerun_with_recovered_connection_info_succeeds() {
    let config = full_config();
    let plan = railway_vercel_plan(&config);

    // Adapters look up the existing connection string on a re-run, so the
    // second provision call also yields connection info.
    let backend = Arc::new(MockAdapter::new("railway").provision_responses(vec![
        Ok(MockAdapter::ok_connection()),
        Ok(MockAdapter::ok_connection()),
    ]));
    let frontend = Arc::new(MockAdapter::new("vercel"));
    let executor = StepExecutor::new(backend.clone(), frontend.clone());

    let first = executor.run(&plan, &config).await.unwrap();
    let second = executor.run(&plan, &config).await.unwrap();

    assert_eq!(first.overall, Some(OverallOutcome::Success));
    assert_eq!(second.overall, Some(OverallOutcome::Success));
    assert_eq!(backend.provision_calls(), 2);

    // DATABASE_URL lands on both runs
    for report in [&first, &second] {
        let set_env = report.result_for(STEP_SET_ENV).unwrap();
        assert_eq!(set_env.outcome, StepOutcome::Succeeded);
        assert_eq!(set_env.detail, "DATABASE_URL configured");
    }
    assert_eq!(backend.env_calls(), 2);
}

#[tokio::test]
async fn test_unrecovered_existing_database_fails_env_step() {
    let config = full_config();
    let plan = railway_vercel_plan(&config);

    // An adapter that reports AlreadyExists without connection info: the
    // provision step still counts as succeeded, but set-env must not
    // silently succeed with no DATABASE_URL to push.
    let backend = Arc::new(
        MockAdapter::new("railway")
            .provision_responses(vec![Err(AdapterError::already_exists("database exists"))]),
    );
    let frontend = Arc::new(MockAdapter::new("vercel"));
    let executor = StepExecutor::new(backend.clone(), frontend.clone());

    let report = executor.run(&plan, &config).await.unwrap();

    let provision = report.result_for(STEP_PROVISION_DB).unwrap();
    assert_eq!(provision.outcome, StepOutcome::Succeeded);
    assert!(provision.detail.starts_with("already provisioned"));

    let set_env = report.result_for(STEP_SET_ENV).unwrap();
    assert_eq!(set_env.outcome, StepOutcome::Failed);
    assert!(set_env.detail.contains("unavailable"));
    assert_eq!(backend.env_calls(), 0);

    for skipped in [STEP_BUILD_BACKEND, STEP_PUBLISH_BACKEND, STEP_BUILD_FRONTEND, STEP_PUBLISH_FRONTEND] {
        assert_eq!(
            report.result_for(skipped).unwrap().outcome,
            StepOutcome::Skipped,
            "{}",
            skipped
        );
    }
    assert_eq!(report.overall, Some(OverallOutcome::PartialFailure));
}

#[tokio::test]
async fn test_invalid_plan_never_reaches_adapters() {
    let config = full_config();
    let mut plan = railway_vercel_plan(&config);

    // Reorder so a dependency points forward
    let last = plan.steps.pop().unwrap();
    plan.steps.insert(0, last);

    let backend = Arc::new(MockAdapter::new("railway"));
    let frontend = Arc::new(MockAdapter::new("vercel"));
    let executor = StepExecutor::new(backend.clone(), frontend.clone());

    let err = executor.run(&plan, &config).await.unwrap_err();
    assert!(matches!(err, ValidationError::ForwardDependency { .. }));

    assert_eq!(backend.provision_calls(), 0);
    assert_eq!(backend.build_calls(), 0);
}
