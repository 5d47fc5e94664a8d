mod common;

use common::{Fault, InMemoryCloud, TestModule};
use retention_acceptance::periods::{self, all_cases};
use retention_acceptance::{
    CaseError, CasePhase, Driver, HarnessConfig, Orchestrator, SequenceIdProvider, VerifyError,
};
use retention_cloud::RetryPolicy;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn driver(module: &TestModule, cloud: Arc<InMemoryCloud>, config: HarnessConfig) -> Driver {
    let config = config
        .with_module_root(module.path())
        .with_retry_policy(RetryPolicy::no_retry());
    Driver::new(Orchestrator::new(
        config,
        cloud.clone(),
        cloud,
        Arc::new(SequenceIdProvider::new()),
    ))
}

/// The whole table passes and every environment is destroyed
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_table_passes() {
    let module = TestModule::new();
    let cloud = Arc::new(InMemoryCloud::new());
    let driver = driver(&module, cloud.clone(), HarnessConfig::default());

    let cases = all_cases();
    let report = driver.run(&cases).await;

    assert!(report.is_success(), "{}", report.summary());
    assert_eq!(report.cases.len(), cases.len());

    // Reports keep table order regardless of completion order
    let labels: Vec<_> = report.cases.iter().map(|c| c.case.period_label).collect();
    let expected: Vec<_> = cases.iter().map(|c| c.period_label).collect();
    assert_eq!(labels, expected);

    let names: HashSet<_> = report
        .cases
        .iter()
        .filter_map(|c| c.environment.clone())
        .collect();
    assert_eq!(names.len(), cases.len());
    assert!(names.iter().all(|n| n.starts_with("terratest-")));

    assert!(report.cases.iter().all(|c| c.final_phase == CasePhase::Destroyed));
    assert_eq!(cloud.live_buckets(), 0);
    assert_eq!(cloud.destroyed().len(), cases.len());
}

/// A wrong day count fails only its own case
#[tokio::test]
async fn test_failure_is_isolated() {
    let module = TestModule::new();
    let cloud = Arc::new(InMemoryCloud::new().with_fault("1-year", Fault::WrongDays(365)));
    let driver = driver(&module, cloud.clone(), HarnessConfig::default());

    let report = driver.run(&all_cases()).await;

    assert_eq!(report.summary().passed, 9);
    assert_eq!(report.summary().failed, 1);
    assert!(matches!(
        report.get("1-year").unwrap().error(),
        Some(CaseError::Verify(VerifyError::ExpirationMismatch {
            expected: 366,
            actual: 365
        }))
    ));
    assert!(report.get("18-months").unwrap().is_success());
    assert_eq!(cloud.live_buckets(), 0);
}

#[tokio::test]
async fn test_wrong_tag_fails_after_policy_passes() {
    let module = TestModule::new();
    let cloud = Arc::new(InMemoryCloud::new().with_fault("1-month", Fault::WrongTag("1-months")));
    let driver = driver(&module, cloud.clone(), HarnessConfig::default());

    let cases = periods::select(&["1-month".to_string()]).unwrap();
    let report = driver.run(&cases).await;

    match report.get("1-month").unwrap().error() {
        Some(CaseError::Verify(VerifyError::TagMismatch {
            expected, actual, ..
        })) => {
            assert_eq!(expected, "1-month");
            assert_eq!(actual, "1-months");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(cloud.live_buckets(), 0);
}

#[tokio::test]
async fn test_apply_failure_still_destroys() {
    let module = TestModule::new();
    let cloud = Arc::new(InMemoryCloud::new().with_fault("7-years", Fault::FailApply));
    let driver = driver(&module, cloud.clone(), HarnessConfig::default());

    let report = driver.run(&all_cases()).await;

    let failed = report.get("7-years").unwrap();
    assert!(matches!(failed.error(), Some(CaseError::Provision(_))));
    assert_eq!(failed.final_phase, CasePhase::Destroyed);
    assert!(failed.bucket.is_none());

    let name = failed.environment.clone().unwrap();
    assert!(cloud.destroyed().contains(&name));
    assert_eq!(report.summary().passed, 9);
}

/// A panicking case is reported as aborted, still destroyed, and the others complete
#[tokio::test]
async fn test_panicking_case_does_not_stop_the_run() {
    let module = TestModule::new();
    let cloud = Arc::new(InMemoryCloud::new().with_fault("90-days", Fault::Panic));
    let driver = driver(&module, cloud.clone(), HarnessConfig::default());

    let report = driver.run(&all_cases()).await;

    let aborted = report.get("90-days").unwrap();
    match aborted.error() {
        Some(CaseError::Aborted(reason)) => assert!(reason.contains("provider crashed")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(aborted.final_phase, CasePhase::Destroyed);
    let name = aborted.environment.clone().unwrap();
    assert!(cloud.destroyed().contains(&name));

    assert_eq!(report.summary().passed, 9);
    assert_eq!(report.cases.len(), 10);
    assert_eq!(cloud.destroyed().len(), 10);
}

/// The run deadline fails a stalled verification and still destroys it
#[tokio::test(start_paused = true)]
async fn test_run_deadline_during_verification() {
    let module = TestModule::new();
    let cloud = Arc::new(InMemoryCloud::new().with_fault("10-years", Fault::StallVerify));
    let driver = driver(
        &module,
        cloud.clone(),
        HarnessConfig::default().with_run_timeout(Duration::from_secs(1800)),
    );

    let report = driver.run(&all_cases()).await;

    let late = report.get("10-years").unwrap();
    assert!(matches!(
        late.error(),
        Some(CaseError::DeadlineExceeded(CasePhase::Verified))
    ));
    assert_eq!(late.final_phase, CasePhase::Destroyed);
    assert!(cloud.destroyed().contains(late.environment.as_ref().unwrap()));
    assert_eq!(report.summary().passed, 9);
    assert_eq!(cloud.live_buckets(), 0);
}

/// An apply still running at the deadline finishes, so destroy sees what it created
#[tokio::test(start_paused = true)]
async fn test_run_deadline_during_apply() {
    let module = TestModule::new();
    let cloud = Arc::new(
        InMemoryCloud::new().with_fault("7-years", Fault::SlowApply(Duration::from_secs(3600))),
    );
    let driver = driver(
        &module,
        cloud.clone(),
        HarnessConfig::default().with_run_timeout(Duration::from_secs(1800)),
    );

    let cases = periods::select(&["7-years".to_string()]).unwrap();
    let report = driver.run(&cases).await;

    let late = report.get("7-years").unwrap();
    assert!(matches!(
        late.error(),
        Some(CaseError::DeadlineExceeded(CasePhase::Verified))
    ));
    assert!(late.bucket.is_some());
    assert_eq!(cloud.applied(), cloud.destroyed());
    assert_eq!(cloud.live_buckets(), 0);
}

/// Dropping the run while a case is verifying still destroys its environment
#[tokio::test(start_paused = true)]
async fn test_cancelled_run_still_destroys() {
    let module = TestModule::new();
    let cloud = Arc::new(InMemoryCloud::new().with_fault("1-month", Fault::StallVerify));
    let driver = driver(&module, cloud.clone(), HarnessConfig::default());

    let cases = periods::select(&["1-month".to_string()]).unwrap();
    let run = tokio::time::timeout(Duration::from_secs(60), driver.run(&cases)).await;
    assert!(run.is_err());

    for _ in 0..50 {
        if !cloud.destroyed().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(cloud.applied(), vec!["terratest-000001"]);
    assert_eq!(cloud.destroyed(), vec!["terratest-000001"]);
    assert_eq!(cloud.live_buckets(), 0);
}

#[tokio::test]
async fn test_empty_selection() {
    let module = TestModule::new();
    let cloud = Arc::new(InMemoryCloud::new());
    let driver = driver(&module, cloud.clone(), HarnessConfig::default());

    let report = driver.run(&[]).await;

    assert!(report.is_success());
    assert!(cloud.applied().is_empty());
}
