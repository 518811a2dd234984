use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vigil_core::testutil::MockSessionFactory;
use vigil_core::{
    OutcomeStatus, RunReport, Runner, SessionMode, SuiteConfig, TracingRunReporter, WaitPolicy,
    build_suite,
};

use crate::common::{docs_site, run_config};

fn full_suite() -> Vec<vigil_core::Scenario> {
    build_suite(&SuiteConfig::default(), &[]).unwrap()
}

fn check_keys(report: &RunReport) -> HashSet<(String, String, String, String)> {
    report
        .outcomes
        .iter()
        .map(|o| {
            (
                o.group.clone(),
                o.scenario.clone(),
                o.target.clone(),
                o.check.clone(),
            )
        })
        .collect()
}

#[tokio::test]
async fn every_check_yields_an_outcome() {
    let scenarios = full_suite();
    let runner = Runner::new(MockSessionFactory::new(docs_site()), run_config());

    let report = runner
        .run(&scenarios, CancellationToken::new(), &TracingRunReporter)
        .await;

    let keys = check_keys(&report);
    for scenario in &scenarios {
        for check in scenario.checks() {
            let key = (
                scenario.group.clone(),
                scenario.name.clone(),
                scenario.target.label(),
                check.label.clone(),
            );
            assert!(keys.contains(&key), "no outcome for {key:?}");
        }
    }
    assert!(!report.cancelled);
    assert_eq!(report.summary().incomplete, 0);
}

#[tokio::test]
async fn shared_session_matches_isolated_sessions() {
    let scenarios = full_suite();

    let isolated = Runner::new(MockSessionFactory::new(docs_site()), run_config())
        .run(&scenarios, CancellationToken::new(), &TracingRunReporter)
        .await;

    let factory = MockSessionFactory::new(docs_site());
    let opened = factory.opened.clone();
    let shared = Runner::new(
        factory,
        run_config().with_session_mode(SessionMode::Shared),
    )
    .run(&scenarios, CancellationToken::new(), &TracingRunReporter)
    .await;

    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(isolated.summary(), shared.summary());
}

#[tokio::test]
async fn cancelled_before_start_marks_everything_incomplete() {
    let scenarios = full_suite();
    let expected: usize = scenarios.iter().map(|s| s.checks().count()).sum();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = Runner::new(MockSessionFactory::new(docs_site()), run_config())
        .run(&scenarios, cancel, &TracingRunReporter)
        .await;

    assert!(report.cancelled);
    assert_eq!(report.summary().incomplete, expected);
    assert_eq!(report.summary().total, expected);
    assert!(!report.is_success());
}

#[tokio::test]
async fn cancellation_mid_run_keeps_collected_outcomes() {
    let scenarios = full_suite();
    let cancel = CancellationToken::new();
    let runner = Runner::new(
        MockSessionFactory::new(docs_site()).hanging(),
        run_config()
            .with_wait(WaitPolicy::new(Duration::from_secs(30)))
            .with_concurrency(2)
            .unwrap(),
    );

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    let report = runner.run(&scenarios, cancel, &TracingRunReporter).await;

    assert!(report.cancelled);
    let summary = report.summary();
    assert!(summary.incomplete > 0);
    assert_eq!(summary.passed + summary.failed + summary.skipped + summary.incomplete, summary.total);
    assert!(
        report
            .outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Incomplete)
            .all(|o| o.message.contains("cancelled"))
    );
}

#[tokio::test]
async fn report_serializes_lowercase_statuses() {
    let scenarios: Vec<_> = full_suite()
        .into_iter()
        .filter(|s| s.name == "missing page")
        .collect();
    let report = Runner::new(MockSessionFactory::new(docs_site()), run_config())
        .run(&scenarios, CancellationToken::new(), &TracingRunReporter)
        .await;

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outcomes"][0]["status"], "passed");
    assert_eq!(json["cancelled"], false);
}
