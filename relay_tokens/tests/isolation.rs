mod common;

use std::time::Duration;

use common::*;
use relay_tokens::{
    execute_isolated, execution::IsolatedExecution, run_cycle, CredentialKind, ExecutionReport,
    RefreshError, RefreshOutcome, RefreshScheduler,
};

#[tokio::test]
async fn panicking_refresh_is_contained() {
    let h = Harness::new(both_enabled(), RecordingIssuer::panicking_on_ticket());
    h.store.seed("wc:pat:app1", "T1", 7200).await;

    let report = execute_isolated(h.services.clone(), CredentialKind::DependentTicket).await;
    assert!(matches!(report, ExecutionReport::Panicked));

    let report = execute_isolated(h.services.clone(), CredentialKind::PrimaryAccessToken).await;
    assert!(matches!(
        report,
        ExecutionReport::Completed(RefreshOutcome::Refreshed { .. })
    ));
}

#[tokio::test]
async fn failures_are_reported_not_raised() {
    let h = Harness::new(
        both_enabled(),
        RecordingIssuer::new().then_reject(40001, "invalid credential"),
    );

    let report = execute_isolated(h.services.clone(), CredentialKind::PrimaryAccessToken).await;

    assert!(!report.is_success());
    assert!(matches!(
        report,
        ExecutionReport::Failed(RefreshError::IssuerRejected { code: 40001, .. })
    ));
}

#[tokio::test]
async fn one_kind_panicking_does_not_block_the_cycle() {
    let h = Harness::new(both_enabled(), RecordingIssuer::panicking_on_ticket());
    h.store.seed("wc:pat:app1", "T1", 7200).await;

    let reports = run_cycle(&h.services).await;

    assert_eq!(reports.len(), 3);
    for (kind, report) in reports {
        match kind {
            CredentialKind::PrimaryAccessToken => assert!(matches!(
                report,
                ExecutionReport::Completed(RefreshOutcome::Refreshed { .. })
            )),
            CredentialKind::SecondaryAccessToken => assert!(matches!(
                report,
                ExecutionReport::Completed(RefreshOutcome::Fresh { .. })
            )),
            CredentialKind::DependentTicket => {
                assert!(matches!(report, ExecutionReport::Panicked))
            }
        }
    }
    assert!(h.store.entry("wc:at:app0").await.is_some());
}

#[tokio::test]
async fn second_cycle_catches_up_on_deferred_ticket() {
    let h = Harness::new(both_enabled(), RecordingIssuer::new());

    run_cycle(&h.services).await;
    run_cycle(&h.services).await;

    assert!(h.store.entry("wc:at:app0").await.is_some());
    assert!(h.store.entry("wc:pat:app1").await.is_some());
    assert!(h.store.entry("wc:jt:app1").await.is_some());
    assert_eq!(h.issuer.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn scheduler_keeps_every_kind_refreshed() {
    let h = Harness::new(both_enabled(), RecordingIssuer::new());

    let handle = RefreshScheduler::new(Duration::from_secs(60)).spawn(h.services.clone());
    assert_eq!(handle.task_count(), 3);

    tokio::time::sleep(Duration::from_secs(150)).await;

    assert!(h.store.entry("wc:at:app0").await.is_some());
    assert!(h.store.entry("wc:pat:app1").await.is_some());
    assert!(h.store.entry("wc:jt:app1").await.is_some());

    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn scheduler_can_be_restricted_to_some_kinds() {
    let h = Harness::new(both_enabled(), RecordingIssuer::new());

    let handle = RefreshScheduler::new(Duration::from_secs(60))
        .only([CredentialKind::PrimaryAccessToken])
        .spawn(h.services.clone());
    assert_eq!(handle.task_count(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    handle.shutdown();

    assert!(h.store.entry("wc:at:app0").await.is_some());
    assert!(h.store.entry("wc:pat:app1").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn kinds_named_twice_get_one_task() {
    let h = Harness::new(both_enabled(), RecordingIssuer::new());

    let handle = RefreshScheduler::new(Duration::from_secs(60))
        .only([
            CredentialKind::PrimaryAccessToken,
            CredentialKind::SecondaryAccessToken,
            CredentialKind::PrimaryAccessToken,
        ])
        .spawn(h.services.clone());

    assert_eq!(handle.task_count(), 2);
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn dropped_execution_never_writes() {
    let h = Harness::new(
        both_enabled(),
        RecordingIssuer::slow(Duration::from_secs(60)),
    );

    let execution =
        IsolatedExecution::spawn(h.services.clone(), CredentialKind::PrimaryAccessToken);
    tokio::time::sleep(Duration::from_secs(10)).await;
    drop(execution);

    tokio::time::sleep(Duration::from_secs(120)).await;

    assert!(h.issuer.calls().is_empty());
    assert!(h.store.entry("wc:at:app0").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_executions_in_flight() {
    let h = Harness::new(
        both_enabled(),
        RecordingIssuer::slow(Duration::from_secs(60)),
    );

    let handle = RefreshScheduler::new(Duration::from_secs(300))
        .only([
            CredentialKind::PrimaryAccessToken,
            CredentialKind::SecondaryAccessToken,
        ])
        .spawn(h.services.clone());
    tokio::time::sleep(Duration::from_secs(10)).await;
    handle.shutdown();

    tokio::time::sleep(Duration::from_secs(120)).await;

    assert!(h.issuer.calls().is_empty());
    assert_eq!(h.store.writes.load(std::sync::atomic::Ordering::SeqCst), 0);
}
