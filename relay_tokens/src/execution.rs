//! Running refresh executions so that one failing kind cannot affect another

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::{CredentialKind, RefreshError, RefreshOutcome, RefreshPolicy, RelayServices};

/// What became of one isolated refresh execution
#[derive(Debug)]
pub enum ExecutionReport {
    /// The policy ran to completion
    Completed(RefreshOutcome),
    /// The policy stopped early on an error, which has already been logged
    Failed(RefreshError),
    /// The policy panicked; the panic was contained
    Panicked,
    /// The execution was cancelled before it finished
    Cancelled,
}

impl ExecutionReport {
    /// Whether the execution ended without error or panic
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// A refresh execution running on its own task
///
/// Dropping it before [`report()`][Self::report()] completes aborts the task.
#[derive(Debug)]
pub struct IsolatedExecution {
    kind: CredentialKind,
    join: JoinHandle<Result<RefreshOutcome, RefreshError>>,
}

impl IsolatedExecution {
    /// Starts refreshing `kind` on a task of its own
    pub fn spawn(services: RelayServices, kind: CredentialKind) -> Self {
        let policy = RefreshPolicy::new(services, kind);
        let join = tokio::spawn(async move { policy.run().await }.in_current_span());
        Self { kind, join }
    }

    /// The kind being refreshed
    #[inline]
    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    /// Waits for the execution to end
    pub async fn report(mut self) -> ExecutionReport {
        let kind = self.kind;
        match (&mut self.join).await {
            Ok(Ok(outcome)) => ExecutionReport::Completed(outcome),
            Ok(Err(error)) => ExecutionReport::Failed(error),
            Err(err) if err.is_panic() => {
                tracing::error!(%kind, "credential refresh panicked!");
                ExecutionReport::Panicked
            }
            Err(_) => {
                tracing::info!(%kind, "credential refresh was cancelled");
                ExecutionReport::Cancelled
            }
        }
    }
}

impl Drop for IsolatedExecution {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// Refreshes `kind` in isolation and waits for the result
///
/// Nothing that happens inside the execution, panics included, escapes as
/// anything other than the returned report.
pub async fn execute_isolated(services: RelayServices, kind: CredentialKind) -> ExecutionReport {
    IsolatedExecution::spawn(services, kind).report().await
}

/// Refreshes every kind concurrently, each in isolation
///
/// Kinds are not ordered against each other. A ticket whose access token is
/// refreshed in the same cycle may see the old token or none at all and be
/// deferred to the next cycle.
pub async fn run_cycle(services: &RelayServices) -> Vec<(CredentialKind, ExecutionReport)> {
    let executions: Vec<_> = CredentialKind::ALL
        .iter()
        .map(|&kind| IsolatedExecution::spawn(services.clone(), kind))
        .collect();

    let mut reports = Vec::with_capacity(executions.len());
    for execution in executions {
        let kind = execution.kind();
        reports.push((kind, execution.report().await));
    }
    reports
}
