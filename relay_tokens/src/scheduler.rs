//! A periodic driver for refresh executions

use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    execution::{execute_isolated, ExecutionReport},
    jitter::{JitterSource, NullJitter},
    CredentialKind, RelayServices,
};

/// The shortest cadence the scheduler will run at
pub const MIN_CADENCE: Duration = Duration::from_secs(1);

/// Runs every credential kind's refresh policy on a fixed cadence
///
/// Each kind gets its own task and each execution is isolated, so a kind
/// whose refreshes keep failing or panicking does not hold up the others.
///
/// Credentials are only refreshed once their remaining lifetime drops to the
/// staleness threshold, so the cadence should be comfortably shorter than the
/// shortest issued lifetime minus that threshold.
#[derive(Debug)]
pub struct RefreshScheduler<J = NullJitter> {
    cadence: Duration,
    jitter: J,
    kinds: Vec<CredentialKind>,
}

impl RefreshScheduler<NullJitter> {
    /// Constructs a scheduler running every kind each `cadence`
    ///
    /// Cadences shorter than [`MIN_CADENCE`] are raised to it.
    pub fn new(cadence: Duration) -> Self {
        Self {
            cadence: cadence.max(MIN_CADENCE),
            jitter: NullJitter,
            kinds: CredentialKind::ALL.to_vec(),
        }
    }
}

impl<J> RefreshScheduler<J> {
    /// Delays each task's first run according to `jitter`
    pub fn with_jitter<K>(self, jitter: K) -> RefreshScheduler<K> {
        RefreshScheduler {
            cadence: self.cadence,
            jitter,
            kinds: self.kinds,
        }
    }

    /// Restricts the scheduler to the given kinds
    ///
    /// A kind named more than once still gets a single task.
    pub fn only(mut self, kinds: impl IntoIterator<Item = CredentialKind>) -> Self {
        self.kinds.clear();
        for kind in kinds {
            if !self.kinds.contains(&kind) {
                self.kinds.push(kind);
            }
        }
        self
    }

    /// The interval between executions of each kind
    #[inline]
    pub fn cadence(&self) -> Duration {
        self.cadence
    }
}

impl<J: JitterSource> RefreshScheduler<J> {
    /// Spawns one periodic task per kind
    ///
    /// Tasks run until the returned handle is shut down or dropped.
    pub fn spawn(mut self, services: RelayServices) -> SchedulerHandle {
        let tasks = self
            .kinds
            .iter()
            .map(|&kind| {
                let delay = self.jitter.initial_delay(self.cadence);
                tokio::spawn(refresh_forever(
                    services.clone(),
                    kind,
                    self.cadence,
                    delay,
                ))
            })
            .collect();

        tracing::info!(
            cadence_ms = u64::try_from(self.cadence.as_millis()).unwrap_or(u64::MAX),
            kinds = self.kinds.len(),
            "credential refresh scheduler started"
        );

        SchedulerHandle { tasks }
    }
}

async fn refresh_forever(
    services: RelayServices,
    kind: CredentialKind,
    cadence: Duration,
    initial_delay: Duration,
) {
    if !initial_delay.is_zero() {
        tracing::trace!(
            %kind,
            delay_ms = u64::try_from(initial_delay.as_millis()).unwrap_or(u64::MAX),
            "delaying first refresh"
        );
        time::sleep(initial_delay).await;
    }

    let mut interval = time::interval(cadence);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match execute_isolated(services.clone(), kind).await {
            ExecutionReport::Completed(outcome) => {
                tracing::trace!(%kind, ?outcome, "scheduled refresh completed");
            }
            report => {
                tracing::trace!(%kind, ?report, "scheduled refresh did not complete");
            }
        }
    }
}

/// Controls the tasks started by [`RefreshScheduler::spawn()`]
///
/// Dropping the handle stops every task, along with any refresh execution
/// that task was waiting on.
#[derive(Debug)]
pub struct SchedulerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// The number of periodic tasks running
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Stops every periodic task
    pub fn shutdown(self) {
        drop(self)
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
