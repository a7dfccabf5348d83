// ABOUTME: In-process deferred executor for scheduled sends and DMs
// ABOUTME: Holds jobs in memory and replays due actions through MachineClient on a fixed tick

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use machine_core::client::MachineClient;
use machine_core::scheduled::{DeferredExecutor, JobId, ScheduledJob};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;
use tokio::time::interval;

/// Pending jobs live only as long as the process.
#[derive(Default)]
pub struct TokioScheduler {
    jobs: Mutex<Vec<ScheduledJob>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, Vec<ScheduledJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove and return every job due at `now`, earliest first.
    /// A claimed job is never handed out twice.
    pub fn claim_due(&self, now: DateTime<Utc>) -> Vec<ScheduledJob> {
        let mut jobs = self.jobs();
        let (mut due, pending): (Vec<_>, Vec<_>) =
            jobs.drain(..).partition(|job| job.is_due(now));
        *jobs = pending;
        due.sort_by_key(|job| job.run_at);
        due
    }

    /// Snapshot of jobs not yet claimed
    pub fn pending(&self) -> Vec<ScheduledJob> {
        self.jobs().clone()
    }

    /// Drop a job before it runs. Returns false if it was unknown or already claimed.
    pub fn cancel(&self, id: &JobId) -> bool {
        let mut jobs = self.jobs();
        let before = jobs.len();
        jobs.retain(|job| &job.id != id);
        jobs.len() != before
    }
}

#[async_trait]
impl DeferredExecutor for TokioScheduler {
    async fn schedule(&self, job: ScheduledJob) -> Result<JobId> {
        let id = job.id.clone();
        self.jobs().push(job);
        Ok(id)
    }
}

/// Claim due jobs and execute them in order. Returns how many succeeded.
pub async fn run_due(scheduler: &TokioScheduler, client: &MachineClient, now: DateTime<Utc>) -> usize {
    let due = scheduler.claim_due(now);
    if !due.is_empty() {
        tracing::info!(count = due.len(), "Claimed due jobs for execution");
    }

    let mut succeeded = 0;
    for job in due {
        match client.execute(&job.action).await {
            Ok(receipt) => {
                succeeded += 1;
                tracing::info!(
                    job_id = %job.id,
                    action = job.action.kind(),
                    channel = %receipt.channel,
                    ts = ?receipt.ts,
                    "Scheduled action executed"
                );
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job.id,
                    action = job.action.kind(),
                    error = %e,
                    "Scheduled action failed"
                );
            }
        }
    }
    succeeded
}

/// Background loop: every `check_interval`, run whatever has come due
pub async fn start_scheduler(
    scheduler: Arc<TokioScheduler>,
    client: Arc<MachineClient>,
    check_interval: StdDuration,
) {
    tracing::info!(
        interval_secs = check_interval.as_secs(),
        "Starting scheduler background task"
    );

    let mut ticker = interval(check_interval);

    loop {
        ticker.tick().await;
        run_due(&scheduler, &client, Utc::now()).await;
    }
}
