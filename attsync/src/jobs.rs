//! Background sync job queue
//!
//! One worker drains the queue sequentially. Each job is persisted as a
//! `sync_runs` row before it is handed to the worker, so a run is visible
//! through the API from the moment it is queued. The queue itself lives in
//! memory: runs a previous process left unfinished are failed at startup.

use std::sync::Arc;

use attsync_common::{Error, Result, TimeWindow};
use sqlx::SqlitePool;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::runs::{self, RunCounts, RunState, RunTrigger, SyncRun};
use crate::device::DeviceTarget;
use crate::settings::SyncSettings;
use crate::sync::{sync_device, SqliteHost};

/// Jobs waiting beyond this many make `enqueue` wait for room
const QUEUE_CAPACITY: usize = 256;

pub const INTERRUPTED_RUN_ERROR: &str = "Interrupted by restart";

struct SyncJob {
    run_id: Uuid,
    target: DeviceTarget,
    window: TimeWindow,
}

/// Handle for queueing sync jobs
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<SyncJob>,
    db: SqlitePool,
}

impl JobQueue {
    /// Close out runs left over from a previous process, then spawn the
    /// worker. The worker exits once every `JobQueue` handle is dropped.
    pub async fn start(
        db: SqlitePool,
        settings: SyncSettings,
        last_error: Arc<RwLock<Option<String>>>,
    ) -> Result<(Self, JoinHandle<()>)> {
        let interrupted = runs::fail_interrupted_runs(&db, INTERRUPTED_RUN_ERROR).await?;
        if interrupted > 0 {
            warn!(runs = interrupted, "Marked unfinished runs from a previous start as failed");
        }

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let worker = Worker {
            db: db.clone(),
            host: SqliteHost::new(db.clone()),
            settings,
            last_error,
        };
        let handle = tokio::spawn(worker.run(rx));

        Ok((Self { tx, db }, handle))
    }

    /// Persist a queued run and hand it to the worker
    pub async fn enqueue(
        &self,
        target: DeviceTarget,
        device_id: Option<i64>,
        window: TimeWindow,
        trigger: RunTrigger,
    ) -> Result<SyncRun> {
        let run = runs::insert_run(&self.db, trigger, device_id, &target.device_ip, &window).await?;

        let job = SyncJob {
            run_id: run.run_id,
            target,
            window,
        };

        if self.tx.send(job).await.is_err() {
            let message = "Job worker is not running";
            runs::finish_run(&self.db, run.run_id, RunState::Failed, &RunCounts::default(), Some(message))
                .await?;
            return Err(Error::Internal(message.to_string()));
        }

        info!(
            run_id = %run.run_id,
            device = %run.device_ip,
            trigger = run.trigger.as_str(),
            "Sync job queued"
        );
        Ok(run)
    }
}

struct Worker {
    db: SqlitePool,
    host: SqliteHost,
    settings: SyncSettings,
    last_error: Arc<RwLock<Option<String>>>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<SyncJob>) {
        info!("Sync job worker started");

        while let Some(job) = rx.recv().await {
            let run_id = job.run_id;
            if let Err(e) = self.execute(job).await {
                error!(run_id = %run_id, error = %e, "Failed to record sync run");
            }
        }

        info!("Sync job worker stopped");
    }

    async fn execute(&self, job: SyncJob) -> Result<()> {
        runs::mark_running(&self.db, job.run_id).await?;
        info!(run_id = %job.run_id, device = %job.target.device_ip, "Sync run started");

        // sync_device stops paging at the job timeout and processes what it has
        let outcome = sync_device(&self.host, job.target, &job.window, &self.settings).await;

        let (state, counts, message) = match outcome {
            Ok(report) if report.timed_out => (
                RunState::TimedOut,
                report.counts(),
                Some(format!(
                    "Job exceeded timeout of {:?} after {} pages",
                    self.settings.job_timeout,
                    report.pages_fetched
                )),
            ),
            // A device error still completes the run with what was fetched
            Ok(report) => (RunState::Completed, report.counts(), report.device_error),
            Err(e) => (RunState::Failed, RunCounts::default(), Some(e.to_string())),
        };

        match state {
            RunState::Completed if message.is_none() => info!(
                run_id = %job.run_id,
                inserted = counts.inserted,
                duplicates = counts.duplicates,
                "Sync run completed"
            ),
            _ => {
                warn!(
                    run_id = %job.run_id,
                    state = state.as_str(),
                    error = message.as_deref().unwrap_or_default(),
                    "Sync run finished with errors"
                );
                if let Some(message) = &message {
                    *self.last_error.write().await = Some(message.clone());
                }
            }
        }

        runs::finish_run(&self.db, job.run_id, state, &counts, message.as_deref()).await
    }
}
