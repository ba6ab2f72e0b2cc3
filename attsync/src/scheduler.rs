//! Periodic sync trigger
//!
//! Every interval, queue one scheduled run per configured device for the
//! current day. The first tick fires one full interval after start.

use attsync_common::{Result, TimeWindow};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::db::devices::list_devices;
use crate::db::runs::RunTrigger;
use crate::device::DeviceTarget;
use crate::jobs::JobQueue;
use crate::settings::SyncSettings;

pub fn spawn_scheduler(
    db: SqlitePool,
    jobs: JobQueue,
    settings: SyncSettings,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = settings.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = period.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match enqueue_scheduled_runs(&db, &jobs, &settings).await {
                        Ok(queued) => debug!(queued, "Scheduled sync tick"),
                        Err(e) => error!(error = %e, "Scheduled sync tick failed"),
                    }
                }
            }
        }
    })
}

/// Queue today's run for every configured device; returns how many were queued
pub async fn enqueue_scheduled_runs(
    db: &SqlitePool,
    jobs: &JobQueue,
    settings: &SyncSettings,
) -> Result<usize> {
    let devices = list_devices(db).await?;
    let window = TimeWindow::today(settings.utc_offset);
    let mut queued = 0;

    for device in &devices {
        match jobs
            .enqueue(DeviceTarget::from(device), Some(device.id), window, RunTrigger::Scheduled)
            .await
        {
            Ok(_) => queued += 1,
            Err(e) => error!(device = %device.name, error = %e, "Failed to queue scheduled sync"),
        }
    }

    Ok(queued)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::devices::{create_device, NewDevice};
    use crate::db::runs::list_runs;
    use attsync_common::db::init_database;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::RwLock;

    #[tokio::test]
    async fn test_one_scheduled_run_per_device() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("attsync.db")).await.unwrap();

        for (name, ip) in [("Front Door", "127.0.0.1:9"), ("Warehouse", "127.0.0.1:9")] {
            create_device(
                &pool,
                &NewDevice {
                    name: name.to_string(),
                    device_ip: ip.to_string(),
                    major: 5,
                    minor: 75,
                    device_user: "admin".to_string(),
                    device_user_password: "secret".to_string(),
                },
            )
            .await
            .unwrap();
        }

        let settings = SyncSettings {
            request_timeout: Duration::from_secs(1),
            ..SyncSettings::default()
        };
        let (queue, _worker) =
            JobQueue::start(pool.clone(), settings.clone(), Arc::new(RwLock::new(None)))
                .await
                .unwrap();

        let queued = enqueue_scheduled_runs(&pool, &queue, &settings).await.unwrap();
        assert_eq!(queued, 2);

        let runs = list_runs(&pool, 10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.trigger == RunTrigger::Scheduled));
        assert!(runs.iter().all(|r| r.device_id.is_some()));
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("attsync.db")).await.unwrap();
        let settings = SyncSettings::default();
        let (queue, _worker) =
            JobQueue::start(pool.clone(), settings.clone(), Arc::new(RwLock::new(None)))
                .await
                .unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn_scheduler(pool, queue, settings, shutdown.clone());
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
