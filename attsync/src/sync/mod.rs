//! Device-to-host attendance synchronization
//!
//! Fetch a window of events from a device, then hand the records to the
//! log processor. Devices are synced one after another.

pub mod guard;
pub mod host;
pub mod processor;

pub use guard::{Admission, DuplicateGuard};
pub use host::{CheckinStore, EmployeeDirectory, SqliteHost};
pub use processor::{LogProcessor, ProcessSummary};

use attsync_common::TimeWindow;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::runs::RunCounts;
use crate::device::{DeviceClient, DeviceError, DeviceTarget};
use crate::settings::SyncSettings;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Store error: {0}")]
    Store(#[from] attsync_common::Error),
}

/// Outcome of syncing one device
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub device_ip: String,
    pub pages_fetched: u64,
    pub records_fetched: u64,
    pub total_matches: u64,
    pub summary: ProcessSummary,
    /// Set when the fetch stopped on a failed request
    pub device_error: Option<String>,
    /// The job deadline cut the fetch short; earlier pages were still processed
    pub timed_out: bool,
}

impl SyncReport {
    pub fn counts(&self) -> RunCounts {
        RunCounts {
            pages_fetched: self.pages_fetched,
            records_fetched: self.records_fetched,
            inserted: self.summary.inserted,
            duplicates: self.summary.duplicates,
            unmatched: self.summary.unmatched,
            skipped: self.summary.skipped(),
        }
    }
}

/// Fetch one device's events for the window and process them
///
/// Paging stops at `settings.job_timeout`. A partial fetch, whether cut by a
/// failed page or by the deadline, is still processed. Nothing is written
/// when the device returned no records.
pub async fn sync_device<H>(
    host: &H,
    target: DeviceTarget,
    window: &TimeWindow,
    settings: &SyncSettings,
) -> Result<SyncReport, SyncError>
where
    H: EmployeeDirectory + CheckinStore + ?Sized,
{
    let device_ip = target.device_ip.clone();
    info!(
        device = %device_ip,
        start = %window.device_start(settings.utc_offset),
        end = %window.device_end(settings.utc_offset),
        "Syncing device"
    );

    let deadline = tokio::time::Instant::now() + settings.job_timeout;
    let mut client = DeviceClient::new(target, settings.page_size, settings.request_timeout)?
        .with_deadline(deadline);
    let fetch = client.fetch_all_events(window, settings.utc_offset).await;

    let mut report = SyncReport {
        device_ip,
        pages_fetched: fetch.pages_fetched,
        records_fetched: fetch.records.len() as u64,
        total_matches: fetch.total_matches,
        device_error: fetch.error.as_ref().map(ToString::to_string),
        timed_out: matches!(fetch.error, Some(DeviceError::DeadlineExceeded(_))),
        ..SyncReport::default()
    };

    if fetch.records.is_empty() {
        warn!(device = %report.device_ip, "No records fetched from device");
        return Ok(report);
    }

    report.summary = LogProcessor::new(host).process(&fetch.records).await?;
    Ok(report)
}

/// Sync each device in turn; a failing device does not stop the rest
pub async fn sync_all_devices<H>(
    host: &H,
    targets: Vec<DeviceTarget>,
    window: &TimeWindow,
    settings: &SyncSettings,
) -> Vec<Result<SyncReport, SyncError>>
where
    H: EmployeeDirectory + CheckinStore + ?Sized,
{
    let mut results = Vec::with_capacity(targets.len());

    for target in targets {
        let device_ip = target.device_ip.clone();
        let result = sync_device(host, target, window, settings).await;
        if let Err(e) = &result {
            error!(device = %device_ip, error = %e, "Device sync failed");
        }
        results.push(result);
    }

    results
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory host for exercising the sync core without a database

    use super::host::{CheckinStore, EmployeeDirectory, NewCheckin};
    use async_trait::async_trait;
    use attsync_common::db::{Employee, EmployeeCheckin};
    use attsync_common::time::format_checkin_time;
    use attsync_common::{Error, Result};
    use chrono::NaiveDateTime;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeHost {
        employees: Vec<Employee>,
        stored: Mutex<Vec<(String, String)>>,
        inserted: Mutex<Vec<NewCheckin>>,
        marks: Mutex<u64>,
    }

    impl FakeHost {
        /// `(name, employee_name, badge)` triples
        pub fn with_employees(employees: &[(&str, &str, &str)]) -> Self {
            Self {
                employees: employees
                    .iter()
                    .map(|(name, employee_name, badge)| Employee {
                        name: name.to_string(),
                        employee_name: employee_name.to_string(),
                        attendance_device_id: Some(badge.to_string()),
                    })
                    .collect(),
                ..Self::default()
            }
        }

        pub fn seed_checkin(&self, employee: &str, time: &str) {
            self.stored
                .lock()
                .unwrap()
                .push((employee.to_string(), time.to_string()));
        }

        pub fn checkins(&self) -> Vec<NewCheckin> {
            self.inserted.lock().unwrap().clone()
        }

        pub fn shift_marks(&self) -> u64 {
            *self.marks.lock().unwrap()
        }
    }

    #[async_trait]
    impl EmployeeDirectory for FakeHost {
        async fn find_by_device_id(&self, device_id: &str) -> Result<Option<Employee>> {
            Ok(self
                .employees
                .iter()
                .find(|e| e.attendance_device_id.as_deref() == Some(device_id))
                .cloned())
        }
    }

    #[async_trait]
    impl CheckinStore for FakeHost {
        async fn checkin_exists(&self, employee: &str, time: &str) -> Result<bool> {
            Ok(self
                .stored
                .lock()
                .unwrap()
                .iter()
                .any(|(e, t)| e == employee && t == time))
        }

        async fn add_checkin(&self, checkin: NewCheckin) -> Result<EmployeeCheckin> {
            let time = format_checkin_time(checkin.time);
            if self.checkin_exists(&checkin.employee, &time).await? {
                return Err(Error::InvalidInput("duplicate check-in".to_string()));
            }
            self.seed_checkin(&checkin.employee, &time);

            let stored = EmployeeCheckin {
                name: format!("CHK-{}", self.inserted.lock().unwrap().len() + 1),
                employee: checkin.employee.clone(),
                employee_name: checkin.employee_name.clone(),
                time,
                device_id: Some(checkin.device_id.clone()),
                log_type: checkin.log_type.map(|t| t.as_str().to_string()),
                skip_auto_attendance: false,
            };
            self.inserted.lock().unwrap().push(checkin);
            Ok(stored)
        }

        async fn mark_shift_types_synced(&self, _at: NaiveDateTime) -> Result<u64> {
            *self.marks.lock().unwrap() += 1;
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeHost;
    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn unreachable_target() -> DeviceTarget {
        DeviceTarget {
            device_ip: "127.0.0.1:9".to_string(),
            major: 5,
            minor: 75,
            device_user: "admin".to_string(),
            device_user_password: "secret".to_string(),
        }
    }

    fn quick_settings() -> SyncSettings {
        SyncSettings {
            request_timeout: Duration::from_secs(2),
            ..SyncSettings::default()
        }
    }

    #[test]
    fn test_report_counts() {
        let report = SyncReport {
            pages_fetched: 2,
            records_fetched: 40,
            summary: ProcessSummary {
                received: 40,
                without_badge: 3,
                unmatched: 4,
                missing_time: 1,
                invalid_time: 1,
                duplicates: 6,
                inserted: 25,
                shift_types_marked: 2,
            },
            ..SyncReport::default()
        };

        let counts = report.counts();
        assert_eq!(counts.pages_fetched, 2);
        assert_eq!(counts.records_fetched, 40);
        assert_eq!(counts.inserted, 25);
        assert_eq!(counts.duplicates, 6);
        assert_eq!(counts.unmatched, 4);
        assert_eq!(counts.skipped, 5);
    }

    #[tokio::test]
    async fn test_unreachable_device_writes_nothing() {
        let host = FakeHost::with_employees(&[("EMP-001", "Ayesha Rahman", "1001")]);
        let window = TimeWindow::for_day(NaiveDate::from_ymd_opt(2025, 1, 7).unwrap());

        let report = sync_device(&host, unreachable_target(), &window, &quick_settings())
            .await
            .unwrap();

        assert_eq!(report.records_fetched, 0);
        assert!(report.device_error.is_some());
        assert!(host.checkins().is_empty());
        assert_eq!(host.shift_marks(), 0);
    }

    #[tokio::test]
    async fn test_sync_all_continues_past_failures() {
        let host = FakeHost::default();
        let window = TimeWindow::for_day(NaiveDate::from_ymd_opt(2025, 1, 7).unwrap());
        let targets = vec![unreachable_target(), unreachable_target()];

        let results = sync_all_devices(&host, targets, &window, &quick_settings()).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));
    }
}
