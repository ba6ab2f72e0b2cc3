//! Device log processing
//!
//! Turns raw device events into employee check-ins: keep events with a badge,
//! resolve the employee, normalize the time, drop duplicates, persist.

use attsync_common::time::{format_checkin_time, normalize_event_time};
use attsync_common::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::guard::{Admission, DuplicateGuard};
use super::host::{CheckinStore, EmployeeDirectory, LogType, NewCheckin};
use crate::device::AcsEventRecord;

/// Per-batch outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub received: u64,
    pub without_badge: u64,
    pub unmatched: u64,
    pub missing_time: u64,
    pub invalid_time: u64,
    pub duplicates: u64,
    pub inserted: u64,
    pub shift_types_marked: u64,
}

impl ProcessSummary {
    /// Records dropped for lacking a usable badge or time
    pub fn skipped(&self) -> u64 {
        self.without_badge + self.missing_time + self.invalid_time
    }
}

pub struct LogProcessor<'a, H: EmployeeDirectory + CheckinStore + ?Sized> {
    host: &'a H,
}

impl<'a, H: EmployeeDirectory + CheckinStore + ?Sized> LogProcessor<'a, H> {
    pub fn new(host: &'a H) -> Self {
        Self { host }
    }

    /// Process one batch of device records, in device order
    pub async fn process(&self, records: &[AcsEventRecord]) -> Result<ProcessSummary> {
        let mut summary = ProcessSummary {
            received: records.len() as u64,
            ..ProcessSummary::default()
        };

        if records.is_empty() {
            warn!("Invalid data received from device: no records");
            return Ok(summary);
        }

        let mut guard = DuplicateGuard::new(self.host);

        for record in records {
            let Some(badge) = record.badge() else {
                summary.without_badge += 1;
                continue;
            };

            let Some(employee) = self.host.find_by_device_id(badge).await? else {
                info!(badge, "No employee found for device ID");
                summary.unmatched += 1;
                continue;
            };
            debug!(badge, employee = %employee.name, "Found employee");

            let raw_time = record.time.as_deref().map(str::trim).unwrap_or_default();
            if raw_time.is_empty() {
                summary.missing_time += 1;
                continue;
            }

            let time = match normalize_event_time(raw_time) {
                Ok(time) => time,
                Err(e) => {
                    warn!(badge, error = %e, "Skipping event with unparseable time");
                    summary.invalid_time += 1;
                    continue;
                }
            };
            let formatted = format_checkin_time(time);

            if guard.admit(&employee.name, &formatted).await? == Admission::Duplicate {
                info!(
                    employee = %employee.name,
                    time = %formatted,
                    "Duplicate check-in found, skipping log"
                );
                summary.duplicates += 1;
                continue;
            }

            let log_type = record
                .attendance_status
                .as_deref()
                .and_then(LogType::from_attendance_status);

            self.host
                .add_checkin(NewCheckin {
                    employee: employee.name.clone(),
                    employee_name: employee.employee_name.clone(),
                    time,
                    device_id: badge.to_string(),
                    log_type,
                })
                .await?;
            summary.inserted += 1;
        }

        summary.shift_types_marked = self
            .host
            .mark_shift_types_synced(Local::now().naive_local())
            .await?;

        info!(
            received = summary.received,
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            unmatched = summary.unmatched,
            skipped = summary.skipped(),
            "Processed device logs"
        );

        Ok(summary)
    }
}
