//! Host system collaborators
//!
//! The sync core only needs to look employees up by badge and to read and
//! write check-ins. `SqliteHost` backs both with the service database.

use async_trait::async_trait;
use attsync_common::db::{Employee, EmployeeCheckin};
use attsync_common::time::format_checkin_time;
use attsync_common::Result;
use chrono::NaiveDateTime;
use sqlx::SqlitePool;

use crate::db;
pub use crate::db::checkins::{LogType, NewCheckin};

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Employee whose attendance device ID equals the badge identifier
    async fn find_by_device_id(&self, device_id: &str) -> Result<Option<Employee>>;
}

#[async_trait]
pub trait CheckinStore: Send + Sync {
    /// `time` is in check-in storage format (`YYYY-MM-DD HH:MM:SS`)
    async fn checkin_exists(&self, employee: &str, time: &str) -> Result<bool>;

    async fn add_checkin(&self, checkin: NewCheckin) -> Result<EmployeeCheckin>;

    /// Stamp `last_sync_of_checkin` on every shift type; returns how many
    async fn mark_shift_types_synced(&self, at: NaiveDateTime) -> Result<u64>;
}

/// Host collaborators backed by the service's SQLite database
#[derive(Clone)]
pub struct SqliteHost {
    pool: SqlitePool,
}

impl SqliteHost {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeDirectory for SqliteHost {
    async fn find_by_device_id(&self, device_id: &str) -> Result<Option<Employee>> {
        db::employees::find_by_device_id(&self.pool, device_id).await
    }
}

#[async_trait]
impl CheckinStore for SqliteHost {
    async fn checkin_exists(&self, employee: &str, time: &str) -> Result<bool> {
        db::checkins::checkin_exists(&self.pool, employee, time).await
    }

    async fn add_checkin(&self, checkin: NewCheckin) -> Result<EmployeeCheckin> {
        db::checkins::insert_checkin(&self.pool, &checkin).await
    }

    async fn mark_shift_types_synced(&self, at: NaiveDateTime) -> Result<u64> {
        db::shift_types::set_last_sync_of_checkin(&self.pool, &format_checkin_time(at)).await
    }
}
