//! Employee check-in persistence

use attsync_common::db::EmployeeCheckin;
use attsync_common::time::format_checkin_time;
use attsync_common::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

/// Direction of a check-in, when the device reports one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogType {
    In,
    Out,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::In => "IN",
            LogType::Out => "OUT",
        }
    }

    /// Map a device `attendanceStatus` value
    pub fn from_attendance_status(status: &str) -> Option<Self> {
        match status {
            "checkIn" => Some(LogType::In),
            "checkOut" => Some(LogType::Out),
            _ => None,
        }
    }
}

/// A check-in about to be written
#[derive(Debug, Clone, PartialEq)]
pub struct NewCheckin {
    pub employee: String,
    pub employee_name: String,
    pub time: NaiveDateTime,
    /// Badge identifier the device reported
    pub device_id: String,
    pub log_type: Option<LogType>,
}

/// Filters for listing check-ins; `from`/`to` are inclusive storage-format times
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckinFilter {
    pub employee: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

fn checkin_from_row(row: &SqliteRow) -> EmployeeCheckin {
    EmployeeCheckin {
        name: row.get("name"),
        employee: row.get("employee"),
        employee_name: row.get("employee_name"),
        time: row.get("time"),
        device_id: row.get("device_id"),
        log_type: row.get("log_type"),
        skip_auto_attendance: row.get::<i64, _>("skip_auto_attendance") != 0,
    }
}

/// Whether a check-in already exists for this employee at this exact time
pub async fn checkin_exists(pool: &SqlitePool, employee: &str, time: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM employee_checkins WHERE employee = ? AND time = ?)",
    )
    .bind(employee)
    .bind(time)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Insert a check-in
///
/// Rejects unknown employees and an existing entry at the same time.
pub async fn insert_checkin(pool: &SqlitePool, checkin: &NewCheckin) -> Result<EmployeeCheckin> {
    let time = format_checkin_time(checkin.time);

    if crate::db::employees::get_employee(pool, &checkin.employee)
        .await?
        .is_none()
    {
        return Err(Error::NotFound(format!("Employee {}", checkin.employee)));
    }

    if checkin_exists(pool, &checkin.employee, &time).await? {
        return Err(Error::InvalidInput(format!(
            "Employee {} already has a log at {}",
            checkin.employee, time
        )));
    }

    let name = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO employee_checkins (name, employee, employee_name, time, device_id, log_type)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&name)
    .bind(&checkin.employee)
    .bind(&checkin.employee_name)
    .bind(&time)
    .bind(&checkin.device_id)
    .bind(checkin.log_type.map(|t| t.as_str()))
    .execute(pool)
    .await?;

    Ok(EmployeeCheckin {
        name,
        employee: checkin.employee.clone(),
        employee_name: checkin.employee_name.clone(),
        time,
        device_id: Some(checkin.device_id.clone()),
        log_type: checkin.log_type.map(|t| t.as_str().to_string()),
        skip_auto_attendance: false,
    })
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &CheckinFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(employee) = &filter.employee {
        builder.push(" AND employee = ").push_bind(employee.clone());
    }
    if let Some(from) = &filter.from {
        builder.push(" AND time >= ").push_bind(from.clone());
    }
    if let Some(to) = &filter.to {
        builder.push(" AND time <= ").push_bind(to.clone());
    }
}

pub async fn count_checkins(pool: &SqlitePool, filter: &CheckinFilter) -> Result<i64> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM employee_checkins");
    push_filter(&mut builder, filter);

    let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

/// Check-ins ordered by time, newest first
pub async fn list_checkins(
    pool: &SqlitePool,
    filter: &CheckinFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<EmployeeCheckin>> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT name, employee, employee_name, time, device_id, log_type, skip_auto_attendance FROM employee_checkins",
    );
    push_filter(&mut builder, filter);
    builder
        .push(" ORDER BY time DESC, employee ASC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = builder.build().fetch_all(pool).await?;
    Ok(rows.iter().map(checkin_from_row).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_type_from_attendance_status() {
        assert_eq!(LogType::from_attendance_status("checkIn"), Some(LogType::In));
        assert_eq!(LogType::from_attendance_status("checkOut"), Some(LogType::Out));
        assert_eq!(LogType::from_attendance_status("breakOut"), None);
        assert_eq!(LogType::from_attendance_status("undefined"), None);
    }
}
