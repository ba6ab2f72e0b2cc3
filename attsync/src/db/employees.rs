//! Employee directory queries

use attsync_common::db::Employee;
use attsync_common::{Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

fn employee_from_row(row: &SqliteRow) -> Employee {
    Employee {
        name: row.get("name"),
        employee_name: row.get("employee_name"),
        attendance_device_id: row.get("attendance_device_id"),
    }
}

/// Look up the employee whose attendance_device_id matches a badge
pub async fn find_by_device_id(pool: &SqlitePool, device_id: &str) -> Result<Option<Employee>> {
    let row = sqlx::query(
        "SELECT name, employee_name, attendance_device_id FROM employees WHERE attendance_device_id = ?",
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(employee_from_row))
}

pub async fn get_employee(pool: &SqlitePool, name: &str) -> Result<Option<Employee>> {
    let row = sqlx::query(
        "SELECT name, employee_name, attendance_device_id FROM employees WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(employee_from_row))
}

pub async fn list_employees(pool: &SqlitePool) -> Result<Vec<Employee>> {
    let rows = sqlx::query(
        "SELECT name, employee_name, attendance_device_id FROM employees ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(employee_from_row).collect())
}

/// Insert or update an employee
///
/// A badge may belong to only one employee.
pub async fn upsert_employee(pool: &SqlitePool, employee: &Employee) -> Result<()> {
    if employee.name.trim().is_empty() {
        return Err(Error::InvalidInput("Employee name is required".to_string()));
    }

    let device_id = employee
        .attendance_device_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if let Some(device_id) = device_id {
        if let Some(holder) = find_by_device_id(pool, device_id).await? {
            if holder.name != employee.name {
                return Err(Error::InvalidInput(format!(
                    "Attendance device ID {} is already assigned to {}",
                    device_id, holder.name
                )));
            }
        }
    }

    sqlx::query(
        r#"
        INSERT INTO employees (name, employee_name, attendance_device_id)
        VALUES (?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            employee_name = excluded.employee_name,
            attendance_device_id = excluded.attendance_device_id,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&employee.name)
    .bind(&employee.employee_name)
    .bind(device_id)
    .execute(pool)
    .await?;

    Ok(())
}
