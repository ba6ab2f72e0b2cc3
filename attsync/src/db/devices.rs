//! Device Configuration records

use attsync_common::db::Device;
use attsync_common::{Error, Result};
use serde::Deserialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

/// Fields accepted when creating a device
#[derive(Debug, Clone, Deserialize)]
pub struct NewDevice {
    pub name: String,
    pub device_ip: String,
    pub major: i64,
    pub minor: i64,
    pub device_user: String,
    pub device_user_password: String,
}

fn device_from_row(row: &SqliteRow) -> Device {
    Device {
        id: row.get("id"),
        name: row.get("name"),
        device_ip: row.get("device_ip"),
        major: row.get("major"),
        minor: row.get("minor"),
        device_user: row.get("device_user"),
        device_user_password: row.get("device_user_password"),
    }
}

/// All configured devices, in creation order
pub async fn list_devices(pool: &SqlitePool) -> Result<Vec<Device>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, device_ip, major, minor, device_user, device_user_password
        FROM devices
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(device_from_row).collect())
}

pub async fn get_device(pool: &SqlitePool, id: i64) -> Result<Option<Device>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, device_ip, major, minor, device_user, device_user_password
        FROM devices
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(device_from_row))
}

pub async fn create_device(pool: &SqlitePool, device: &NewDevice) -> Result<Device> {
    if device.name.trim().is_empty() {
        return Err(Error::InvalidInput("Device name is required".to_string()));
    }
    if device.device_ip.trim().is_empty() {
        return Err(Error::InvalidInput("Device IP is required".to_string()));
    }

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM devices WHERE name = ?")
        .bind(&device.name)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(Error::InvalidInput(format!(
            "Device '{}' already exists",
            device.name
        )));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO devices (name, device_ip, major, minor, device_user, device_user_password)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(device.name.trim())
    .bind(device.device_ip.trim())
    .bind(device.major)
    .bind(device.minor)
    .bind(&device.device_user)
    .bind(&device.device_user_password)
    .execute(pool)
    .await?
    .last_insert_rowid();

    get_device(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Device {} vanished after insert", id)))
}

/// Returns false when no such device existed
pub async fn delete_device(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM devices WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
