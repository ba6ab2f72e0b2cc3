//! Shift type bookkeeping

use attsync_common::db::ShiftType;
use attsync_common::Result;
use sqlx::{Row, SqlitePool};

pub async fn list_shift_types(pool: &SqlitePool) -> Result<Vec<ShiftType>> {
    let rows = sqlx::query("SELECT name, last_sync_of_checkin FROM shift_types ORDER BY name ASC")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| ShiftType {
            name: row.get("name"),
            last_sync_of_checkin: row.get("last_sync_of_checkin"),
        })
        .collect())
}

pub async fn ensure_shift_type(pool: &SqlitePool, name: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO shift_types (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Stamp every shift type with the time of the latest check-in sync
pub async fn set_last_sync_of_checkin(pool: &SqlitePool, at: &str) -> Result<u64> {
    let result = sqlx::query("UPDATE shift_types SET last_sync_of_checkin = ?")
        .bind(at)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
