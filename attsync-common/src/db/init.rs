//! Database initialization
//!
//! Creates the database file on first run, applies connection pragmas, creates
//! all tables idempotently, then runs versioned migrations.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Default SQLite busy timeout, overridable through `database_busy_timeout_ms`
const DEFAULT_BUSY_TIMEOUT_MS: i64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // Scheduled and manual runs write concurrently with API reads
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query(&format!("PRAGMA busy_timeout = {}", DEFAULT_BUSY_TIMEOUT_MS))
        .execute(&pool)
        .await?;

    create_schema_version_table(&pool).await?;
    create_settings_table(&pool).await?;
    create_devices_table(&pool).await?;
    create_employees_table(&pool).await?;
    create_employee_checkins_table(&pool).await?;
    create_shift_types_table(&pool).await?;
    create_sync_runs_table(&pool).await?;

    // Must run after CREATE TABLE IF NOT EXISTS
    crate::db::migrations::run_migrations(&pool).await?;

    init_default_settings(&pool).await?;

    let timeout_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'database_busy_timeout_ms'",
    )
    .fetch_optional(&pool)
    .await?
    .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);

    sqlx::query(&format!("PRAGMA busy_timeout = {}", timeout_ms))
        .execute(&pool)
        .await?;

    info!("Database busy timeout set to {} ms", timeout_ms);

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Device Configuration records polled by the scheduler
async fn create_devices_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS devices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            device_ip TEXT NOT NULL,
            major INTEGER NOT NULL,
            minor INTEGER NOT NULL,
            device_user TEXT NOT NULL,
            device_user_password TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_employees_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employees (
            name TEXT PRIMARY KEY,
            employee_name TEXT NOT NULL,
            attendance_device_id TEXT UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_employee_checkins_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employee_checkins (
            name TEXT PRIMARY KEY,
            employee TEXT NOT NULL REFERENCES employees(name) ON DELETE CASCADE,
            employee_name TEXT NOT NULL,
            time TEXT NOT NULL,
            device_id TEXT,
            log_type TEXT,
            skip_auto_attendance INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_shift_types_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS shift_types (
            name TEXT PRIMARY KEY,
            last_sync_of_checkin TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row per queued fetch-and-process run
async fn create_sync_runs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sync_runs (
            run_id TEXT PRIMARY KEY,
            trigger TEXT NOT NULL,
            device_id INTEGER REFERENCES devices(id) ON DELETE SET NULL,
            device_ip TEXT NOT NULL,
            window_start TEXT NOT NULL,
            window_end TEXT NOT NULL,
            state TEXT NOT NULL,
            pages_fetched INTEGER NOT NULL DEFAULT 0,
            records_fetched INTEGER NOT NULL DEFAULT 0,
            inserted INTEGER NOT NULL DEFAULT 0,
            duplicates INTEGER NOT NULL DEFAULT 0,
            unmatched INTEGER NOT NULL DEFAULT 0,
            skipped INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            queued_at TEXT NOT NULL,
            started_at TEXT,
            ended_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Sync tuning keys are deliberately absent so that environment and TOML
/// values are not shadowed by seeded rows.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "database_busy_timeout_ms", &DEFAULT_BUSY_TIMEOUT_MS.to_string()).await?;
    Ok(())
}

/// Insert a setting if it is missing, or reset it if it is NULL
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        WHERE settings.value IS NULL
        "#,
    )
    .bind(key)
    .bind(default_value)
    .execute(pool)
    .await?;

    Ok(())
}
