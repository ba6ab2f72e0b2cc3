//! Tests for database initialization and migrations

use attsync_common::db::{get_schema_version, get_setting, init_database, set_setting, CURRENT_SCHEMA_VERSION};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("attsync.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("attsync.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("attsync.db")).await.unwrap();

    for table in [
        "settings",
        "devices",
        "employees",
        "employee_checkins",
        "shift_types",
        "sync_runs",
    ] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "table {} missing", table);
    }
}

#[tokio::test]
async fn test_migrations_recorded_and_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("attsync.db");

    let pool = init_database(&db_path).await.unwrap();
    assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    pool.close().await;

    // Re-open: no migration should be re-applied
    let pool = init_database(&db_path).await.unwrap();
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, CURRENT_SCHEMA_VERSION as i64);

    let index_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='index' AND name='idx_employee_checkins_employee_time')",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(index_exists);
}

#[tokio::test]
async fn test_default_settings_and_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("attsync.db");
    let pool = init_database(&db_path).await.unwrap();

    assert_eq!(
        get_setting(&pool, "database_busy_timeout_ms").await.unwrap(),
        Some("5000".to_string())
    );
    assert_eq!(get_setting(&pool, "sync_page_size").await.unwrap(), None);

    set_setting(&pool, "database_busy_timeout_ms", "750").await.unwrap();
    pool.close().await;

    // A user-changed value survives re-initialization
    let pool = init_database(&db_path).await.unwrap();
    assert_eq!(
        get_setting(&pool, "database_busy_timeout_ms").await.unwrap(),
        Some("750".to_string())
    );
}
