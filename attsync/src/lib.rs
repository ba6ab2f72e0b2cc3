//! attsync - access-control device attendance sync
//!
//! Pulls attendance events from access-control devices, maps badges to
//! employees and records check-ins. Runs are queued on a background worker,
//! triggered on a schedule or through the HTTP API.

pub mod api;
pub mod db;
pub mod device;
pub mod error;
pub mod jobs;
pub mod pagination;
pub mod scheduler;
pub mod settings;
pub mod sync;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::jobs::JobQueue;
use crate::settings::SyncSettings;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jobs: JobQueue,
    pub settings: SyncSettings,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last run or scheduler failure, surfaced by /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        jobs: JobQueue,
        settings: SyncSettings,
        last_error: Arc<RwLock<Option<String>>>,
    ) -> Self {
        Self {
            db,
            jobs,
            settings,
            startup_time: Utc::now(),
            last_error,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::buildinfo_routes())
        .merge(api::device_routes())
        .merge(api::attendance_routes())
        .merge(api::run_routes())
        .merge(api::employee_routes())
        .merge(api::checkin_routes())
        .merge(api::shift_type_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
