//! Ad-hoc attendance fetch
//!
//! POST /api/attendance/fetch queues a run against device parameters given
//! in the request rather than a stored Device Configuration.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;

use attsync_common::TimeWindow;

use super::devices::{FetchQueuedResponse, FETCH_QUEUED_MESSAGE};
use crate::db::runs::RunTrigger;
use crate::device::DeviceTarget;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AttendanceFetchRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub device_ip: String,
    pub major: i64,
    pub minor: i64,
    pub device_user: String,
    pub device_user_password: String,
}

/// POST /api/attendance/fetch
pub async fn fetch_attendance(
    State(state): State<AppState>,
    Json(request): Json<AttendanceFetchRequest>,
) -> ApiResult<(StatusCode, Json<FetchQueuedResponse>)> {
    if request.device_ip.trim().is_empty() {
        return Err(ApiError::BadRequest("device_ip is required".to_string()));
    }

    let window = TimeWindow::from_bounds(
        request.start_date.as_deref(),
        request.end_date.as_deref(),
        state.settings.utc_offset,
    )?;

    let target = DeviceTarget {
        device_ip: request.device_ip.trim().to_string(),
        major: request.major,
        minor: request.minor,
        device_user: request.device_user,
        device_user_password: request.device_user_password,
    };

    let run = state
        .jobs
        .enqueue(target, None, window, RunTrigger::Manual)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(FetchQueuedResponse {
            message: FETCH_QUEUED_MESSAGE.to_string(),
            run,
        }),
    ))
}

pub fn attendance_routes() -> Router<AppState> {
    Router::new().route("/api/attendance/fetch", post(fetch_attendance))
}
