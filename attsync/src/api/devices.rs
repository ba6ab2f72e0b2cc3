//! Device Configuration endpoints
//!
//! GET/POST /api/devices, GET/DELETE /api/devices/:id,
//! POST /api/devices/:id/fetch

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use attsync_common::db::Device;
use attsync_common::TimeWindow;

use crate::db::devices::{self, NewDevice};
use crate::db::runs::{RunTrigger, SyncRun};
use crate::device::DeviceTarget;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Optional window for an on-demand fetch; omitted bounds mean today
#[derive(Debug, Default, Deserialize)]
pub struct FetchWindowRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FetchQueuedResponse {
    pub message: String,
    pub run: SyncRun,
}

pub const FETCH_QUEUED_MESSAGE: &str = "Attendance fetch process has been queued.";

impl FetchWindowRequest {
    /// Parse an optional JSON body; an empty body means "today"
    ///
    /// A body that is present but not valid JSON for this shape is rejected
    /// rather than falling back to the default window.
    pub fn from_body(headers: &HeaderMap, body: &[u8]) -> ApiResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or_default();
            if !content_type.starts_with("application/json") {
                return Err(ApiError::BadRequest(format!(
                    "Expected an application/json body, got '{}'",
                    content_type
                )));
            }
        }

        serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid fetch window: {}", e)))
    }
}

async fn load_device(state: &AppState, id: i64) -> ApiResult<Device> {
    devices::get_device(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Device {}", id)))
}

/// GET /api/devices
pub async fn list_devices(State(state): State<AppState>) -> ApiResult<Json<Vec<Device>>> {
    Ok(Json(devices::list_devices(&state.db).await?))
}

/// POST /api/devices
pub async fn create_device(
    State(state): State<AppState>,
    Json(request): Json<NewDevice>,
) -> ApiResult<(StatusCode, Json<Device>)> {
    let device = devices::create_device(&state.db, &request).await?;
    info!(id = device.id, name = %device.name, device = %device.device_ip, "Device created");
    Ok((StatusCode::CREATED, Json(device)))
}

/// GET /api/devices/:id
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Device>> {
    Ok(Json(load_device(&state, id).await?))
}

/// DELETE /api/devices/:id
pub async fn delete_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if !devices::delete_device(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("Device {}", id)));
    }
    info!(id, "Device deleted");
    Ok(Json(json!({ "deleted": id })))
}

/// POST /api/devices/:id/fetch
///
/// Queue a manual run for a configured device. The body may be omitted.
pub async fn fetch_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<FetchQueuedResponse>)> {
    let device = load_device(&state, id).await?;
    let request = FetchWindowRequest::from_body(&headers, &body)?;

    let window = TimeWindow::from_bounds(
        request.start_date.as_deref(),
        request.end_date.as_deref(),
        state.settings.utc_offset,
    )?;

    let run = state
        .jobs
        .enqueue(DeviceTarget::from(&device), Some(device.id), window, RunTrigger::Manual)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(FetchQueuedResponse {
            message: FETCH_QUEUED_MESSAGE.to_string(),
            run,
        }),
    ))
}

pub fn device_routes() -> Router<AppState> {
    Router::new()
        .route("/api/devices", get(list_devices).post(create_device))
        .route("/api/devices/:id", get(get_device).delete(delete_device))
        .route("/api/devices/:id/fetch", post(fetch_device))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[test]
    fn test_empty_body_means_today() {
        let request = FetchWindowRequest::from_body(&HeaderMap::new(), b"").unwrap();
        assert!(request.start_date.is_none());
        assert!(request.end_date.is_none());

        let request = FetchWindowRequest::from_body(&json_headers(), b"  \n").unwrap();
        assert!(request.start_date.is_none());
    }

    #[test]
    fn test_body_without_content_type_is_parsed() {
        let request =
            FetchWindowRequest::from_body(&HeaderMap::new(), br#"{"start_date": "2025-01-01"}"#)
                .unwrap();
        assert_eq!(request.start_date.as_deref(), Some("2025-01-01"));
        assert!(request.end_date.is_none());
    }

    #[test]
    fn test_bad_bodies_are_rejected() {
        let wrong_type = br#"{"start_date": 20250101, "end_date": "2025-01-07"}"#;
        assert!(matches!(
            FetchWindowRequest::from_body(&json_headers(), wrong_type),
            Err(ApiError::BadRequest(_))
        ));

        assert!(matches!(
            FetchWindowRequest::from_body(&json_headers(), b"{\"start_date\": "),
            Err(ApiError::BadRequest(_))
        ));

        let mut form = HeaderMap::new();
        form.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        assert!(matches!(
            FetchWindowRequest::from_body(&form, b"start_date=2025-01-01"),
            Err(ApiError::BadRequest(_))
        ));
    }
}
