//! Shift types
//!
//! Only the name is managed here; `last_sync_of_checkin` is written by the sync.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};

use attsync_common::db::ShiftType;

use crate::db::shift_types;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/shift-types
pub async fn list_shift_types(State(state): State<AppState>) -> ApiResult<Json<Vec<ShiftType>>> {
    Ok(Json(shift_types::list_shift_types(&state.db).await?))
}

/// PUT /api/shift-types/:name
pub async fn put_shift_type(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ShiftType>> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Shift type name is required".to_string()));
    }

    shift_types::ensure_shift_type(&state.db, &name).await?;

    shift_types::list_shift_types(&state.db)
        .await?
        .into_iter()
        .find(|s| s.name == name)
        .map(Json)
        .ok_or_else(|| ApiError::Internal(format!("Shift type {} missing after save", name)))
}

pub fn shift_type_routes() -> Router<AppState> {
    Router::new()
        .route("/api/shift-types", get(list_shift_types))
        .route("/api/shift-types/:name", put(put_shift_type))
}
