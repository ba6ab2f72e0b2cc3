//! Sync run history

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::runs::{self, SyncRun};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_RUN_LIMIT: i64 = 50;
const MAX_RUN_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct RunListQuery {
    pub limit: Option<i64>,
}

/// GET /api/runs
pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<RunListQuery>,
) -> ApiResult<Json<Vec<SyncRun>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RUN_LIMIT).clamp(1, MAX_RUN_LIMIT);
    Ok(Json(runs::list_runs(&state.db, limit).await?))
}

/// GET /api/runs/:id
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<SyncRun>> {
    let run_id = Uuid::parse_str(&run_id)
        .map_err(|_| ApiError::BadRequest(format!("Invalid run id: {}", run_id)))?;

    runs::get_run(&state.db, run_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Run {}", run_id)))
}

pub fn run_routes() -> Router<AppState> {
    Router::new()
        .route("/api/runs", get(list_runs))
        .route("/api/runs/:id", get(get_run))
}
