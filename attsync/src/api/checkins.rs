//! Check-in listing
//!
//! GET /api/checkins?employee=&from=&to=&page=&per_page=
//!
//! `from`/`to` accept a date or a datetime; a bare `to` date covers the whole day.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use attsync_common::db::EmployeeCheckin;
use attsync_common::time::{format_checkin_time, parse_time_bound, Bound};

use crate::db::checkins::{self, CheckinFilter};
use crate::error::ApiResult;
use crate::pagination::calculate_pagination;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckinQuery {
    pub employee: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CheckinPage {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
    pub checkins: Vec<EmployeeCheckin>,
}

/// GET /api/checkins
pub async fn list_checkins(
    State(state): State<AppState>,
    Query(query): Query<CheckinQuery>,
) -> ApiResult<Json<CheckinPage>> {
    let filter = CheckinFilter {
        employee: query.employee.filter(|e| !e.trim().is_empty()),
        from: query
            .from
            .as_deref()
            .map(|s| parse_time_bound(s, Bound::Start).map(format_checkin_time))
            .transpose()?,
        to: query
            .to
            .as_deref()
            .map(|s| parse_time_bound(s, Bound::End).map(format_checkin_time))
            .transpose()?,
    };

    let total = checkins::count_checkins(&state.db, &filter).await?;
    let pagination = calculate_pagination(total, query.page.unwrap_or(1), query.per_page);
    let rows =
        checkins::list_checkins(&state.db, &filter, pagination.per_page, pagination.offset).await?;

    Ok(Json(CheckinPage {
        total,
        page: pagination.page,
        per_page: pagination.per_page,
        total_pages: pagination.total_pages,
        checkins: rows,
    }))
}

pub fn checkin_routes() -> Router<AppState> {
    Router::new().route("/api/checkins", get(list_checkins))
}
