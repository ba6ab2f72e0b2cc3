//! Employee records and their badge mapping

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use attsync_common::db::Employee;

use crate::db::employees;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EmployeeUpdate {
    pub employee_name: String,
    pub attendance_device_id: Option<String>,
}

/// GET /api/employees
pub async fn list_employees(State(state): State<AppState>) -> ApiResult<Json<Vec<Employee>>> {
    Ok(Json(employees::list_employees(&state.db).await?))
}

/// PUT /api/employees/:name
pub async fn put_employee(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(update): Json<EmployeeUpdate>,
) -> ApiResult<Json<Employee>> {
    let employee = Employee {
        name: name.clone(),
        employee_name: update.employee_name,
        attendance_device_id: update.attendance_device_id,
    };
    employees::upsert_employee(&state.db, &employee).await?;

    employees::get_employee(&state.db, &name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::Internal(format!("Employee {} missing after save", name)))
}

pub fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/api/employees", get(list_employees))
        .route("/api/employees/:name", put(put_employee))
}
