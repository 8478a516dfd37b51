//! Public transparency aggregates
//!
//! Read-only rollups for the home page and the transparency dashboard.
//! Pure SQL aggregation; no decision logic lives here.

use crate::db::departments::Department;
use crate::{db, ApiResult, AppState};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

/// Platform-wide statistics
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_issues: i64,
    pub resolved_issues: i64,
    /// Percentage of issues resolved or closed, rounded
    pub resolution_rate: i64,
    pub active_users: i64,
    /// Average days from submission to resolution, rounded; 0 when no
    /// issue has been resolved yet
    pub avg_resolution_days: i64,
}

/// Department row with its issue load
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentTransparency {
    #[serde(flatten)]
    pub department: Department,
    pub open_issues: i64,
    pub resolved_issues: i64,
}

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let total_issues = db::issues::count_issues(&state.db).await?;
    let resolved_issues = db::issues::count_resolved_issues(&state.db).await?;
    let active_users = db::profiles::count_profiles(&state.db).await?;
    let avg_days = db::issues::avg_resolution_days(&state.db).await?.unwrap_or(0.0);

    let resolution_rate = if total_issues > 0 {
        (resolved_issues as f64 / total_issues as f64 * 100.0).round() as i64
    } else {
        0
    };

    Ok(Json(StatsResponse {
        total_issues,
        resolved_issues,
        resolution_rate,
        active_users,
        avg_resolution_days: avg_days.round() as i64,
    }))
}

/// GET /api/transparency
pub async fn get_transparency(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<DepartmentTransparency>>> {
    let departments = db::departments::list_departments(&state.db).await?;

    let mut rows = Vec::with_capacity(departments.len());
    for department in departments {
        let (open_issues, resolved_issues) =
            db::departments::issue_counts(&state.db, department.id).await?;
        rows.push(DepartmentTransparency {
            department,
            open_issues,
            resolved_issues,
        });
    }

    Ok(Json(rows))
}

/// Build stats routes
pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats", get(get_stats))
        .route("/api/transparency", get(get_transparency))
}
