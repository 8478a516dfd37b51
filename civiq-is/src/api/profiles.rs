//! Profile record endpoints
//!
//! Minimal record CRUD: profiles originate from the external auth flow and
//! are mirrored here for vote attribution and the activity stats.

use crate::db::profiles::{Profile, Role};
use crate::{db, ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

/// Request payload for profile registration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProfileRequest {
    pub full_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub ward: Option<String>,
}

/// POST /api/profiles
pub async fn register_profile(
    State(state): State<AppState>,
    Json(payload): Json<RegisterProfileRequest>,
) -> ApiResult<Json<Profile>> {
    if payload.full_name.trim().is_empty() {
        return Err(ApiError::BadRequest("fullName is required".to_string()));
    }
    let role = match payload.role.as_deref() {
        Some(role) => Role::from_str(role).map_err(ApiError::BadRequest)?,
        None => Role::Citizen,
    };

    let mut profile = Profile::new(payload.full_name.trim().to_string(), role);
    profile.city = payload.city;
    profile.ward = payload.ward;

    db::profiles::save_profile(&state.db, &profile).await?;

    Ok(Json(profile))
}

/// GET /api/profiles/:id
pub async fn get_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
) -> ApiResult<Json<Profile>> {
    let profile = db::profiles::get_profile(&state.db, profile_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("profile {profile_id}")))?;
    Ok(Json(profile))
}

/// Build profile routes
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/api/profiles", post(register_profile))
        .route("/api/profiles/:id", get(get_profile))
}
