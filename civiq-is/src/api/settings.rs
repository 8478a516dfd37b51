//! Settings API endpoint
//!
//! Provides POST /api/settings/gemini_api_key so an admin can configure AI
//! classification at runtime without restarting the service.

use crate::{ApiError, ApiResult, AppState};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Request payload for setting the Gemini API key
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

/// Response payload for API key configuration
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetApiKeyResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/settings/gemini_api_key handler
///
/// **Behavior:**
/// 1. Validate key (non-empty, non-whitespace)
/// 2. Write to database (authoritative)
/// 3. Sync to TOML (best-effort backup)
///
/// The running classifier picks the key up on next restart; until then the
/// database value is authoritative for resolution.
///
/// **Note:** TOML write failures log warnings but do not fail the request
pub async fn set_gemini_api_key(
    State(state): State<AppState>,
    Json(payload): Json<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    if !crate::config::is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }

    crate::db::settings::set_gemini_api_key(&state.db, payload.api_key.clone()).await?;

    info!("Gemini API key configured via API");

    let toml_path = civiq_common::config::default_config_path();
    crate::config::sync_gemini_key_to_toml(&payload.api_key, &toml_path).await?;

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "Gemini API key configured successfully".to_string(),
    }))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/api/settings/gemini_api_key", post(set_gemini_api_key))
}
