//! Configuration resolution for civiq-is
//!
//! Multi-tier resolution for the Gemini API key with Database → ENV → TOML
//! priority. A missing key is a supported configuration: the classifier
//! then runs in pure deterministic mode.

use civiq_common::config::{load_toml_config, write_toml_config, TomlConfig};
use civiq_common::Result;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{info, warn};

/// Resolve the Gemini API key from 3-tier configuration
///
/// **Priority:** Database → ENV (`CIVIQ_GEMINI_API_KEY`) → TOML
///
/// Returns None when no tier holds a valid key.
pub async fn resolve_gemini_api_key(
    db: &SqlitePool,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let db_key = crate::db::settings::get_gemini_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var("CIVIQ_GEMINI_API_KEY")
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .gemini_api_key
        .clone()
        .filter(|k| is_valid_key(k));

    let sources: Vec<&str> = [
        db_key.as_ref().map(|_| "database"),
        env_key.as_ref().map(|_| "environment"),
        toml_key.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if sources.len() > 1 {
        warn!(
            "Gemini API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("Gemini API key loaded from database");
        return Ok(Some(key));
    }
    if let Some(key) = env_key {
        info!("Gemini API key loaded from environment variable");
        return Ok(Some(key));
    }
    if let Some(key) = toml_key {
        info!("Gemini API key loaded from TOML config");
        return Ok(Some(key));
    }

    info!("No Gemini API key configured; classification runs in deterministic mode");
    Ok(None)
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Sync the Gemini API key into the TOML config file (best-effort backup)
///
/// The database stays authoritative; a TOML write failure is logged and
/// swallowed.
pub async fn sync_gemini_key_to_toml(key: &str, toml_path: &Path) -> Result<()> {
    let mut config = load_toml_config(toml_path).unwrap_or_default();
    config.gemini_api_key = Some(key.to_string());

    match write_toml_config(&config, toml_path) {
        Ok(()) => {
            info!("Gemini API key synced to TOML: {}", toml_path.display());
            Ok(())
        }
        Err(e) => {
            warn!("TOML sync failed (database write succeeded): {}", e);
            Ok(())
        }
    }
}
