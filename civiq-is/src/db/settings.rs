//! Settings database operations
//!
//! Key-value accessors backing runtime configuration. The database is the
//! authoritative tier for the Gemini API key; env and TOML are fallbacks
//! resolved in `crate::config`.

use civiq_common::{Error, Result};
use sqlx::SqlitePool;

/// Get Gemini API key from database
///
/// Returns Some(key) if set, None otherwise.
pub async fn get_gemini_api_key(pool: &SqlitePool) -> Result<Option<String>> {
    get_setting::<String>(pool, "gemini_api_key").await
}

/// Set Gemini API key in database
pub async fn set_gemini_api_key(pool: &SqlitePool, key: String) -> Result<()> {
    set_setting(pool, "gemini_api_key", key).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(pool: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting failed: {}", e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(pool: &SqlitePool, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::schema::create_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let pool = setup_pool().await;
        assert_eq!(get_gemini_api_key(&pool).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_roundtrip() {
        let pool = setup_pool().await;
        set_gemini_api_key(&pool, "key-123".to_string()).await.unwrap();
        assert_eq!(
            get_gemini_api_key(&pool).await.unwrap(),
            Some("key-123".to_string())
        );
    }

    #[tokio::test]
    async fn set_overwrites_without_duplicates() {
        let pool = setup_pool().await;
        set_gemini_api_key(&pool, "old".to_string()).await.unwrap();
        set_gemini_api_key(&pool, "new".to_string()).await.unwrap();

        assert_eq!(
            get_gemini_api_key(&pool).await.unwrap(),
            Some("new".to_string())
        );
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM settings WHERE key = 'gemini_api_key'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
    }
}
