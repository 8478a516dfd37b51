//! Profile database operations
//!
//! Auth and sessions live elsewhere; this table mirrors the user records
//! the service needs for vote attribution and the activity stats.

use chrono::{DateTime, Utc};
use civiq_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Officer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Officer => "officer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "citizen" => Ok(Role::Citizen),
            "officer" => Ok(Role::Officer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Profile record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub role: Role,
    pub city: Option<String>,
    pub ward: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(full_name: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name,
            role,
            city: None,
            ward: None,
            created_at: Utc::now(),
        }
    }
}

/// Save profile (upsert on id)
pub async fn save_profile(pool: &SqlitePool, profile: &Profile) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO profiles (id, full_name, role, city, ward, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            full_name = excluded.full_name,
            role = excluded.role,
            city = excluded.city,
            ward = excluded.ward
        "#,
    )
    .bind(profile.id.to_string())
    .bind(&profile.full_name)
    .bind(profile.role.as_str())
    .bind(&profile.city)
    .bind(&profile.ward)
    .bind(profile.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load profile by id
pub async fn get_profile(pool: &SqlitePool, profile_id: Uuid) -> Result<Option<Profile>> {
    let row: Option<(String, String, String, Option<String>, Option<String>, DateTime<Utc>)> =
        sqlx::query_as(
            "SELECT id, full_name, role, city, ward, created_at FROM profiles WHERE id = ?",
        )
        .bind(profile_id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some((id, full_name, role, city, ward, created_at)) => Ok(Some(Profile {
            id: Uuid::parse_str(&id).map_err(|e| Error::Internal(e.to_string()))?,
            full_name,
            role: Role::from_str(&role).map_err(Error::Internal)?,
            city,
            ward,
            created_at,
        })),
        None => Ok(None),
    }
}

/// Registered user count (the "active users" stat)
pub async fn count_profiles(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
        .fetch_one(pool)
        .await?;
    Ok(count)
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
    async fn save_and_load_profile() {
        let pool = setup_pool().await;
        let profile = Profile::new("Asha Rao".to_string(), Role::Officer);

        save_profile(&pool, &profile).await.unwrap();
        let loaded = get_profile(&pool, profile.id).await.unwrap().unwrap();

        assert_eq!(loaded.full_name, "Asha Rao");
        assert_eq!(loaded.role, Role::Officer);
    }

    #[tokio::test]
    async fn upsert_updates_in_place() {
        let pool = setup_pool().await;
        let mut profile = Profile::new("K. Iyer".to_string(), Role::Citizen);
        save_profile(&pool, &profile).await.unwrap();

        profile.role = Role::Admin;
        save_profile(&pool, &profile).await.unwrap();

        let loaded = get_profile(&pool, profile.id).await.unwrap().unwrap();
        assert_eq!(loaded.role, Role::Admin);
        assert_eq!(count_profiles(&pool).await.unwrap(), 1);
    }
}
