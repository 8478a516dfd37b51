//! Department database operations
//!
//! Departments are looked up by name when the classifier resolves a
//! responsible department. The lookup is best-effort: a miss leaves the
//! issue unassigned rather than failing classification.

use chrono::{DateTime, Utc};
use civiq_common::{Error, Result};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Department record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub transparency_score: f64,
    pub avg_resolution_days: f64,
    pub created_at: DateTime<Utc>,
}

/// Standard departments seeded at init so classification lookups resolve
/// on a fresh database
const SEED_DEPARTMENTS: [(&str, &str); 7] = [
    ("Roads & Transport", "Road surfaces, signage and public transport"),
    ("Sanitation", "Street cleaning and public sanitation"),
    ("Water Supply", "Drinking water distribution and leaks"),
    ("Public Safety", "Hazards, lighting and public safety"),
    ("Electricity", "Power distribution and street lighting"),
    ("Waste Management", "Garbage collection and disposal"),
    ("General", "Catch-all for uncategorized issues"),
];

fn department_from_row(row: &SqliteRow) -> Result<Department> {
    let id_str: String = row.get("id");
    Ok(Department {
        id: Uuid::parse_str(&id_str).map_err(|e| Error::Internal(e.to_string()))?,
        name: row.get("name"),
        description: row.get("description"),
        transparency_score: row.get("transparency_score"),
        avg_resolution_days: row.get("avg_resolution_days"),
        created_at: row.get("created_at"),
    })
}

/// Seed the standard departments (idempotent, keyed on unique name)
pub async fn seed_departments(pool: &SqlitePool) -> Result<()> {
    for (name, description) in SEED_DEPARTMENTS {
        sqlx::query(
            "INSERT INTO departments (id, name, description, created_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Look up a department by exact name (best-effort)
pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Department>> {
    let row = sqlx::query(
        "SELECT id, name, description, transparency_score, avg_resolution_days, created_at \
         FROM departments WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(department_from_row).transpose()
}

/// All departments, alphabetical
pub async fn list_departments(pool: &SqlitePool) -> Result<Vec<Department>> {
    let rows = sqlx::query(
        "SELECT id, name, description, transparency_score, avg_resolution_days, created_at \
         FROM departments ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(department_from_row).collect()
}

/// Open / resolved issue counts for one department
pub async fn issue_counts(pool: &SqlitePool, department_id: Uuid) -> Result<(i64, i64)> {
    let open: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM issues \
         WHERE assigned_to_department = ? AND status NOT IN ('resolved', 'closed')",
    )
    .bind(department_id.to_string())
    .fetch_one(pool)
    .await?;

    let resolved: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM issues \
         WHERE assigned_to_department = ? AND status IN ('resolved', 'closed')",
    )
    .bind(department_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok((open, resolved))
}
