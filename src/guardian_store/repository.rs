//! GuardianStore Repository
//!
//! Database access layer for the guardian contact record

use super::types::Guardian;
use crate::error::Result;
use sqlx::SqlitePool;

/// Guardian repository for database operations
#[derive(Clone)]
pub struct GuardianRepository {
    pool: SqlitePool,
}

impl GuardianRepository {
    /// Create new repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the schema if it does not exist yet
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guardians (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                number TEXT UNIQUE NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the guardian record (the table holds at most one row)
    pub async fn get(&self) -> Result<Option<Guardian>> {
        let guardian = sqlx::query_as::<_, Guardian>(
            "SELECT id, number, created_at, updated_at FROM guardians ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(guardian)
    }

    /// Set the guardian number: update the existing row, or insert the first one
    pub async fn set(&self, number: &str) -> Result<Guardian> {
        let now = chrono::Utc::now();

        match self.get().await? {
            Some(existing) => {
                sqlx::query("UPDATE guardians SET number = ?, updated_at = ? WHERE id = ?")
                    .bind(number)
                    .bind(now)
                    .bind(existing.id)
                    .execute(&self.pool)
                    .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO guardians (number, created_at, updated_at) VALUES (?, ?, ?)",
                )
                .bind(number)
                .bind(now)
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
        }

        self.get().await?.ok_or_else(|| {
            crate::error::Error::Internal("Guardian not found after upsert".to_string())
        })
    }

    /// Delete the guardian record
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM guardians").execute(&self.pool).await?;
        Ok(())
    }
}
