//! Versioned options table.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use slm_core::error::{AppError, ErrorKind};
use slm_core::result::AppResult;
use slm_core::traits::{OptionStore, VersionedValue};

/// [`OptionStore`] over the `options` table.
///
/// Every write bumps `version`; conditional writes compare it in the
/// `WHERE` clause so two writers can never both succeed. Deletes only flag
/// the row, keeping its version for the next write.
#[derive(Debug, Clone)]
pub struct PgOptionStore {
    pool: PgPool,
}

impl PgOptionStore {
    /// Create a store on `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OptionStore for PgOptionStore {
    async fn get(&self, name: &str) -> AppResult<Option<VersionedValue>> {
        let row: Option<(Value, i64)> =
            sqlx::query_as("SELECT value, version FROM options WHERE name = $1 AND NOT deleted")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Persistence,
                        format!("Failed to read option '{name}'"),
                        e,
                    )
                })?;
        Ok(row.map(|(value, version)| VersionedValue { value, version }))
    }

    async fn put(&self, name: &str, value: &Value) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO options (name, value, version, updated_at) VALUES ($1, $2, 1, NOW()) \
             ON CONFLICT (name) DO UPDATE \
             SET value = EXCLUDED.value, version = options.version + 1, deleted = FALSE, \
             updated_at = NOW()",
        )
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Persistence,
                format!("Failed to write option '{name}'"),
                e,
            )
        })?;
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        name: &str,
        expected_version: Option<i64>,
        value: &Value,
    ) -> AppResult<bool> {
        let result = match expected_version {
            None => {
                sqlx::query(
                    "INSERT INTO options (name, value, version, updated_at) \
                     VALUES ($1, $2, 1, NOW()) ON CONFLICT (name) DO UPDATE \
                     SET value = EXCLUDED.value, version = options.version + 1, \
                     deleted = FALSE, updated_at = NOW() \
                     WHERE options.deleted",
                )
                .bind(name)
                .bind(value)
                .execute(&self.pool)
                .await
            }
            Some(version) => {
                sqlx::query(
                    "UPDATE options SET value = $2, version = version + 1, updated_at = NOW() \
                     WHERE name = $1 AND version = $3 AND NOT deleted",
                )
                .bind(name)
                .bind(value)
                .bind(version)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Persistence,
                format!("Failed to update option '{name}'"),
                e,
            )
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, name: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE options SET deleted = TRUE, version = version + 1, updated_at = NOW() \
             WHERE name = $1 AND NOT deleted",
        )
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Persistence,
                format!("Failed to delete option '{name}'"),
                e,
            )
        })?;
        Ok(result.rows_affected() > 0)
    }
}
