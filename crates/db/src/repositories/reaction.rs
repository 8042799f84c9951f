use chrono::Utc;
use sqlx::Row;

use trrbot_core::domain::reaction::{ReactionMapping, ReactionMappingId};

use super::group::parse_timestamp;
use super::{ReactionRepository, RepositoryError};
use crate::DbPool;

pub struct SqlReactionRepository {
    pool: DbPool,
}

impl SqlReactionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_mapping(row: &sqlx::sqlite::SqliteRow) -> Result<ReactionMapping, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let trigger_text: String =
        row.try_get("trigger_text").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reaction: String =
        row.try_get("reaction").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let usage_count: i64 =
        row.try_get("usage_count").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ReactionMapping {
        id: ReactionMappingId(id),
        trigger_text,
        reaction,
        usage_count,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[async_trait::async_trait]
impl ReactionRepository for SqlReactionRepository {
    async fn list(&self) -> Result<Vec<ReactionMapping>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, trigger_text, reaction, usage_count, created_at, updated_at
             FROM reaction_mapping ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_mapping).collect::<Result<Vec<_>, _>>()
    }

    async fn find(
        &self,
        trigger_text: &str,
        reaction: &str,
    ) -> Result<Option<ReactionMapping>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, trigger_text, reaction, usage_count, created_at, updated_at
             FROM reaction_mapping WHERE trigger_text = ? AND reaction = ?",
        )
        .bind(trigger_text)
        .bind(reaction)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_mapping(r)?)),
            None => Ok(None),
        }
    }

    async fn create(
        &self,
        trigger_text: &str,
        reaction: &str,
    ) -> Result<ReactionMapping, RepositoryError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO reaction_mapping
                 (trigger_text, reaction, usage_count, created_at, updated_at)
             VALUES (?, ?, 0, ?, ?)",
        )
        .bind(trigger_text)
        .bind(reaction)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from_insert(e, || {
                format!("リアクションマッピング \"{trigger_text}\" → {reaction}")
            })
        })?;

        Ok(ReactionMapping {
            id: ReactionMappingId(result.last_insert_rowid()),
            trigger_text: trigger_text.to_string(),
            reaction: reaction.to_string(),
            usage_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    async fn delete(&self, trigger_text: &str, reaction: &str) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM reaction_mapping WHERE trigger_text = ? AND reaction = ?")
                .bind(trigger_text)
                .bind(reaction)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_usage(
        &self,
        trigger_text: &str,
        reaction: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE reaction_mapping
             SET usage_count = usage_count + 1, updated_at = ?
             WHERE trigger_text = ? AND reaction = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(trigger_text)
        .bind(reaction)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
