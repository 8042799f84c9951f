use chrono::{DateTime, Utc};
use sqlx::Row;

use trrbot_core::domain::group::{Group, GroupId, GroupItem, GroupItemId};

use super::{GroupRepository, RepositoryError};
use crate::DbPool;

pub struct SqlGroupRepository {
    pool: DbPool,
}

impl SqlGroupRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn group_id_by_name(&self, name: &str) -> Result<Option<i64>, RepositoryError> {
        let row = sqlx::query("SELECT id FROM choice_group WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_get::<i64, _>("id").map_err(|e| RepositoryError::Decode(e.to_string())))
            .transpose()
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {e}")))
}

fn row_to_group(row: &sqlx::sqlite::SqliteRow) -> Result<Group, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Group {
        id: GroupId(id),
        name,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<GroupItem, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let group_id: i64 =
        row.try_get("group_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let item_text: String =
        row.try_get("item_text").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(GroupItem {
        id: GroupItemId(id),
        group_id: GroupId(group_id),
        item_text,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait::async_trait]
impl GroupRepository for SqlGroupRepository {
    async fn list(&self) -> Result<Vec<Group>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, created_at, updated_at FROM choice_group ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_group).collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Group>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, created_at, updated_at FROM choice_group WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_group(r)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, name: &str) -> Result<Group, RepositoryError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO choice_group (name, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, || format!("グループ名 \"{name}\"")))?;

        Ok(Group {
            id: GroupId(result.last_insert_rowid()),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM choice_group WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn items_by_group_name(&self, name: &str) -> Result<Vec<GroupItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT i.id, i.group_id, i.item_text, i.created_at
             FROM choice_group_item i
             JOIN choice_group g ON g.id = i.group_id
             WHERE g.name = ?
             ORDER BY i.id ASC",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect::<Result<Vec<_>, _>>()
    }

    async fn add_items(
        &self,
        group_name: &str,
        items: &[String],
    ) -> Result<Option<Vec<GroupItem>>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let group_id = sqlx::query("SELECT id FROM choice_group WHERE name = ?")
            .bind(group_name)
            .fetch_optional(&mut *tx)
            .await?
            .map(|r| r.try_get::<i64, _>("id").map_err(|e| RepositoryError::Decode(e.to_string())))
            .transpose()?;

        let Some(group_id) = group_id else {
            tx.rollback().await?;
            return Ok(None);
        };

        let now = Utc::now();
        let mut inserted = Vec::with_capacity(items.len());
        for item_text in items {
            let result = sqlx::query(
                "INSERT INTO choice_group_item (group_id, item_text, created_at) VALUES (?, ?, ?)",
            )
            .bind(group_id)
            .bind(item_text)
            .bind(now.to_rfc3339())
            .execute(&mut *tx)
            .await?;

            inserted.push(GroupItem {
                id: GroupItemId(result.last_insert_rowid()),
                group_id: GroupId(group_id),
                item_text: item_text.clone(),
                created_at: now,
            });
        }

        sqlx::query("UPDATE choice_group SET updated_at = ? WHERE id = ?")
            .bind(now.to_rfc3339())
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(inserted))
    }

    async fn remove_item(
        &self,
        group_name: &str,
        item_text: &str,
    ) -> Result<bool, RepositoryError> {
        let Some(group_id) = self.group_id_by_name(group_name).await? else {
            return Ok(false);
        };

        let result =
            sqlx::query("DELETE FROM choice_group_item WHERE group_id = ? AND item_text = ?")
                .bind(group_id)
                .bind(item_text)
                .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_items(&self, group_name: &str) -> Result<Option<u64>, RepositoryError> {
        let Some(group_id) = self.group_id_by_name(group_name).await? else {
            return Ok(None);
        };

        let result = sqlx::query("DELETE FROM choice_group_item WHERE group_id = ?")
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        Ok(Some(result.rows_affected()))
    }
}
