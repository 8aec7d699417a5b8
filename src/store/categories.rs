//! Category queries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};

use crate::store::StoreError;

const COLUMNS: &str = "id, name, description, is_active, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

/// Partial update. Each field is independently present or absent;
/// `description: Some(None)` clears the column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.is_active.is_none()
    }

    /// Assemble the UPDATE. Column names are fixed fragments; every value is bound.
    fn to_query(&self, id: i32) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("UPDATE categories SET ");
        let mut set = qb.separated(", ");
        if let Some(name) = &self.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(description) = &self.description {
            set.push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(is_active) = self.is_active {
            set.push("is_active = ").push_bind_unseparated(is_active);
        }
        set.push("updated_at = NOW()");

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING ").push(COLUMNS);
        qb
    }
}

pub async fn list(conn: &mut PgConnection) -> Result<Vec<Category>, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM categories ORDER BY id ASC");
    Ok(sqlx::query_as::<_, Category>(&sql).fetch_all(&mut *conn).await?)
}

pub async fn get(conn: &mut PgConnection, id: i32) -> Result<Option<Category>, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM categories WHERE id = $1");
    Ok(sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?)
}

pub async fn create(conn: &mut PgConnection, new: &NewCategory) -> Result<Category, StoreError> {
    let sql = format!(
        "INSERT INTO categories (name, description, is_active) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
    );
    Ok(sqlx::query_as::<_, Category>(&sql)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.is_active)
        .fetch_one(&mut *conn)
        .await?)
}

/// Apply `patch`; `None` when no category has `id`.
///
/// Existence check and write share one transaction.
pub async fn update(
    conn: &mut PgConnection,
    id: i32,
    patch: &CategoryPatch,
) -> Result<Option<Category>, StoreError> {
    let mut tx = conn.begin().await?;

    let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM categories WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Ok(None);
    }

    let updated = patch
        .to_query(id)
        .build_query_as::<Category>()
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(Some(updated))
}

/// Delete by id, returning the removed category's name.
pub async fn delete(conn: &mut PgConnection, id: i32) -> Result<Option<String>, StoreError> {
    Ok(sqlx::query_scalar("DELETE FROM categories WHERE id = $1 RETURNING name")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_sql_binds_only_present_fields() {
        let patch = CategoryPatch {
            name: Some("Markets".into()),
            description: Some(None),
            is_active: None,
        };
        let qb = patch.to_query(7);
        assert_eq!(
            qb.sql(),
            "UPDATE categories SET name = $1, description = $2, updated_at = NOW() WHERE id = $3 \
             RETURNING id, name, description, is_active, created_at, updated_at"
        );
    }

    #[test]
    fn test_empty_patch_still_touches_updated_at() {
        let patch = CategoryPatch::default();
        assert!(patch.is_empty());
        let qb = patch.to_query(1);
        assert!(qb.sql().starts_with("UPDATE categories SET updated_at = NOW() WHERE id = $1"));
    }

    #[test]
    fn test_user_text_never_reaches_sql() {
        let patch = CategoryPatch {
            name: Some("x'; DROP TABLE categories; --".into()),
            ..Default::default()
        };
        let qb = patch.to_query(1);
        assert!(!qb.sql().contains("DROP"));
    }
}
