//! User account queries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgConnection;

use crate::store::StoreError;

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Row needed to check a login. Never serialized.
#[derive(Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub is_active: bool,
}

impl std::fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredentials")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

pub async fn create(
    conn: &mut PgConnection,
    email: &str,
    password_hash: &str,
    full_name: &str,
) -> Result<User, StoreError> {
    Ok(sqlx::query_as::<_, User>(
        "INSERT INTO users (email, password_hash, full_name) VALUES ($1, $2, $3) \
         RETURNING id, email, full_name, is_active, created_at",
    )
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .fetch_one(&mut *conn)
    .await?)
}

pub async fn find_credentials(
    conn: &mut PgConnection,
    email: &str,
) -> Result<Option<UserCredentials>, StoreError> {
    Ok(sqlx::query_as::<_, UserCredentials>(
        "SELECT id, email, password_hash, full_name, is_active FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(&mut *conn)
    .await?)
}

pub async fn find_by_id(conn: &mut PgConnection, id: i32) -> Result<Option<User>, StoreError> {
    Ok(sqlx::query_as::<_, User>(
        "SELECT id, email, full_name, is_active, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?)
}
