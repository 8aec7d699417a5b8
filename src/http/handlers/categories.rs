//! `/categories` CRUD. Every route sits behind the auth gate.

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
};

use crate::auth::AuthUser;
use crate::http::error::ApiError;
use crate::http::handlers::ENDPOINT_NOT_FOUND;
use crate::http::request::JsonBody;
use crate::http::response::Envelope;
use crate::http::server::AppState;
use crate::http::validation;
use crate::store::{categories, Category};

const NAME_TAKEN: &str = "A category with this name already exists";

/// Numeric `{id}` path segment. Anything but plain digits is an unknown route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryId(pub i32);

impl CategoryId {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        raw.parse().ok().map(CategoryId)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CategoryId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::not_found(ENDPOINT_NOT_FOUND))?;
        CategoryId::parse(&raw).ok_or_else(|| ApiError::not_found(ENDPOINT_NOT_FOUND))
    }
}

fn missing(id: i32) -> ApiError {
    ApiError::not_found(format!("Category with id {id} not found"))
}

fn name_conflict(e: crate::store::StoreError) -> ApiError {
    if e.is_conflict() {
        ApiError::Conflict(NAME_TAKEN.to_string())
    } else {
        e.into()
    }
}

pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Envelope<Vec<Category>>, ApiError> {
    let mut conn = state.pool.acquire(state.retry).await?;
    let result = categories::list(&mut conn).await;
    conn.release().await;

    let rows = result?;
    let count = rows.len();
    Ok(Envelope::data(rows).with_count(count))
}

pub async fn get(
    State(state): State<AppState>,
    CategoryId(id): CategoryId,
    _user: AuthUser,
) -> Result<Envelope<Category>, ApiError> {
    let mut conn = state.pool.acquire(state.retry).await?;
    let result = categories::get(&mut conn, id).await;
    conn.release().await;

    result?.map(Envelope::data).ok_or_else(|| missing(id))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(body): JsonBody,
) -> Result<Envelope<Category>, ApiError> {
    let new = validation::new_category(&body)?;

    let mut conn = state.pool.acquire(state.retry).await?;
    let result = categories::create(&mut conn, &new).await;
    conn.release().await;

    let created = result.map_err(name_conflict)?;
    tracing::info!(category_id = created.id, user_id = user.user_id, "Category created");
    Ok(Envelope::data(created)
        .with_message("Category created successfully")
        .with_status(StatusCode::CREATED))
}

pub async fn update(
    State(state): State<AppState>,
    CategoryId(id): CategoryId,
    user: AuthUser,
    JsonBody(body): JsonBody,
) -> Result<Envelope<Category>, ApiError> {
    let patch = validation::category_patch(&body)?;

    let mut conn = state.pool.acquire(state.retry).await?;
    let result = categories::update(&mut conn, id, &patch).await;
    conn.release().await;

    let updated = result.map_err(name_conflict)?.ok_or_else(|| missing(id))?;
    tracing::info!(category_id = id, user_id = user.user_id, "Category updated");
    Ok(Envelope::data(updated).with_message("Category updated successfully"))
}

pub async fn delete(
    State(state): State<AppState>,
    CategoryId(id): CategoryId,
    user: AuthUser,
) -> Result<Envelope<()>, ApiError> {
    let mut conn = state.pool.acquire(state.retry).await?;
    let result = categories::delete(&mut conn, id).await;
    conn.release().await;

    let name = result?.ok_or_else(|| missing(id))?;
    tracing::info!(category_id = id, user_id = user.user_id, "Category deleted");
    Ok(Envelope::message(format!(
        "Category \"{name}\" deleted successfully"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_id_accepts_plain_digits_only() {
        assert_eq!(CategoryId::parse("42"), Some(CategoryId(42)));
        assert_eq!(CategoryId::parse("007"), Some(CategoryId(7)));
        assert_eq!(CategoryId::parse("-1"), None);
        assert_eq!(CategoryId::parse("+1"), None);
        assert_eq!(CategoryId::parse("abc"), None);
        assert_eq!(CategoryId::parse(""), None);
        assert_eq!(CategoryId::parse("99999999999"), None);
    }
}
