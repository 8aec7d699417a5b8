//! `/auth` routes: register, login, verify, logout, me.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Serialize;

use crate::auth::gate::authenticate;
use crate::auth::password::dummy_digest;
use crate::auth::{hash_password, verify_password, AuthUser};
use crate::http::error::ApiError;
use crate::http::request::JsonBody;
use crate::http::response::Envelope;
use crate::http::server::AppState;
use crate::http::validation;
use crate::store::{users, User};

const BAD_CREDENTIALS: &str = "Invalid email or password";
const DEACTIVATED: &str = "Account is deactivated. Please contact support.";

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: i32,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct LoginData {
    pub token: String,
    pub user: LoginUser,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct TokenInfo {
    pub user_id: i32,
    pub email: String,
    pub expires_at: i64,
}

/// Run a CPU-heavy hashing job off the async workers.
async fn blocking<T, F>(job: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(ApiError::internal)
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Envelope<User>, ApiError> {
    let input = validation::registration(&body)?;
    let password = input.password;
    let digest = blocking(move || hash_password(&password)).await??;

    let mut conn = state.pool.acquire(state.retry).await?;
    let result = users::create(&mut conn, &input.email, &digest, &input.full_name).await;
    conn.release().await;

    let user = result.map_err(|e| {
        if e.is_conflict() {
            ApiError::Conflict("Email already registered".to_string())
        } else {
            e.into()
        }
    })?;
    tracing::info!(user_id = user.id, "User registered");
    Ok(Envelope::data(user)
        .with_message("User registered successfully")
        .with_status(StatusCode::CREATED))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Envelope<LoginData>, ApiError> {
    let input = validation::login(&body)?;

    let mut conn = state.pool.acquire(state.retry).await?;
    let result = users::find_credentials(&mut conn, &input.email).await;
    conn.release().await;
    let account = result?;

    // Unknown emails still pay for one verification.
    let digest = match &account {
        Some(account) => account.password_hash.clone(),
        None => dummy_digest().to_string(),
    };
    let password = input.password;
    let matches = blocking(move || verify_password(&password, &digest)).await?;

    let account = match account {
        Some(account) if matches => account,
        _ => {
            tracing::info!("Login rejected: bad credentials");
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        }
    };
    if !account.is_active {
        tracing::info!(user_id = account.id, "Login rejected: account deactivated");
        return Err(ApiError::unauthorized(DEACTIVATED));
    }

    let ttl = state.tokens.ttl_secs();
    let token = state.tokens.issue(account.id, &account.email, ttl)?;
    tracing::info!(user_id = account.id, "Login succeeded");

    Ok(Envelope::data(LoginData {
        token,
        user: LoginUser {
            id: account.id,
            email: account.email,
            full_name: account.full_name,
        },
        expires_in: ttl,
    })
    .with_message("Login successful"))
}

/// Check the bearer token without touching the store.
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Envelope<TokenInfo>, ApiError> {
    let user = authenticate(&state.tokens, &headers)?;
    Ok(Envelope::data(TokenInfo {
        user_id: user.user_id,
        email: user.email,
        expires_at: user.expires_at,
    })
    .with_message("Token is valid"))
}

/// Tokens are stateless; this only tells the client to discard theirs.
pub async fn logout(user: Option<AuthUser>) -> Envelope<()> {
    match user {
        Some(user) => tracing::info!(user_id = user.user_id, "User logged out"),
        None => tracing::debug!("Anonymous logout"),
    }
    Envelope::message("Logout successful. Please remove token from client storage.")
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Envelope<User>, ApiError> {
    let mut conn = state.pool.acquire(state.retry).await?;
    let result = users::find_by_id(&mut conn, user.user_id).await;
    conn.release().await;

    result?
        .map(Envelope::data)
        .ok_or_else(|| ApiError::not_found("User not found"))
}
