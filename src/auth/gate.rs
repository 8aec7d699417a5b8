//! Auth gate middleware.
//!
//! Wraps protected routes: pulls `Authorization: Bearer <token>`, verifies
//! it with the [`TokenCodec`], and attaches an [`AuthUser`] to the request
//! extensions before the handler runs.

use axum::{
    body::Body,
    extract::{FromRequestParts, OptionalFromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::sync::Arc;

use crate::auth::token::{TokenCodec, TokenError};
use crate::http::error::ApiError;

const BAD_HEADER: &str = "Invalid authorization header format. Use: Bearer <token>";

/// Identity attached to authenticated requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub expires_at: i64,
}

/// Extract the raw token from the `Authorization` header.
///
/// `Ok(None)` when no header was sent at all.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::unauthorized(BAD_HEADER))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("Bearer") => Ok(Some(token.trim())),
        _ => Err(ApiError::unauthorized(BAD_HEADER)),
    }
}

/// Verify the request's bearer credential.
pub fn authenticate(codec: &TokenCodec, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = bearer_token(headers)?.ok_or(TokenError::Missing)?;
    let claims = codec.verify(token)?;
    Ok(AuthUser {
        user_id: claims.user_id,
        email: claims.email,
        expires_at: claims.exp,
    })
}

/// Reject the request with 401 unless it carries a valid token.
pub async fn require_auth(
    State(codec): State<Arc<TokenCodec>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    match authenticate(&codec, req.headers()) {
        Ok(user) => {
            tracing::debug!(user_id = user.user_id, "Request authenticated");
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), reason = e.public_message(), "Rejected unauthenticated request");
            Err(e)
        }
    }
}

/// Attach identity when a valid token is present; otherwise continue anonymously.
pub async fn optional_auth(
    State(codec): State<Arc<TokenCodec>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Ok(user) = authenticate(&codec, req.headers()) {
        req.extensions_mut().insert(user);
    }
    next.run(req).await
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::from(TokenError::Missing))
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for AuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthUser>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::Algorithm;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_parsing() {
        assert_eq!(bearer_token(&HeaderMap::new()).unwrap(), None);
        assert_eq!(bearer_token(&headers("Bearer abc")).unwrap(), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")).unwrap(), Some("abc"));
        assert_eq!(bearer_token(&headers("Bearer ")).unwrap(), Some(""));
        assert!(bearer_token(&headers("Bearer")).is_err());
        assert!(bearer_token(&headers("Basic dXNlcjpwYXNz")).is_err());
    }

    #[test]
    fn test_authenticate_messages() {
        let codec = TokenCodec::new("k", Algorithm::HS256, 60);

        let err = authenticate(&codec, &HeaderMap::new()).unwrap_err();
        assert_eq!(err.public_message(), "Authentication token is missing");

        let err = authenticate(&codec, &headers("Bearer ")).unwrap_err();
        assert_eq!(err.public_message(), "Authentication token is missing");

        let err = authenticate(&codec, &headers("Token abc")).unwrap_err();
        assert_eq!(err.public_message(), BAD_HEADER);

        let err = authenticate(&codec, &headers("Bearer nope")).unwrap_err();
        assert_eq!(err.public_message(), "Invalid token");

        let expired = codec.issue(1, "a@b.co", 0).unwrap();
        let err = authenticate(&codec, &headers(&format!("Bearer {}", expired))).unwrap_err();
        assert_eq!(err.public_message(), "Token has expired");

        let good = codec.issue(9, "a@b.co", 60).unwrap();
        let user = authenticate(&codec, &headers(&format!("Bearer {}", good))).unwrap();
        assert_eq!(user.user_id, 9);
        assert_eq!(user.email, "a@b.co");
    }
}
