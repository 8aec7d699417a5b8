//! Bearer token codec: issue and verify signed, time-limited tokens.
//!
//! Tokens are stateless HMAC-signed JWTs. There is no revocation list;
//! a token stays valid until `exp` no matter what happens server side.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;

/// What's inside the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id.
    pub user_id: i32,
    /// Subject's email address.
    pub email: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is missing")]
    Missing,

    #[error("Invalid token")]
    Malformed,

    #[error("Token has expired")]
    Expired,

    #[error("unsupported token algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("failed to sign token: {0}")]
    Encode(String),
}

/// Map a configured algorithm name onto a symmetric JWT algorithm.
pub fn parse_algorithm(name: &str) -> Option<Algorithm> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Some(Algorithm::HS256),
        "HS384" => Some(Algorithm::HS384),
        "HS512" => Some(Algorithm::HS512),
        _ => None,
    }
}

/// Issues and verifies tokens with one process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl TokenCodec {
    pub fn new(secret: &str, algorithm: Algorithm, ttl_secs: i64) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, TokenError> {
        let algorithm = parse_algorithm(&config.jwt_algorithm)
            .ok_or_else(|| TokenError::UnsupportedAlgorithm(config.jwt_algorithm.clone()))?;
        Ok(Self::new(&config.jwt_secret, algorithm, config.token_ttl_secs))
    }

    /// Default lifetime for tokens issued at login.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a token valid for `ttl_secs` from now.
    pub fn issue(&self, user_id: i32, email: &str, ttl_secs: i64) -> Result<String, TokenError> {
        self.issue_at(user_id, email, ttl_secs, Utc::now().timestamp())
    }

    /// Issue a token as if the clock read `now`.
    pub fn issue_at(
        &self,
        user_id: i32,
        email: &str,
        ttl_secs: i64,
        now: i64,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            user_id,
            email: email.to_string(),
            iat: now,
            exp: now.saturating_add(ttl_secs),
        };
        jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Verify signature, structure and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify as if the clock read `now`. Expired when `now >= exp`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Missing);
        }

        let mut validation = Validation::new(self.algorithm);
        // Expiry is checked below without leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Malformed)?;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
