//! HS256 token helpers shared by the server and tooling.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token secret is empty")]
    EmptySecret,
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Seconds since the epoch, `ttl` from now.
pub fn expiry_from_now(ttl: Duration) -> usize {
    (Utc::now() + ttl).timestamp().max(0) as usize
}

pub fn issued_now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

pub fn encode<C: Serialize>(claims: &C, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::EmptySecret);
    }
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Decodes and validates signature and `exp`.
pub fn decode<C: DeserializeOwned>(token: &str, secret: &str) -> Result<C, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::EmptySecret);
    }
    let validation = Validation::new(Algorithm::HS256);
    let data = jsonwebtoken::decode::<C>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        JwtError::Invalid(e)
    })?;
    Ok(data.claims)
}
