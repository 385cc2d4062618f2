use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::{AppError, AppResult},
};

#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: i32,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing/verification keys, built once at startup and carried in
/// `AppState` rather than read from a global.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds: ttl_hours * 3_600,
        }
    }

    pub fn issue(&self, user_id: i32) -> AppResult<String> {
        let now = jiff::Timestamp::now().as_second();
        let claims = Claims { sub: user_id, iat: now, exp: now + self.ttl_seconds };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AppError::Internal(anyhow::Error::new(err)))
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized)
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("failed to hash password: {err}"))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|err| anyhow::anyhow!("stored hash invalid: {err}"))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

/// Verified caller identity. Movie routes take this as an extractor; the
/// core never sees the token.
pub struct AuthUser {
    pub user_id: i32,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
        let claims = state.auth.verify(token)?;
        Ok(AuthUser { user_id: claims.sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_claims() {
        let keys = TokenKeys::new("test-secret", 1);
        let token = keys.issue(42).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.exp - claims.iat, 3_600);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let keys = TokenKeys::new("test-secret", 1);
        let other = TokenKeys::new("other-secret", 1);
        let token = other.issue(42).unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::Unauthorized)));
        assert!(matches!(keys.verify("garbage"), Err(AppError::Unauthorized)));
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("hunter22!").unwrap();
        assert!(verify_password("hunter22!", &hash).unwrap());
        assert!(!verify_password("hunter23!", &hash).unwrap());
    }
}
