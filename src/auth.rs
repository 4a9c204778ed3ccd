//! Bearer token auth
//!
//! Issues and validates JWTs whose subject is the username, and digests
//! passwords with salted SHA-256. Routes consume the caller identity through
//! the [`CallerIdentity`] extractor; everything downstream (including the
//! upload engine) only ever sees the opaque username string.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// JWT claims: subject username plus issue/expiry timestamps
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Token service, constructed once at startup and shared through app state
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: i64,
}

impl AuthService {
    pub fn new(secret: &str, token_ttl: i64) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                token_ttl,
            }),
        }
    }

    /// Issue a token for a username
    pub fn issue_token(&self, username: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.inner.token_ttl)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.inner.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Validate a token and return the username it was issued to
    pub fn verify_token(&self, token: &str) -> Result<String, AppError> {
        let data = decode::<Claims>(token, &self.inner.decoding, &Validation::default())
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
        Ok(data.claims.sub)
    }
}

// ============================================================================
// Password digests
// ============================================================================

/// Random per-user salt
pub fn generate_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Salted SHA-256 digest, hex-encoded
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}

// ============================================================================
// Extractor
// ============================================================================

/// The authenticated caller's username, extracted from the
/// `Authorization: Bearer` header. Rejects with 401 when the header is
/// missing or the token does not verify.
pub struct CallerIdentity(pub String);

#[async_trait]
impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Expected a bearer token".to_string()))?;

        let username = state.auth().verify_token(token)?;
        Ok(CallerIdentity(username))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip_returns_the_subject() {
        let auth = AuthService::new("test-secret", 3600);
        let token = auth.issue_token("alice").unwrap();
        assert_eq!(auth.verify_token(&token).unwrap(), "alice");
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let auth = AuthService::new("secret-a", 3600);
        let other = AuthService::new("secret-b", 3600);
        let token = other.issue_token("alice").unwrap();
        assert!(auth.verify_token(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Issue well past the default validation leeway
        let auth = AuthService::new("test-secret", -300);
        let token = auth.issue_token("alice").unwrap();
        assert!(auth.verify_token(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let auth = AuthService::new("test-secret", 3600);
        assert!(auth.verify_token("not-a-token").is_err());
    }

    #[test]
    fn password_digest_verifies_with_its_salt_only() {
        let salt = generate_salt();
        let digest = hash_password("hunter2", &salt);

        assert!(verify_password("hunter2", &salt, &digest));
        assert!(!verify_password("hunter3", &salt, &digest));
        assert!(!verify_password("hunter2", &generate_salt(), &digest));
    }
}
