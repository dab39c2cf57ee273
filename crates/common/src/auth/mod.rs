//! Authentication utilities
//!
//! Provides:
//! - Confirmation code generation and digesting
//! - JWT access token generation and validation
//! - Actor extraction from the Authorization header

use crate::db::models::User;
use crate::errors::{AppError, Result};
use crate::services::AccountService;
use axum::{extract::FromRef, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// The caller of an operation: a resolved user, or anonymous
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub user: Option<User>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn authenticated(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn actor(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The authenticated user, or `Unauthorized`
    pub fn require_user(&self) -> Result<&User> {
        self.user.as_ref().ok_or_else(|| AppError::Unauthorized {
            message: "Authentication credentials were not provided".to_string(),
        })
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    pub username: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Token ID
    pub jti: String,
}

impl JwtClaims {
    pub fn user_id(&self) -> Result<i32> {
        self.sub.parse().map_err(|_| AppError::InvalidToken)
    }
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new access token for a user
    pub fn generate_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal {
                message: format!("Failed to generate token: {}", e),
            })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }
}

/// Generate a new confirmation code of `bytes` random bytes, hex encoded
pub fn generate_confirmation_code(bytes: usize) -> String {
    let random_bytes: Vec<u8> = (0..bytes.max(1)).map(|_| rand::random::<u8>()).collect();
    hex::encode(random_bytes)
}

/// Digest a confirmation code for storage
pub fn hash_confirmation_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a supplied code against the stored digest
pub fn verify_confirmation_code(code: &str, stored_hash: &str) -> bool {
    hash_confirmation_code(code) == stored_hash
}

/// Extract the token from a Bearer Authorization header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum extractor for AuthContext.
///
/// No Authorization header means an anonymous actor; a header that does
/// not carry a valid token for an existing user is rejected.
impl<S> FromRequestParts<S> for AuthContext
where
    AccountService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Some(header) = parts.headers.get("authorization") else {
            return Ok(AuthContext::anonymous());
        };

        let header = header.to_str().map_err(|_| AppError::InvalidToken)?;
        let token = extract_bearer(header).ok_or(AppError::InvalidToken)?;

        let accounts = AccountService::from_ref(state);
        let user = accounts.authenticate(token).await?;

        Ok(AuthContext::authenticated(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;

    fn user() -> User {
        User {
            id: 12,
            username: "reader".into(),
            email: "reader@example.com".into(),
            first_name: None,
            last_name: None,
            bio: String::new(),
            role: Role::User,
            is_superuser: false,
            confirmation_code_hash: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_confirmation_code_digest() {
        let code = generate_confirmation_code(16);
        assert_eq!(code.len(), 32);

        let hash = hash_confirmation_code(&code);
        assert!(verify_confirmation_code(&code, &hash));
        assert!(!verify_confirmation_code("wrong_code", &hash));
        assert!(!verify_confirmation_code(&format!("{code} "), &hash));
    }

    #[test]
    fn test_codes_are_random() {
        assert_ne!(generate_confirmation_code(16), generate_confirmation_code(16));
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("abc.def"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);

        let token = manager.generate_token(&user()).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), 12);
        assert_eq!(claims.username, "reader");
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let issuer = JwtManager::new("one_secret", 3600);
        let verifier = JwtManager::new("other_secret", 3600);

        let token = issuer.generate_token(&user()).unwrap();
        assert!(matches!(verifier.validate_token(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_require_user() {
        assert!(matches!(
            AuthContext::anonymous().require_user(),
            Err(AppError::Unauthorized { .. })
        ));
        assert_eq!(AuthContext::authenticated(user()).require_user().unwrap().id, 12);
    }
}
