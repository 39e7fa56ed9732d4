//! Authentication Service
//!
//! Verifies the bearer tokens issued by the REST layer. Tokens are HS256 JWTs
//! signed with the shared `jwt.secret`; the subject is the user's UUID.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;
use crate::domain::{User, UserId, UserRepository};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    #[serde(rename = "userId", alias = "sub")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token not provided")]
    MissingToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Token verification and subject resolution
pub struct TokenVerifier {
    users: Arc<dyn UserRepository>,
    jwt_settings: JwtSettings,
}

impl TokenVerifier {
    pub fn new(users: Arc<dyn UserRepository>, jwt_settings: JwtSettings) -> Self {
        Self {
            users,
            jwt_settings,
        }
    }

    /// Decode and validate a token, returning its subject.
    pub fn validate_token(&self, token: &str) -> Result<UserId, AuthError> {
        let claims = self.decode_token(token)?;

        claims
            .user_id
            .parse::<UserId>()
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Validate a token and load the user it names.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<User, AuthError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        let user_id = self.validate_token(token)?;

        self.users
            .find_by_id(user_id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::UserNotFound)
    }

    /// Sign a token for `user`. The REST layer issues tokens in production;
    /// this is used by tooling and tests.
    pub fn issue(&self, user: &User, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user.id.to_string(),
            username: Some(user.username.clone()),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_settings.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Token encoding failed: {}", e)))
    }

    fn decode_token(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_settings.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        Ok(token_data.claims)
    }
}
