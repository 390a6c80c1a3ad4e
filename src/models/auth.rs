use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Claims embedded in the JWT access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub refresh_token_id: Uuid, // binds the access token to one refresh token row
    pub exp: usize,
}

/// What an access token carries, without the expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenData {
    pub username: String,
    pub refresh_token_id: Uuid,
}

impl From<Claims> for AccessTokenData {
    fn from(c: Claims) -> Self {
        Self {
            username: c.username,
            refresh_token_id: c.refresh_token_id,
        }
    }
}

/// Stored refresh token row. `token_hash` is a bcrypt hash; the plaintext
/// secret is only ever held by the client.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Access/refresh pair returned by sign-up, sign-in and refresh, and accepted
/// by refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenPair { .. }")
    }
}

/// Set on requests that passed the bearer-token check.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
    pub refresh_token_id: Uuid,
}
