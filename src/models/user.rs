use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for sign-up and sign-in.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

const MIN_USERNAME_LEN: usize = 4;
const MAX_USERNAME_LEN: usize = 31;

/// Structural username check applied before sign-up: 4 to 31 characters,
/// starting with a latin letter, then latin letters, digits or underscores.
pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(format!(
            "username length must be between {MIN_USERNAME_LEN} and \
             {MAX_USERNAME_LEN} (actual {len})"
        ));
    }

    let first = username.chars().next().unwrap_or_default();
    if !first.is_ascii_alphabetic() {
        return Err("username first character must be a latin letter".into());
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err("username must contain only latin letters, digits and underscores".into());
    }

    Ok(())
}
