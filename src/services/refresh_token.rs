use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use chrono::Duration;
use rand::{rngs::OsRng, RngCore};
use uuid::Uuid;

use crate::{
    clock::Clock,
    db::refresh_tokens::RefreshTokenRepository,
    error::{AppError, AppResult},
    models::{auth::RefreshToken, user::User},
};

/// Size of the random refresh secret before encoding.
const REFRESH_TOKEN_BYTES: usize = 32;

/// Generates, stores and checks refresh tokens. Only bcrypt hashes reach the
/// repository; the plaintext leaves through [`RefreshTokenService::create`]
/// and nowhere else.
#[derive(Clone)]
pub struct RefreshTokenService {
    repo: Arc<dyn RefreshTokenRepository>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    bcrypt_cost: u32,
}

impl RefreshTokenService {
    pub fn new(
        repo: Arc<dyn RefreshTokenRepository>,
        clock: Arc<dyn Clock>,
        ttl_minutes: i64,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            repo,
            clock,
            ttl: Duration::minutes(ttl_minutes),
            bcrypt_cost,
        }
    }

    /// Returns `(id, plaintext)`.
    pub async fn create(&self, user: &User) -> AppResult<(Uuid, String)> {
        let token = generate_secret();
        let cost = self.bcrypt_cost;
        let plaintext = token.clone();
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await?
            .map_err(|e| {
                tracing::warn!(error = %e, "can't hash refresh token");
                AppError::Internal(format!("can't hash refresh token: {e}"))
            })?;

        let expires_at = self.clock.now() + self.ttl;
        let id = self.repo.create(user.id, &hash, expires_at).await?;
        Ok((id, token))
    }

    /// Fails `Expired` for a row past its expiry; such rows are never handed
    /// out, even if the reaper has not removed them yet.
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<RefreshToken> {
        let token = self.repo.get_by_id(id).await.map_err(|e| {
            if matches!(e, AppError::NotFound(_)) {
                tracing::warn!(refresh_token_id = %id, "refresh token not found");
            }
            e
        })?;

        if token.expires_at <= self.clock.now() {
            tracing::warn!(refresh_token_id = %id, "refresh token expired");
            return Err(AppError::Expired("refresh token expired".into()));
        }
        Ok(token)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repo.delete(id).await
    }

    /// Returns how many tokens were removed; `NotFound` when there were none.
    pub async fn delete_by_user_id(&self, user_id: Uuid) -> AppResult<u64> {
        self.repo.delete_by_user_id(user_id).await
    }

    pub async fn verify(&self, token: &str, token_hash: &str) -> AppResult<()> {
        let token = token.to_string();
        let token_hash = token_hash.to_string();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(token, &token_hash))
            .await?
            .unwrap_or(false);

        if !matches {
            tracing::warn!("refresh token does not match stored hash");
            return Err(AppError::InvalidToken(
                "refresh token has been modified or corrupted".into(),
            ));
        }
        Ok(())
    }

    pub async fn sweep_expired(&self) -> AppResult<u64> {
        self.repo.delete_expired(self.clock.now()).await
    }
}

fn generate_secret() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    STANDARD_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_unique_and_sized() {
        let a = generate_secret();
        let b = generate_secret();
        assert_ne!(a, b);
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(a.len(), 43);
        assert_eq!(STANDARD_NO_PAD.decode(&a).unwrap().len(), REFRESH_TOKEN_BYTES);
    }
}
