use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::auth::RefreshToken,
};

/// Persistence for refresh token rows.
///
/// Deletes are conditional: `delete` and `delete_by_user_id` report
/// `NotFound` when nothing was removed, which is how two concurrent
/// consumers of the same token are told apart. Expiry is *not* checked
/// here; `get_by_id` returns the row as stored and the service decides.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Fails `AlreadyExists` on an id collision and `NotFound` when the user
    /// does not exist.
    async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Uuid>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<RefreshToken>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    async fn delete_by_user_id(&self, user_id: Uuid) -> AppResult<u64>;

    /// Remove every row with `expires_at <= now`; returns how many went.
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::AlreadyExists(_) => {
                tracing::warn!(%user_id, "refresh token id collision");
                AppError::AlreadyExists("refresh token already exists".into())
            }
            AppError::NotFound(_) => {
                tracing::warn!(%user_id, "refresh token owner not found");
                AppError::NotFound("user not found".into())
            }
            other => other.context("creating refresh token"),
        })
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<RefreshToken> {
        sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token_hash, expires_at, created_at
             FROM refresh_tokens WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from(e).context("getting refresh token"))?
        .ok_or_else(|| AppError::NotFound("refresh token not found".into()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from(e).context("deleting refresh token"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("refresh token not found".into()));
        }
        Ok(())
    }

    async fn delete_by_user_id(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from(e).context("deleting refresh tokens"))?;

        match result.rows_affected() {
            0 => Err(AppError::NotFound("refresh token not found".into())),
            n => Ok(n),
        }
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from(e).context("deleting expired refresh tokens"))?;
        Ok(result.rows_affected())
    }
}
