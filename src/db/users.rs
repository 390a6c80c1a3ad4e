use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::user::User,
};

/// Credential store. Implementations receive an already-hashed password.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails `AlreadyExists` when the username is taken.
    async fn create(&self, username: &str, password_hash: &str) -> AppResult<Uuid>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<User>;

    async fn get_by_username(&self, username: &str) -> AppResult<User>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, username: &str, password_hash: &str) -> AppResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO users (username, password_hash)
             VALUES ($1, $2)
             RETURNING id",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::AlreadyExists(_) => {
                tracing::warn!(username, "user already exists");
                AppError::AlreadyExists(format!("user {username} already exists"))
            }
            other => other.context("creating user"),
        })
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))
    }

    async fn get_by_username(&self, username: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))
    }
}
