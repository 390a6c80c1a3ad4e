use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::users::UserRepository,
    error::{AppError, AppResult},
    models::user::{Credentials, User},
};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, bcrypt_cost: u32) -> Self {
        Self { repo, bcrypt_cost }
    }

    /// Hash the password on the blocking pool, then store the user.
    pub async fn create(&self, credentials: &Credentials) -> AppResult<Uuid> {
        let password = credentials.password.clone();
        let cost = self.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await?
            .map_err(|e| {
                tracing::warn!(error = %e, "can't hash password");
                AppError::Internal(format!("can't hash password: {e}"))
            })?;

        self.repo.create(&credentials.username, &hash).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        self.repo.get_by_id(id).await
    }

    pub async fn get_by_username(&self, username: &str) -> AppResult<User> {
        self.repo.get_by_username(username).await
    }

    /// Look the user up and compare the password. A wrong password is
    /// `InvalidToken`; an unknown username is `NotFound`.
    pub async fn verify(&self, credentials: &Credentials) -> AppResult<User> {
        let user = self.get_by_username(&credentials.username).await.map_err(|e| {
            tracing::warn!(username = %credentials.username, error = %e, "user lookup failed");
            e
        })?;

        let password = credentials.password.clone();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await?
            .map_err(|e| AppError::Internal(format!("can't compare passwords: {e}")))?;

        if !matches {
            tracing::warn!(username = %credentials.username, "password mismatch");
            return Err(AppError::InvalidToken("invalid username or password".into()));
        }
        Ok(user)
    }
}
