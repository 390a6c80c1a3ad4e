#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use product_catalog::{
    clock::{Clock, ManualClock},
    db::{refresh_tokens::RefreshTokenRepository, users::UserRepository},
    error::{AppError, AppResult},
    models::{auth::RefreshToken, user::User},
    services::{
        access_token::AccessTokenService, auth::AuthService, refresh_token::RefreshTokenService,
        users::UserService,
    },
};

pub const SECRET: &str = "test-secret";
pub const ACCESS_TTL_MINUTES: i64 = 15;
pub const REFRESH_TTL_MINUTES: i64 = 60;
// Lowest cost bcrypt accepts; keeps the suite fast.
pub const BCRYPT_COST: u32 = 4;

#[derive(Default)]
pub struct MemoryUsers {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUsers {
    pub fn exists(&self, id: Uuid) -> bool {
        self.users.lock().unwrap().contains_key(&id)
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn create(&self, username: &str, password_hash: &str) -> AppResult<Uuid> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.username == username) {
            return Err(AppError::AlreadyExists(format!("user {username} already exists")));
        }
        let id = Uuid::new_v4();
        users.insert(
            id,
            User {
                id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        self.users
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))
    }

    async fn get_by_username(&self, username: &str) -> AppResult<User> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("user {username} not found")))
    }
}

pub struct MemoryRefreshTokens {
    users: Arc<MemoryUsers>,
    tokens: Mutex<HashMap<Uuid, RefreshToken>>,
}

impl MemoryRefreshTokens {
    pub fn new(users: Arc<MemoryUsers>) -> Self {
        Self {
            users,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub fn all(&self) -> Vec<RefreshToken> {
        self.tokens.lock().unwrap().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryRefreshTokens {
    async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Uuid> {
        if !self.users.exists(user_id) {
            return Err(AppError::NotFound(format!("user {user_id} not found")));
        }
        let id = Uuid::new_v4();
        self.tokens.lock().unwrap().insert(
            id,
            RefreshToken {
                id,
                user_id,
                token_hash: token_hash.to_string(),
                expires_at,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<RefreshToken> {
        self.tokens
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("refresh token {id} not found")))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.tokens
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("refresh token {id} not found")))
    }

    async fn delete_by_user_id(&self, user_id: Uuid) -> AppResult<u64> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| t.user_id != user_id);
        let removed = (before - tokens.len()) as u64;
        if removed == 0 {
            return Err(AppError::NotFound(format!("no refresh tokens for user {user_id}")));
        }
        Ok(removed)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at > now);
        Ok((before - tokens.len()) as u64)
    }
}

/// Auth stack wired to in-memory stores and a manual clock.
pub struct Harness {
    pub clock: ManualClock,
    pub users: Arc<MemoryUsers>,
    pub tokens: Arc<MemoryRefreshTokens>,
    pub access_tokens: AccessTokenService,
    pub refresh_tokens: RefreshTokenService,
    pub auth: AuthService,
}

impl Harness {
    pub fn new() -> Self {
        let clock = ManualClock::default();
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let users = Arc::new(MemoryUsers::default());
        let tokens = Arc::new(MemoryRefreshTokens::new(users.clone()));

        let access_tokens =
            AccessTokenService::new(SECRET, ACCESS_TTL_MINUTES, shared_clock.clone());
        let refresh_tokens = RefreshTokenService::new(
            tokens.clone(),
            shared_clock,
            REFRESH_TTL_MINUTES,
            BCRYPT_COST,
        );
        let auth = AuthService::new(
            access_tokens.clone(),
            refresh_tokens.clone(),
            UserService::new(users.clone(), BCRYPT_COST),
        );

        Self {
            clock,
            users,
            tokens,
            access_tokens,
            refresh_tokens,
            auth,
        }
    }
}
