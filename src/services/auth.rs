use crate::{
    error::{AppError, AppResult},
    models::{
        auth::{AccessTokenData, TokenPair},
        user::{Credentials, User},
    },
    services::{
        access_token::AccessTokenService, refresh_token::RefreshTokenService, users::UserService,
    },
};

/// Sign-up / sign-in / refresh protocol.
///
/// No state lives here: the session state is the set of refresh token rows.
/// Sign-in keeps one active session per user by dropping all of the user's
/// refresh tokens before issuing a new pair.
#[derive(Clone)]
pub struct AuthService {
    access_tokens: AccessTokenService,
    refresh_tokens: RefreshTokenService,
    users: UserService,
}

impl AuthService {
    pub fn new(
        access_tokens: AccessTokenService,
        refresh_tokens: RefreshTokenService,
        users: UserService,
    ) -> Self {
        Self {
            access_tokens,
            refresh_tokens,
            users,
        }
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> AppResult<TokenPair> {
        let user_id = self.users.create(credentials).await.map_err(|e| {
            tracing::warn!(username = %credentials.username, error = %e, "can't create user");
            e
        })?;
        let user = self.users.get_by_id(user_id).await?;

        tracing::info!(username = %user.username, %user_id, "user signed up");
        self.create_token_pair(&user).await
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> AppResult<TokenPair> {
        let user = self.users.verify(credentials).await?;

        match self.refresh_tokens.delete_by_user_id(user.id).await {
            Ok(n) => tracing::debug!(
                username = %user.username,
                removed = n,
                "previous sessions closed"
            ),
            // First sign-in, or every previous token already expired.
            Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e.context("closing previous sessions")),
        }

        self.create_token_pair(&user).await
    }

    /// Rotate a token pair. The consumed refresh token is deleted before the
    /// replacement is created, and only the caller whose delete actually
    /// removed the row gets a new pair. The access token must still be live;
    /// an expired one fails `Expired`.
    pub async fn refresh(&self, pair: &TokenPair) -> AppResult<TokenPair> {
        let access = self.access_tokens.parse(&pair.access_token)?;

        let stored = self
            .refresh_tokens
            .get_by_id(access.refresh_token_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::Expired("refresh token expired".into()),
                other => other,
            })?;

        self.refresh_tokens
            .verify(&pair.refresh_token, &stored.token_hash)
            .await?;

        let user = self.users.get_by_id(stored.user_id).await?;
        if user.username != access.username {
            tracing::warn!(
                refresh_token_id = %stored.id,
                "access token owner does not match refresh token owner"
            );
            return Err(AppError::InvalidToken(
                "token pair does not belong together".into(),
            ));
        }

        self.refresh_tokens
            .delete(stored.id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => {
                    tracing::warn!(
                        refresh_token_id = %stored.id,
                        "refresh token consumed concurrently"
                    );
                    AppError::InvalidToken("refresh token has already been used".into())
                }
                other => other.context("revoking refresh token"),
            })?;

        self.create_token_pair(&user).await
    }

    async fn create_token_pair(&self, user: &User) -> AppResult<TokenPair> {
        let (refresh_token_id, refresh_token) =
            self.refresh_tokens.create(user).await.map_err(|e| {
                tracing::warn!(username = %user.username, error = %e, "can't create refresh token");
                e
            })?;

        let access_token = self
            .access_tokens
            .create(&AccessTokenData {
                username: user.username.clone(),
                refresh_token_id,
            })
            .map_err(|e| {
                tracing::warn!(username = %user.username, error = %e, "can't create access token");
                e
            })?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
