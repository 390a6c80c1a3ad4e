use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    error::AppError,
    models::auth::AuthenticatedUser,
    services::access_token::AccessTokenService,
};

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::InvalidToken("missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::InvalidToken("invalid Authorization header format".into()))?;

        let access_tokens = parts
            .extensions
            .get::<AccessTokenService>()
            .ok_or_else(|| AppError::Internal("access token service not configured".into()))?;

        let data = access_tokens.parse(token).map_err(|e| {
            tracing::warn!(error = %e, "access token verification failed");
            e
        })?;

        Ok(AuthenticatedUser {
            username: data.username,
            refresh_token_id: data.refresh_token_id,
        })
    }
}
