use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::{
    error::{AppError, AppResult},
    models::{
        auth::TokenPair,
        user::{validate_username, Credentials},
    },
    routes::json_body,
    AppState,
};

pub async fn sign_up(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> AppResult<Json<TokenPair>> {
    let credentials = json_body(body)?;
    validate_username(&credentials.username).map_err(AppError::Invalid)?;
    if credentials.password.is_empty() {
        return Err(AppError::Invalid("password can't be empty".into()));
    }

    state.auth.sign_up(&credentials).await.map(Json)
}

pub async fn sign_in(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> AppResult<Json<TokenPair>> {
    let credentials = json_body(body)?;
    state.auth.sign_in(&credentials).await.map(Json)
}

pub async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<TokenPair>, JsonRejection>,
) -> AppResult<Json<TokenPair>> {
    let pair = json_body(body)?;
    if pair.access_token.is_empty() {
        return Err(AppError::Invalid("access token can't be empty".into()));
    }
    if pair.refresh_token.is_empty() {
        return Err(AppError::Invalid("refresh token can't be empty".into()));
    }

    state.auth.refresh(&pair).await.map(Json)
}
