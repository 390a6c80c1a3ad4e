use axum::{extract::rejection::JsonRejection, Json};

use crate::error::{AppError, AppResult};

pub mod auth;
pub mod categories;
pub mod health;
pub mod products;

/// Unwraps a JSON body, turning any extractor rejection into a 400.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected request body");
            Err(AppError::Invalid("invalid json structure".into()))
        }
    }
}
