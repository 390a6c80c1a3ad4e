use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Convenience alias for service and handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Error kinds shared by every layer of the API.
///
/// Lower layers pick the kind; upper layers may add context with
/// [`AppError::context`] but never change it. The HTTP boundary maps the kind
/// to a status code and hides the message of `Internal`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Expired(String),

    #[error("{0}")]
    InvalidToken(String),
}

impl AppError {
    /// Prefix the message with `ctx`, keeping the error kind.
    pub fn context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            AppError::Internal(m) => AppError::Internal(format!("{ctx}: {m}")),
            AppError::NotFound(m) => AppError::NotFound(format!("{ctx}: {m}")),
            AppError::AlreadyExists(m) => AppError::AlreadyExists(format!("{ctx}: {m}")),
            AppError::Invalid(m) => AppError::Invalid(format!("{ctx}: {m}")),
            AppError::Expired(m) => AppError::Expired(format!("{ctx}: {m}")),
            AppError::InvalidToken(m) => AppError::InvalidToken(format!("{ctx}: {m}")),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::Invalid(_) => StatusCode::BAD_REQUEST,
            AppError::Expired(_) | AppError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => AppError::NotFound("record not found".into()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::AlreadyExists("record already exists".into())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AppError::NotFound("referenced record not found".into())
            }
            _ => AppError::Internal(format!("database error: {e}")),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_kind() {
        let err = AppError::NotFound("user not found".into()).context("sign in");
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), "sign in: user not found");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::AlreadyExists("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::Invalid("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Expired("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidToken("x".into()).status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn internal_message_is_hidden() {
        let resp = AppError::Internal("connection refused on 10.0.0.3".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
