use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Business and boundary errors surfaced by use cases. Controllers never
/// build status codes by hand; everything goes through `IntoResponse` here.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email already registered")]
    UserAlreadyExists,
    #[error("User not found")]
    UserNotFound,
    #[error("News not found")]
    NewsNotFound,
    #[error("Invalid category IDs: {}", format_ids(.0))]
    InvalidCategoryIds(Vec<i32>),
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Invalid token provided")]
    InvalidToken,
    #[error("Token is malformed")]
    TokenMalformed,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn format_ids(ids: &[i32]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidCategoryIds(_) | ApiError::EmptyName => {
                StatusCode::BAD_REQUEST
            }
            ApiError::InvalidCredentials
            | ApiError::TokenExpired
            | ApiError::InvalidToken
            | ApiError::TokenMalformed => StatusCode::UNAUTHORIZED,
            ApiError::UserAlreadyExists => StatusCode::CONFLICT,
            ApiError::UserNotFound | ApiError::NewsNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable codes for auth failures so clients can distinguish
    /// "re-login" from "reject outright".
    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::TokenExpired => Some("TOKEN_EXPIRED"),
            ApiError::InvalidToken => Some("INVALID_TOKEN"),
            ApiError::TokenMalformed => Some("TOKEN_MALFORMED"),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Never leak internals to the client; the detail goes to the log.
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: message,
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_category_ids_are_named_in_message() {
        let err = ApiError::InvalidCategoryIds(vec![7, 999]);
        assert_eq!(err.to_string(), "Invalid category IDs: 7, 999");
    }

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::UserAlreadyExists.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::EmptyName.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn internal_error_hides_detail() {
        let err = ApiError::Internal(anyhow::anyhow!("db exploded at 127.0.0.1"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
