use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::streak::FreezeDenied;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("No freezes available")]
    InsufficientFreezes,

    #[error("Day already has a qualifying log")]
    AlreadyQualifying,

    #[error("Not eligible: {0}")]
    NotEligible(String),

    #[error("Day is already covered by a freeze")]
    DuplicateFreeze,

    #[error("Invalid stored state: {0}")]
    InvalidState(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<FreezeDenied> for AppError {
    fn from(denied: FreezeDenied) -> Self {
        match denied {
            FreezeDenied::InsufficientFreezes => AppError::InsufficientFreezes,
            FreezeDenied::AlreadyQualifying => AppError::AlreadyQualifying,
            FreezeDenied::DuplicateFreeze => AppError::DuplicateFreeze,
            FreezeDenied::NotEligible => AppError::NotEligible(
                "target date must be the gap immediately before the current run".into(),
            ),
        }
    }
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Conflict(_) => "conflict",
            AppError::RateLimited => "rate_limited",
            AppError::InsufficientFreezes => "insufficient_freezes",
            AppError::AlreadyQualifying => "already_qualifying",
            AppError::NotEligible(_) => "not_eligible",
            AppError::DuplicateFreeze => "duplicate_freeze",
            AppError::InvalidState(_) => "invalid_state",
            AppError::Database(_) => "internal",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::InsufficientFreezes | AppError::AlreadyQualifying | AppError::DuplicateFreeze => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::NotEligible(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::InvalidState(msg) => {
                tracing::error!(detail = %msg, "Invalid stored state");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
        };

        let body = json!({
            "error": {
                "code": self.code(),
                "message": message,
                "status": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeze_denials_map_to_their_own_codes() {
        assert_eq!(
            AppError::from(FreezeDenied::InsufficientFreezes).code(),
            "insufficient_freezes"
        );
        assert_eq!(
            AppError::from(FreezeDenied::AlreadyQualifying).code(),
            "already_qualifying"
        );
        assert_eq!(
            AppError::from(FreezeDenied::DuplicateFreeze).code(),
            "duplicate_freeze"
        );
        assert_eq!(
            AppError::from(FreezeDenied::NotEligible).code(),
            "not_eligible"
        );
    }
}
