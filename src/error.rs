//! Error types for the clinic booking server

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned when a required booking field is absent
pub const MISSING_FIELDS: &str = "Missing required fields";

/// Message returned when the requested slot is already held
pub const SLOT_TAKEN: &str = "This time slot is already booked. Please select another time.";

/// Application error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchData = 4,
    BadValue = 5,
    SlotTaken = 6,
    Duplicate = 7,
    InvalidTransition = 8,
    NotPersisted = 9,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The (doctor, instant) pair is held by a pending or confirmed booking
    #[error("Slot conflict")]
    SlotConflict,

    /// Another booking already carries this reference
    #[error("Duplicate booking reference: {0}")]
    DuplicateReference(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    /// The booking insert itself failed; nothing was written
    #[error("Booking was not persisted")]
    BookingNotPersisted,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
}

impl AppError {
    pub fn missing_fields() -> Self {
        AppError::Validation(MISSING_FIELDS.to_string())
    }

    fn parts(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::SlotConflict => {
                (StatusCode::CONFLICT, ErrorCode::SlotTaken, SLOT_TAKEN.to_string())
            }
            AppError::DuplicateReference(reference) => (
                StatusCode::CONFLICT,
                ErrorCode::Duplicate,
                format!("Booking reference {} is already in use", reference),
            ),
            AppError::InvalidTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::InvalidTransition,
                msg.clone(),
            ),
            AppError::BookingNotPersisted => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::NotPersisted,
                "Failed to create booking".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Internal server error".to_string(),
                )
            }
            AppError::Notification(msg) | AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(ErrorResponse {
            code: code as u32,
            error: message,
        });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_and_conflict_are_distinct_client_errors() {
        let validation = AppError::missing_fields();
        let conflict = AppError::SlotConflict;

        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_storage_errors_hide_details() {
        let (status, code, message) = AppError::Database(sqlx::Error::PoolTimedOut).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, ErrorCode::DbFailure);
        assert_eq!(message, "Internal server error");

        let (_, _, message) = AppError::BookingNotPersisted.parts();
        assert_eq!(message, "Failed to create booking");
    }

    #[test]
    fn test_slot_conflict_message() {
        let (_, _, message) = AppError::SlotConflict.parts();
        assert_eq!(message, SLOT_TAKEN);
    }
}
