//! Error types for Maktaba server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Machine-readable error codes sent with every failure response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Failure,
    DbFailure,
    ValidationError,
    BookNotFound,
    MemberNotFound,
    AuthorNotFound,
    LoanNotFound,
    NotBorrowable,
    NoCopiesAvailable,
    AlreadyBorrowed,
    AlreadySubscribed,
    BookAlreadyPublished,
    BookAlreadyUnpublished,
    AlreadyExists,
    StaleVersion,
    BookHasLoans,
    MemberHasLoans,
    AuthorHasBooks,
    AgeRestricted,
    InvalidFileType,
    FileTooLarge,
}

/// Kind of document an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Book,
    Member,
    Author,
    Loan,
}

impl Entity {
    fn not_found_code(self) -> ErrorCode {
        match self {
            Entity::Book => ErrorCode::BookNotFound,
            Entity::Member => ErrorCode::MemberNotFound,
            Entity::Author => ErrorCode::AuthorNotFound,
            Entity::Loan => ErrorCode::LoanNotFound,
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Entity::Book => "Book",
            Entity::Member => "Member",
            Entity::Author => "Author",
            Entity::Loan => "Loan",
        };
        write!(f, "{}", label)
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: String },

    #[error("Conflict: {message}")]
    Conflict { code: ErrorCode, message: String },

    #[error("Validation error: {message}")]
    Validation { code: ErrorCode, message: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Business rule violation: {message}")]
    BusinessRule { code: ErrorCode, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(entity: Entity, id: impl std::fmt::Display) -> Self {
        AppError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            code: ErrorCode::ValidationError,
            message: message.into(),
        }
    }

    /// Optimistic concurrency failure on a versioned save
    pub fn stale(entity: Entity, id: impl std::fmt::Display) -> Self {
        AppError::Conflict {
            code: ErrorCode::StaleVersion,
            message: format!("{} {} was modified concurrently, reload and retry", entity, id),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound { entity, .. } => entity.not_found_code(),
            AppError::Conflict { code, .. }
            | AppError::Validation { code, .. }
            | AppError::BusinessRule { code, .. } => *code,
            AppError::BadRequest(_) => ErrorCode::ValidationError,
            AppError::Database(_) | AppError::Migration(_) => ErrorCode::DbFailure,
            AppError::Io(_) | AppError::Internal(_) => ErrorCode::Failure,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Validation { .. } | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::BusinessRule { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: ErrorCode,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {:?}", self);
            "An unexpected error occurred. Please try again later.".to_string()
        } else {
            match &self {
                AppError::Conflict { message, .. }
                | AppError::Validation { message, .. }
                | AppError::BusinessRule { message, .. } => message.clone(),
                AppError::BadRequest(message) => message.clone(),
                other => other.to_string(),
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            code,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
