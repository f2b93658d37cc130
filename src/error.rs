//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Caller-facing category for a database constraint failure. Raw database
/// error text never reaches the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    Check,
    ForeignKey,
    NotNull,
    Unique,
}

impl ConstraintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::Check => "check constraint violation",
            ConstraintKind::ForeignKey => "foreign key violation",
            ConstraintKind::NotNull => "required field missing",
            ConstraintKind::Unique => "duplicate record",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid table: {0}")]
    InvalidTable(String),
    #[error("no schema for table {0}")]
    NoSchema(String),
    #[error("no primary key for table {0}")]
    NoPrimaryKey(String),
    #[error("invalid column: {0}")]
    InvalidColumn(String),
    #[error("invalid {expected} format for {field}: {value}")]
    InvalidFormat {
        field: String,
        expected: &'static str,
        value: String,
    },
    #[error("records list cannot be empty")]
    EmptyPayload,
    #[error("insert failed for {0}")]
    InsertFailed(String),
    #[error("record not found")]
    NotFound,
    #[error("no columns to update")]
    NoColumnsToUpdate,
    #[error("{}", .0.as_str())]
    Constraint(ConstraintKind),
    #[error("main entity {0} did not appear in wizard steps")]
    MissingMainEntity(String),
    #[error("auth: {0}")]
    Auth(String),
    #[error("config: {0}")]
    Config(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database error")]
    Db(#[source] sqlx::Error),
}

impl AppError {
    /// Translate a sqlx error into a constraint category where the SQLSTATE
    /// identifies one; everything else stays a generic database error.
    pub fn from_db(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = e {
            match db.code().as_deref() {
                Some("23502") => return AppError::Constraint(ConstraintKind::NotNull),
                Some("23503") => return AppError::Constraint(ConstraintKind::ForeignKey),
                Some("23505") => return AppError::Constraint(ConstraintKind::Unique),
                Some("23514") => return AppError::Constraint(ConstraintKind::Check),
                _ => {}
            }
        }
        AppError::Db(e)
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::InvalidTable(_) => (StatusCode::BAD_REQUEST, "invalid_table"),
            AppError::NoSchema(_) => (StatusCode::INTERNAL_SERVER_ERROR, "no_schema"),
            AppError::NoPrimaryKey(_) => (StatusCode::INTERNAL_SERVER_ERROR, "no_primary_key"),
            AppError::InvalidColumn(_) => (StatusCode::BAD_REQUEST, "invalid_column"),
            AppError::InvalidFormat { .. } => (StatusCode::BAD_REQUEST, "invalid_format"),
            AppError::EmptyPayload => (StatusCode::BAD_REQUEST, "empty_payload"),
            AppError::InsertFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "insert_failed"),
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            AppError::NoColumnsToUpdate => (StatusCode::BAD_REQUEST, "no_columns_to_update"),
            AppError::Constraint(kind) => match kind {
                ConstraintKind::Check | ConstraintKind::NotNull => {
                    (StatusCode::BAD_REQUEST, "constraint_violation")
                }
                ConstraintKind::ForeignKey | ConstraintKind::Unique => {
                    (StatusCode::CONFLICT, "constraint_violation")
                }
            },
            AppError::MissingMainEntity(_) => (StatusCode::BAD_REQUEST, "missing_main_entity"),
            AppError::Auth(_) => (StatusCode::UNAUTHORIZED, "auth_error"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Db(e) => {
                tracing::error!(error = %e, "database failure");
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
        };
        // Internal failures keep their detail in the log only.
        let message = match &self {
            AppError::Db(_) => "operation failed".to_string(),
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}
