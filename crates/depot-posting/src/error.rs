//! # Posting Error Type
//!
//! The closed set of failures a caller of the posting engine can see.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow                                           │
//! │                                                                         │
//! │  ValidationError ──────────────────────────► Validation                │
//! │  CoreError::IllegalTransition ─────────────► IllegalTransition         │
//! │  strategy / reservation checks ────────────► InsufficientStock         │
//! │                                               InsufficientReservation   │
//! │                                               IntegrityViolation        │
//! │  DbError::NotFound ────────────────────────► NotFound                  │
//! │  DbError::LockTimeout / Unique / Pool ─────► Conflict                  │
//! │  any other DbError ────────────────────────► Storage (message fixed,   │
//! │                                               driver text only as       │
//! │                                               source())                 │
//! │                                                                         │
//! │  Any error inside a posting transaction drops the Tx → rollback.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use depot_core::{Amount, CoreError, DocumentStatus, ValidationError};
use depot_db::DbError;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    IllegalTransition,
    InsufficientStock,
    InsufficientReservation,
    IntegrityViolation,
    NotFound,
    Conflict,
    StorageError,
}

impl ErrorCode {
    /// The code as a string, e.g. `"INSUFFICIENT_STOCK"`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::IllegalTransition => "ILLEGAL_TRANSITION",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::InsufficientReservation => "INSUFFICIENT_RESERVATION",
            ErrorCode::IntegrityViolation => "INTEGRITY_VIOLATION",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::StorageError => "STORAGE_ERROR",
        }
    }
}

/// Posting engine errors.
#[derive(Debug, Error)]
pub enum PostingError {
    /// Missing or invalid header or item fields.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Post on a non-draft, cancel on a non-posted, edit of a non-draft.
    #[error("Document {document_id} is {from}, cannot move to {to}")]
    IllegalTransition {
        document_id: String,
        from: DocumentStatus,
        to: DocumentStatus,
    },

    /// An issue would take more than is available.
    #[error("Insufficient stock of {variant_id} at {warehouse_id}: available {available}, requested {requested}")]
    InsufficientStock {
        warehouse_id: String,
        variant_id: String,
        available: Amount,
        requested: Amount,
    },

    /// A reservation would go below zero.
    #[error("Reservation of {variant_id} at {warehouse_id} is {reserved}, cannot release {requested}")]
    InsufficientReservation {
        warehouse_id: String,
        variant_id: String,
        reserved: Amount,
        requested: Amount,
    },

    /// Stored state contradicts what a revert expects.
    ///
    /// ## When This Occurs
    /// - Cancelling a FIFO income whose lots were partly issued
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    /// Document, variant or warehouse missing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Lock wait timed out or a concurrent writer won a race. Retry.
    #[error("Conflicting concurrent update, retry: {0}")]
    Conflict(String),

    /// Any other storage failure.
    #[error("storage operation failed")]
    Storage(#[source] DbError),
}

impl PostingError {
    /// Machine-readable code of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PostingError::Validation(_) => ErrorCode::ValidationError,
            PostingError::IllegalTransition { .. } => ErrorCode::IllegalTransition,
            PostingError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            PostingError::InsufficientReservation { .. } => ErrorCode::InsufficientReservation,
            PostingError::IntegrityViolation(_) => ErrorCode::IntegrityViolation,
            PostingError::NotFound { .. } => ErrorCode::NotFound,
            PostingError::Conflict(_) => ErrorCode::Conflict,
            PostingError::Storage(_) => ErrorCode::StorageError,
        }
    }

    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        PostingError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InsufficientStock error.
    pub fn insufficient_stock(
        warehouse_id: &str,
        variant_id: &str,
        available: Amount,
        requested: Amount,
    ) -> Self {
        PostingError::InsufficientStock {
            warehouse_id: warehouse_id.to_string(),
            variant_id: variant_id.to_string(),
            available,
            requested,
        }
    }
}

impl From<CoreError> for PostingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::IllegalTransition { document_id, from, to } => {
                PostingError::IllegalTransition { document_id, from, to }
            }
            CoreError::Validation(e) => PostingError::Validation(e),
        }
    }
}

impl From<DbError> for PostingError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => PostingError::NotFound { entity, id },
            DbError::LockTimeout(_) => PostingError::Conflict("lock wait timed out".to_string()),
            DbError::UniqueViolation { field, .. } => {
                PostingError::Conflict(format!("concurrent insert on {field}"))
            }
            DbError::PoolExhausted => PostingError::Conflict("no free connection".to_string()),
            other => PostingError::Storage(other),
        }
    }
}

/// Result type for posting operations.
pub type PostingResult<T> = Result<T, PostingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_codes() {
        assert_eq!(PostingError::Conflict("x".into()).code().as_str(), "CONFLICT");
        assert_eq!(
            PostingError::from(ValidationError::EmptyItems).code(),
            ErrorCode::ValidationError
        );
    }

    #[test]
    fn test_db_error_mapping() {
        assert!(matches!(
            PostingError::from(DbError::LockTimeout("database is locked".into())),
            PostingError::Conflict(_)
        ));
        assert!(matches!(
            PostingError::from(DbError::duplicate("stock_balances.warehouse_id", "?")),
            PostingError::Conflict(_)
        ));
        assert!(matches!(
            PostingError::from(DbError::not_found("Document", "d-1")),
            PostingError::NotFound { .. }
        ));
    }

    #[test]
    fn test_storage_error_hides_driver_text() {
        let err = PostingError::from(DbError::QueryFailed("no such column: qty".into()));
        assert_eq!(err.to_string(), "storage operation failed");
        assert!(err.source().unwrap().to_string().contains("no such column"));
    }

    #[test]
    fn test_illegal_transition_from_core() {
        let err = PostingError::from(
            DocumentStatus::Canceled
                .transition(DocumentStatus::Posted, "d-1")
                .unwrap_err(),
        );
        assert_eq!(err.code(), ErrorCode::IllegalTransition);
        assert_eq!(err.to_string(), "Document d-1 is canceled, cannot move to posted");
    }

    #[test]
    fn test_code_serializes_screaming() {
        let json = serde_json::to_string(&ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}
