//! # Error Types
//!
//! Domain-specific error types for depot-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  depot-core errors (this file)                                         │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Header / item field failures                   │
//! │                                                                         │
//! │  depot-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures                               │
//! │                                                                         │
//! │  depot-posting errors                                                  │
//! │  └── PostingError     - Closed set the caller sees                     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                              DbError ┴─► PostingError → caller         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::DocumentStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations detectable without storage.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A lifecycle transition was requested from the wrong state.
    ///
    /// ## When This Occurs
    /// - Post on a posted or canceled document
    /// - Cancel on a draft or canceled document
    /// - Editing a document that left draft
    #[error("Document {document_id} is {from}, cannot move to {to}")]
    IllegalTransition {
        document_id: String,
        from: DocumentStatus,
        to: DocumentStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors for document headers and lines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., unparsable decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Two fields that must differ are equal.
    #[error("{field} must differ from {other}")]
    MustDiffer { field: String, other: String },

    /// Numeric value is beyond the accepted magnitude, or a running total
    /// would leave the decimal range.
    #[error("{field} is out of range")]
    OutOfRange { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// The document has no lines.
    #[error("document has no items")]
    EmptyItems,

    /// The referenced base document is not usable.
    #[error("base document {id}: {reason}")]
    InvalidBaseDocument { id: String, reason: String },
}

impl ValidationError {
    /// Creates a Required error.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an OutOfRange error.
    pub fn out_of_range(field: impl Into<String>) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_transition_message() {
        let err = CoreError::IllegalTransition {
            document_id: "doc-1".to_string(),
            from: DocumentStatus::Canceled,
            to: DocumentStatus::Posted,
        };
        assert_eq!(
            err.to_string(),
            "Document doc-1 is canceled, cannot move to posted"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("warehouse_id").to_string(),
            "warehouse_id is required"
        );
        assert_eq!(
            ValidationError::MustDiffer {
                field: "to_warehouse_id".to_string(),
                other: "warehouse_id".to_string(),
            }
            .to_string(),
            "to_warehouse_id must differ from warehouse_id"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::EmptyItems.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
