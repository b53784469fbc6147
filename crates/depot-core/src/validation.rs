//! # Validation Module
//!
//! Header and line validation for documents.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: validate_draft (create / update)                             │
//! │  ├── type present, items well-formed                                   │
//! │  └── no negative quantities or prices                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: validate_for_posting (inside the posting transaction)        │
//! │  └── per-type header preconditions, see table below                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign keys to the catalog                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Posting Preconditions
//! ```text
//! ┌──────────────┬────────────────────────────────┬───────────────────────┐
//! │ Type         │ Header                          │ Items                 │
//! ├──────────────┼────────────────────────────────┼───────────────────────┤
//! │ INCOME       │ warehouse                       │ qty > 0, price ≥ 0    │
//! │              │                                 │ (price required FIFO) │
//! │ OUTCOME      │ warehouse                       │ qty > 0               │
//! │ ORDER        │ warehouse                       │ qty > 0               │
//! │ TRANSFER     │ warehouse ≠ to_warehouse        │ qty > 0               │
//! │ INVENTORY    │ warehouse                       │ qty ≥ 0 (target)      │
//! │ PRICE_UPDATE │ price type                      │ price present         │
//! └──────────────┴────────────────────────────────┴───────────────────────┘
//! ```

use crate::decimal::Amount;
use crate::error::ValidationError;
use crate::types::{AccountingPolicy, Document, DocumentDraft, DocumentType};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a document comment.
pub const MAX_COMMENT_LEN: usize = 1000;

/// Maximum length of a search string.
pub const MAX_QUERY_LEN: usize = 100;

// =============================================================================
// Draft Validation
// =============================================================================

/// Validates the shape of a draft before it is stored.
///
/// Only checks what can never become valid later. Header preconditions
/// that depend on the document type are enforced at posting time so that
/// a draft can be saved half-filled.
///
/// ## Example
/// ```rust
/// use depot_core::types::{DocumentDraft, DocumentType, DraftItem};
/// use depot_core::validation::validate_draft;
///
/// let draft = DocumentDraft {
///     doc_type: Some(DocumentType::Income),
///     warehouse_id: Some("wh-1".into()),
///     items: vec![DraftItem::new("v-1", 10).with_price(100)],
///     ..Default::default()
/// };
/// assert!(validate_draft(&draft).is_ok());
/// ```
pub fn validate_draft(draft: &DocumentDraft) -> ValidationResult<DocumentType> {
    let doc_type = draft.doc_type.ok_or_else(|| ValidationError::required("type"))?;

    if draft.comment.chars().count() > MAX_COMMENT_LEN {
        return Err(ValidationError::TooLong {
            field: "comment".to_string(),
            max: MAX_COMMENT_LEN,
        });
    }

    if doc_type == DocumentType::Transfer {
        if let (Some(from), Some(to)) = (&draft.warehouse_id, &draft.to_warehouse_id) {
            if from == to {
                return Err(must_differ());
            }
        }
    }

    for item in &draft.items {
        if item.variant_id.trim().is_empty() {
            return Err(ValidationError::required("items.variant_id"));
        }
        validate_not_negative("items.quantity", item.quantity)?;
        validate_magnitude("items.quantity", item.quantity)?;
        if let Some(price) = item.price {
            validate_not_negative("items.price", price)?;
            validate_magnitude("items.price", price)?;
        }
    }

    Ok(doc_type)
}

// =============================================================================
// Posting Preconditions
// =============================================================================

/// Enforces the per-type header and item preconditions for posting.
pub fn validate_for_posting(doc: &Document, policy: AccountingPolicy) -> ValidationResult<()> {
    if doc.items.is_empty() {
        return Err(ValidationError::EmptyItems);
    }

    for item in &doc.items {
        validate_magnitude("items.quantity", item.quantity)?;
        if let Some(price) = item.price {
            validate_magnitude("items.price", price)?;
        }
    }

    match doc.doc_type {
        DocumentType::Income => {
            doc.require_warehouse()?;
            for item in &doc.items {
                validate_positive("items.quantity", item.quantity)?;
                match item.price {
                    Some(price) => validate_not_negative("items.price", price)?,
                    None if policy == AccountingPolicy::Fifo => {
                        return Err(ValidationError::required("items.price"));
                    }
                    None => {}
                }
            }
        }
        DocumentType::Outcome | DocumentType::Order => {
            doc.require_warehouse()?;
            for item in &doc.items {
                validate_positive("items.quantity", item.quantity)?;
            }
        }
        DocumentType::Transfer => {
            let from = doc.require_warehouse()?;
            let to = doc.require_to_warehouse()?;
            if from == to {
                return Err(must_differ());
            }
            for item in &doc.items {
                validate_positive("items.quantity", item.quantity)?;
            }
        }
        DocumentType::Inventory => {
            doc.require_warehouse()?;
            for item in &doc.items {
                validate_not_negative("items.quantity", item.quantity)?;
            }
        }
        DocumentType::PriceUpdate => {
            doc.price_type_id
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| ValidationError::required("price_type_id"))?;
            for item in &doc.items {
                let price = item.price.ok_or_else(|| ValidationError::required("items.price"))?;
                validate_not_negative("items.price", price)?;
            }
        }
    }

    if doc.base_document_id.is_some() && doc.doc_type != DocumentType::Outcome {
        return Err(ValidationError::InvalidBaseDocument {
            id: doc.base_document_id.clone().unwrap_or_default(),
            reason: "only an outcome may reference a base document".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Field Validators
// =============================================================================

/// Value must be strictly greater than zero.
pub fn validate_positive(field: &str, value: Amount) -> ValidationResult<()> {
    if !value.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Value must be zero or greater.
pub fn validate_not_negative(field: &str, value: Amount) -> ValidationResult<()> {
    if value.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Value must stay within [`MAX_MAGNITUDE`](crate::decimal::MAX_MAGNITUDE) either side of zero.
pub fn validate_magnitude(field: &str, value: Amount) -> ValidationResult<()> {
    if !value.within_bounds() {
        return Err(ValidationError::out_of_range(field));
    }
    Ok(())
}

/// Validates a free-text search string and returns it trimmed.
///
/// Empty input is allowed and means "no text filter".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

fn must_differ() -> ValidationError {
    ValidationError::MustDiffer {
        field: "to_warehouse_id".to_string(),
        other: "warehouse_id".to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
