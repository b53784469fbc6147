//! # Document Numbering
//!
//! Pure formatting half of the sequence allocator: bucket keys and
//! human-readable numbers. The counter itself lives in the database.
//!
//! ```text
//! (INCOME, 2025) ──► key "INCOME_2025" ──► counter 17 ──► "ПР-000017"
//! ```

use crate::types::DocumentType;

/// Default zero-padding of the numeric part.
pub const DEFAULT_PAD_WIDTH: usize = 6;

/// Number prefix for a document type.
pub fn number_prefix(doc_type: DocumentType) -> &'static str {
    match doc_type {
        DocumentType::Income => "ПР",
        DocumentType::Outcome => "РН",
        DocumentType::Transfer => "ПМ",
        DocumentType::Inventory => "ИН",
        DocumentType::Order => "ЗК",
        DocumentType::PriceUpdate => "ПЦ",
    }
}

/// Sequence bucket key, `"{TYPE}_{YEAR}"`.
pub fn sequence_key(doc_type: DocumentType, year: i32) -> String {
    format!("{}_{}", doc_type.as_str(), year)
}

/// Formats `value` as `"{PREFIX}-{zero padded}"`.
///
/// ## Example
/// ```rust
/// use depot_core::numbering::format_number;
/// use depot_core::types::DocumentType;
///
/// assert_eq!(format_number(DocumentType::Income, 1, 6), "ПР-000001");
/// assert_eq!(format_number(DocumentType::Order, 42, 3), "ЗК-042");
/// ```
pub fn format_number(doc_type: DocumentType, value: i64, pad_width: usize) -> String {
    format!("{}-{:0width$}", number_prefix(doc_type), value, width = pad_width)
}
