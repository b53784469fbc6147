//! # Sequence Allocator
//!
//! Human-readable document numbers from per-(type, year) counters.
//!
//! ```text
//! allocate(tx, INCOME, 2025)
//!     │
//!     ├── key "INCOME_2025"
//!     ├── document_sequences row: last_number += 1  (writer lock held by tx)
//!     └── "ПР-000018"
//! ```
//!
//! Runs inside the caller's transaction. The lifecycle controller commits a
//! number before the posting transaction begins, so numbers of rolled-back
//! posts are burned rather than reused.

use tracing::debug;

use depot_core::numbering::{format_number, sequence_key};
use depot_core::DocumentType;
use depot_db::{Database, Tx};

use crate::error::PostingResult;

/// Allocates document numbers.
#[derive(Debug, Clone)]
pub struct SequenceAllocator {
    db: Database,
    pad_width: usize,
}

impl SequenceAllocator {
    pub fn new(db: Database, pad_width: usize) -> Self {
        Self { db, pad_width }
    }

    /// Next number for `doc_type` in the bucket of `year`.
    pub async fn allocate(&self, tx: &mut Tx, doc_type: DocumentType, year: i32) -> PostingResult<String> {
        let key = sequence_key(doc_type, year);
        let value = self.db.sequences().next(tx, &key).await?;
        let number = format_number(doc_type, value, self.pad_width);
        debug!(key = %key, value, number = %number, "Allocated document number");
        Ok(number)
    }
}
