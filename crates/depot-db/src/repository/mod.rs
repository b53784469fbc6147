//! # Repository Module
//!
//! Database repository implementations for the posting engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two kinds of methods                                 │
//! │                                                                         │
//! │  Pool reads (no Tx)              Transactional methods (&mut Tx)       │
//! │  ───────────────────             ───────────────────────────────       │
//! │  db.stock().get_balance(..)      db.stock().lock_balance(tx, ..)       │
//! │  db.documents().get(..)          db.documents().get_for_update(tx, ..) │
//! │  db.catalog().list_balances(..)  db.sequences().next(tx, key)          │
//! │                                                                         │
//! │  lock_* / *_for_update: touch the row with a no-op UPDATE, then read.  │
//! │  The touch takes the writer lock, so nothing read this way can change  │
//! │  under the transaction before it commits.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`DocumentRepository`](document::DocumentRepository) - Documents, items, history
//! - [`StockRepository`](stock::StockRepository) - Balances, lots, reservations, movements
//! - [`SequenceRepository`](sequence::SequenceRepository) - Document number counters
//! - [`PriceRepository`](price::PriceRepository) - Item prices
//! - [`CatalogRepository`](catalog::CatalogRepository) - Catalog look-ups and enriched reads

pub mod catalog;
pub mod document;
pub mod price;
pub mod sequence;
pub mod stock;

use chrono::{DateTime, SecondsFormat, Utc};

/// Formats a timestamp the way every TEXT timestamp column stores it.
///
/// Fixed microsecond precision with a `Z` suffix keeps lexical order equal
/// to chronological order.
pub(crate) fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Case-insensitive substring search with full Unicode folding.
///
/// SQLite's `lower()` and `LIKE` fold ASCII only, so text matching on names,
/// SKUs and Cyrillic document numbers happens here instead.
#[derive(Debug, Clone)]
pub(crate) struct TextMatch(String);

impl TextMatch {
    /// `None` for an empty needle, meaning "no text filter".
    pub(crate) fn new(needle: &str) -> Option<Self> {
        let needle = needle.trim();
        (!needle.is_empty()).then(|| TextMatch(needle.to_lowercase()))
    }

    pub(crate) fn matches(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.0)
    }
}

/// Applies `LIMIT`/`OFFSET` semantics to rows filtered in Rust.
pub(crate) fn page<T>(rows: Vec<T>, limit: u32, offset: u32) -> Vec<T> {
    rows.into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Catalog seeding for repository tests.

    use crate::{Database, DbConfig};

    pub async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for sql in [
            "INSERT INTO warehouses (id, name) VALUES ('wh-1', 'Main'), ('wh-2', 'Store')",
            "INSERT INTO categories (id, name) VALUES ('cat-1', 'Dairy'), ('cat-2', 'Bakery')",
            "INSERT INTO units (id, name) VALUES ('pcs', 'Pieces')",
            "INSERT INTO products (id, name, category_id, unit_id) VALUES \
             ('p-1', 'Milk', 'cat-1', 'pcs'), ('p-2', 'Bread', 'cat-2', 'pcs')",
            "INSERT INTO variants (id, product_id, sku, unit_id) VALUES \
             ('v-1', 'p-1', 'MILK-1L', 'pcs'), ('v-2', 'p-2', 'BREAD-W', 'pcs')",
            "INSERT INTO price_types (id, name, currency) VALUES ('retail', 'Retail', 'EUR')",
        ] {
            sqlx::query(sql).execute(db.pool()).await.unwrap();
        }
        db
    }
}
