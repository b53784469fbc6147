//! # Query Surface
//!
//! Derived, non-locking reads. Nothing here opens a transaction.
//!
//! - available = on hand - reserved
//! - balances of a warehouse joined with catalog data
//! - variant search with stock status
//! - history, movements, lots and prices for audit

use depot_core::validation::validate_search_query;
use depot_core::{
    Amount, BalanceFilter, BalanceView, DocumentHistory, ItemPrice, StockLot, StockMovement,
    VariantFilter, VariantView,
};
use depot_db::{CatalogTable, Database};

use crate::error::{PostingError, PostingResult};

/// Read-only views over stock and documents.
#[derive(Debug, Clone)]
pub struct QuerySurface {
    db: Database,
}

impl QuerySurface {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// On hand minus reserved for a pair.
    pub async fn available_quantity(&self, warehouse_id: &str, variant_id: &str) -> PostingResult<Amount> {
        self.require(CatalogTable::Warehouses, warehouse_id).await?;
        self.require(CatalogTable::Variants, variant_id).await?;

        let stock = self.db.stock();
        let on_hand = stock
            .get_balance(warehouse_id, variant_id)
            .await?
            .map(|b| b.quantity)
            .unwrap_or(Amount::ZERO);
        let reserved = stock
            .get_reservation(warehouse_id, variant_id)
            .await?
            .map(|r| r.quantity)
            .unwrap_or(Amount::ZERO);

        Ok(on_hand - reserved)
    }

    /// Enriched balances of a warehouse, ordered by variant id.
    pub async fn list_balances(&self, warehouse_id: &str, filter: &BalanceFilter) -> PostingResult<Vec<BalanceView>> {
        self.require(CatalogTable::Warehouses, warehouse_id).await?;
        Ok(self.db.catalog().list_balances(warehouse_id, filter).await?)
    }

    /// Paginated variant search by name or SKU.
    pub async fn search_variants(&self, filter: &VariantFilter) -> PostingResult<Vec<VariantView>> {
        let mut filter = filter.clone();
        filter.query = match filter.query.as_deref() {
            Some(raw) => Some(validate_search_query(raw)?).filter(|q| !q.is_empty()),
            None => None,
        };
        if let Some(warehouse_id) = filter.warehouse_id.as_deref() {
            self.require(CatalogTable::Warehouses, warehouse_id).await?;
        }
        Ok(self.db.catalog().search_variants(&filter).await?)
    }

    /// Transition history of a document, oldest first.
    pub async fn document_history(&self, document_id: &str) -> PostingResult<Vec<DocumentHistory>> {
        self.require_document(document_id).await?;
        Ok(self.db.documents().list_history(document_id).await?)
    }

    /// Ledger rows written for a document, in write order.
    pub async fn list_movements(&self, document_id: &str) -> PostingResult<Vec<StockMovement>> {
        self.require_document(document_id).await?;
        Ok(self.db.stock().movements_for_document(document_id).await?)
    }

    /// Lots of a pair, oldest first.
    pub async fn list_lots(&self, warehouse_id: &str, variant_id: &str) -> PostingResult<Vec<StockLot>> {
        Ok(self.db.stock().list_lots(warehouse_id, variant_id).await?)
    }

    /// Current price of a variant under a price type.
    pub async fn get_price(&self, variant_id: &str, price_type_id: &str) -> PostingResult<Option<ItemPrice>> {
        Ok(self.db.prices().get(variant_id, price_type_id).await?)
    }

    async fn require(&self, table: CatalogTable, id: &str) -> PostingResult<()> {
        if self.db.catalog().exists(table, id).await? {
            Ok(())
        } else {
            Err(PostingError::not_found(table.entity(), id))
        }
    }

    async fn require_document(&self, document_id: &str) -> PostingResult<()> {
        match self.db.documents().get(document_id).await? {
            Some(_) => Ok(()),
            None => Err(PostingError::not_found("Document", document_id)),
        }
    }
}
