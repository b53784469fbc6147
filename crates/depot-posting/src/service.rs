//! # Posting Service
//!
//! The single entry point of the engine: draft management, transitions and
//! reads. Transport-agnostic; an HTTP layer or the `depotctl` CLI sits on top.
//!
//! ## Operations
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────────────┐
//! │ create_document(draft)   │ validate shape, check references, insert     │
//! │ update_document(draft)   │ draft only; replace header and items         │
//! │ delete_document(id)      │ draft only                                   │
//! │ get_document(id)         │ header + items                               │
//! │ list_documents(filter)   │ search, status, types, dates, paging         │
//! │ post_document(id)        │ LifecycleController::post                    │
//! │ cancel_document(id)      │ LifecycleController::cancel                  │
//! │ available_quantity       │ on hand - reserved                           │
//! │ list_balances            │ enriched balances of a warehouse             │
//! │ search_variants          │ name / SKU / category / stock status         │
//! │ document_history         │ transitions of a document                    │
//! │ list_movements / lots    │ ledger audit                                 │
//! │ get_price                │ current price                                │
//! └──────────────────────────┴──────────────────────────────────────────────┘
//! ```

use tracing::{info, instrument};

use depot_core::validation::validate_draft;
use depot_core::{
    Amount, BalanceFilter, BalanceView, Document, DocumentDraft, DocumentFilter, DocumentHistory,
    DocumentItem, DocumentStatus, DocumentSummary, ItemPrice, StockLot, StockMovement, ValidationError,
    VariantFilter, VariantView,
};
use depot_db::{CatalogTable, Database, DbError};

use crate::config::PostingConfig;
use crate::error::{PostingError, PostingResult};
use crate::lifecycle::LifecycleController;
use crate::query::QuerySurface;

/// Façade over the posting engine.
///
/// Cheap to clone; clones share the database pool.
#[derive(Debug, Clone)]
pub struct PostingService {
    db: Database,
    lifecycle: LifecycleController,
    queries: QuerySurface,
}

impl PostingService {
    /// Creates the service for an open database and a fixed configuration.
    pub fn new(db: Database, config: PostingConfig) -> Self {
        PostingService {
            lifecycle: LifecycleController::new(db.clone(), config),
            queries: QuerySurface::new(db.clone()),
            db,
        }
    }

    pub fn config(&self) -> &PostingConfig {
        self.lifecycle.config()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Drafts
    // =========================================================================

    /// Persists a new draft and returns it with generated ids.
    #[instrument(skip(self, draft), fields(doc_type = ?draft.doc_type))]
    pub async fn create_document(&self, draft: DocumentDraft) -> PostingResult<Document> {
        let doc_type = validate_draft(&draft)?;
        self.check_references(&draft).await?;

        let now = depot_core::now();
        let id = draft
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(depot_core::new_id);
        let doc = Document {
            doc_type,
            number: draft.number.clone().unwrap_or_default(),
            status: DocumentStatus::Draft,
            created_at: now,
            updated_at: now,
            posted_at: None,
            items: build_items(&id, &draft),
            id,
            warehouse_id: draft.warehouse_id,
            to_warehouse_id: draft.to_warehouse_id,
            counterparty_id: draft.counterparty_id,
            price_type_id: draft.price_type_id,
            base_document_id: draft.base_document_id,
            comment: draft.comment,
        };

        let mut tx = self.db.begin().await?;
        self.db.documents().insert(&mut tx, &doc).await?;
        self.db
            .documents()
            .insert_history(&mut tx, &doc.id, None, DocumentStatus::Draft, None, "created")
            .await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(document_id = %doc.id, doc_type = %doc.doc_type, items = doc.items.len(), "Draft created");
        Ok(doc)
    }

    /// Replaces header fields and items of a draft.
    #[instrument(skip(self, draft), fields(document_id = ?draft.id))]
    pub async fn update_document(&self, draft: DocumentDraft) -> PostingResult<Document> {
        let id = draft
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ValidationError::required("id"))?;
        let doc_type = validate_draft(&draft)?;
        self.check_references(&draft).await?;

        let mut tx = self.db.begin().await?;
        let existing = self
            .db
            .documents()
            .get_for_update(&mut tx, &id)
            .await?
            .ok_or_else(|| PostingError::not_found("Document", &id))?;

        if !existing.status.is_editable() {
            return Err(PostingError::IllegalTransition {
                document_id: id,
                from: existing.status,
                to: DocumentStatus::Draft,
            });
        }
        if existing.doc_type != doc_type {
            return Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: vec![existing.doc_type.to_string()],
            }
            .into());
        }

        let doc = Document {
            number: draft.number.clone().unwrap_or(existing.number),
            updated_at: depot_core::now(),
            items: build_items(&id, &draft),
            warehouse_id: draft.warehouse_id,
            to_warehouse_id: draft.to_warehouse_id,
            counterparty_id: draft.counterparty_id,
            price_type_id: draft.price_type_id,
            base_document_id: draft.base_document_id,
            comment: draft.comment,
            id,
            doc_type,
            status: existing.status,
            created_at: existing.created_at,
            posted_at: existing.posted_at,
        };

        self.db.documents().update_draft(&mut tx, &doc).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(document_id = %doc.id, items = doc.items.len(), "Draft updated");
        Ok(doc)
    }

    /// Deletes a draft.
    #[instrument(skip(self))]
    pub async fn delete_document(&self, document_id: &str) -> PostingResult<()> {
        let mut tx = self.db.begin().await?;
        let existing = self
            .db
            .documents()
            .get_for_update(&mut tx, document_id)
            .await?
            .ok_or_else(|| PostingError::not_found("Document", document_id))?;

        if !existing.status.is_editable() {
            return Err(PostingError::IllegalTransition {
                document_id: document_id.to_string(),
                from: existing.status,
                to: DocumentStatus::Draft,
            });
        }

        self.db.documents().delete(&mut tx, document_id).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(document_id = %document_id, "Draft deleted");
        Ok(())
    }

    /// A document with its items.
    pub async fn get_document(&self, document_id: &str) -> PostingResult<Document> {
        self.db
            .documents()
            .get(document_id)
            .await?
            .ok_or_else(|| PostingError::not_found("Document", document_id))
    }

    /// Document headers matching a filter, newest first.
    pub async fn list_documents(&self, filter: &DocumentFilter) -> PostingResult<Vec<DocumentSummary>> {
        Ok(self.db.documents().list(filter).await?)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// draft → posted.
    #[instrument(skip(self))]
    pub async fn post_document(&self, document_id: &str, actor: Option<&str>) -> PostingResult<Document> {
        self.lifecycle.post(document_id, actor).await
    }

    /// posted → canceled.
    #[instrument(skip(self))]
    pub async fn cancel_document(&self, document_id: &str, actor: Option<&str>) -> PostingResult<Document> {
        self.lifecycle.cancel(document_id, actor).await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn available_quantity(&self, warehouse_id: &str, variant_id: &str) -> PostingResult<Amount> {
        self.queries.available_quantity(warehouse_id, variant_id).await
    }

    pub async fn list_balances(&self, warehouse_id: &str, filter: &BalanceFilter) -> PostingResult<Vec<BalanceView>> {
        self.queries.list_balances(warehouse_id, filter).await
    }

    pub async fn search_variants(&self, filter: &VariantFilter) -> PostingResult<Vec<VariantView>> {
        self.queries.search_variants(filter).await
    }

    pub async fn document_history(&self, document_id: &str) -> PostingResult<Vec<DocumentHistory>> {
        self.queries.document_history(document_id).await
    }

    pub async fn list_movements(&self, document_id: &str) -> PostingResult<Vec<StockMovement>> {
        self.queries.list_movements(document_id).await
    }

    pub async fn list_lots(&self, warehouse_id: &str, variant_id: &str) -> PostingResult<Vec<StockLot>> {
        self.queries.list_lots(warehouse_id, variant_id).await
    }

    pub async fn get_price(&self, variant_id: &str, price_type_id: &str) -> PostingResult<Option<ItemPrice>> {
        self.queries.get_price(variant_id, price_type_id).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Every id a draft names must exist. Runs on the pool, before any
    /// transaction is opened.
    async fn check_references(&self, draft: &DocumentDraft) -> PostingResult<()> {
        let catalog = self.db.catalog();
        let header = [
            (CatalogTable::Warehouses, draft.warehouse_id.as_deref()),
            (CatalogTable::Warehouses, draft.to_warehouse_id.as_deref()),
            (CatalogTable::Counterparties, draft.counterparty_id.as_deref()),
            (CatalogTable::PriceTypes, draft.price_type_id.as_deref()),
        ];
        for (table, id) in header {
            if let Some(id) = id {
                if !catalog.exists(table, id).await? {
                    return Err(PostingError::not_found(table.entity(), id));
                }
            }
        }

        for item in &draft.items {
            if !catalog.exists(CatalogTable::Variants, &item.variant_id).await? {
                return Err(PostingError::not_found(CatalogTable::Variants.entity(), &item.variant_id));
            }
        }

        if let Some(base_id) = draft.base_document_id.as_deref() {
            if self.db.documents().get(base_id).await?.is_none() {
                return Err(PostingError::not_found("Document", base_id));
            }
        }
        Ok(())
    }
}

fn build_items(document_id: &str, draft: &DocumentDraft) -> Vec<DocumentItem> {
    draft
        .items
        .iter()
        .map(|item| DocumentItem {
            id: depot_core::new_id(),
            document_id: document_id.to_string(),
            variant_id: item.variant_id.clone(),
            quantity: item.quantity,
            price: item.price,
        })
        .collect()
}
