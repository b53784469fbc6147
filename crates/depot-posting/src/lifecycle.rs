//! # Document Lifecycle Controller
//!
//! The posting state machine. One transaction per transition, plus a short
//! committed one in front of a post to draw the number.
//!
//! ```text
//! draft ──post──► posted ──cancel──► canceled (terminal)
//! ```
//!
//! ## Post
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  draft without a number: allocate in its own tx and commit              │
//! │                                                                         │
//! │  begin                                                                  │
//! │  lock document ─► status must be draft ─► per-type preconditions        │
//! │                                                                         │
//! │  INCOME        receive each item                                        │
//! │  OUTCOME       release base order (if any), issue each item             │
//! │  ORDER         reserve each item                                        │
//! │  TRANSFER      issue each item at source, receive slices at target      │
//! │  INVENTORY     receive or issue the delta to the counted quantity       │
//! │  PRICE_UPDATE  publish prices                                           │
//! │                                                                         │
//! │  number = drawn number (allocated here if none was drawn)               │
//! │  status = posted, history draft → posted                                │
//! │  commit   (any error: the Tx is dropped and everything rolls back)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancel runs the inverse, driven by the movements and reservation journal
//! the post recorded.

use chrono::Datelike;
use tracing::{debug, info, warn};

use depot_core::validation::validate_for_posting;
use depot_core::{
    Amount, Document, DocumentStatus, DocumentType, MovementType, ValidationError,
};
use depot_db::{Database, DbError, Tx};

use crate::config::PostingConfig;
use crate::error::{PostingError, PostingResult};
use crate::pricing::PricePublisher;
use crate::reservation::ReservationManager;
use crate::sequence::SequenceAllocator;
use crate::strategy::{lock_balance, Issue, IssueCheck, IssuedSlice, QuantityStrategy, Receipt};

/// Orchestrates strategies, reservations, prices and numbering per transition.
#[derive(Debug, Clone)]
pub struct LifecycleController {
    db: Database,
    config: PostingConfig,
    strategy: QuantityStrategy,
    reservations: ReservationManager,
    prices: PricePublisher,
    sequences: SequenceAllocator,
}

impl LifecycleController {
    /// Wires the collaborators for `config`.
    pub fn new(db: Database, config: PostingConfig) -> Self {
        let allow_negative = config.allow_negative_stock;
        LifecycleController {
            strategy: QuantityStrategy::for_policy(db.clone(), config.accounting_policy, allow_negative),
            reservations: ReservationManager::new(db.clone(), allow_negative),
            prices: PricePublisher::new(db.clone()),
            sequences: SequenceAllocator::new(db.clone(), config.sequence_pad_width),
            config,
            db,
        }
    }

    pub fn config(&self) -> &PostingConfig {
        &self.config
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Posts a draft: applies every side effect and marks it posted.
    ///
    /// The number is drawn in its own committed transaction first, so a post
    /// that rolls back burns it and the sequence shows a gap.
    pub async fn post(&self, document_id: &str, actor: Option<&str>) -> PostingResult<Document> {
        let number = self.draw_number(document_id).await?;
        let mut tx = self.db.begin().await?;

        match self.post_in_tx(&mut tx, document_id, actor, number).await {
            Ok(doc) => {
                tx.commit().await.map_err(DbError::from)?;
                info!(
                    document_id = %doc.id,
                    doc_type = %doc.doc_type,
                    number = %doc.number,
                    status = %doc.status,
                    "Document posted"
                );
                Ok(doc)
            }
            Err(err) => {
                rollback(tx, document_id, "post", &err).await;
                Err(err)
            }
        }
    }

    /// Cancels a posted document: reverts its side effects.
    pub async fn cancel(&self, document_id: &str, actor: Option<&str>) -> PostingResult<Document> {
        let mut tx = self.db.begin().await?;

        match self.cancel_in_tx(&mut tx, document_id, actor).await {
            Ok(doc) => {
                tx.commit().await.map_err(DbError::from)?;
                info!(
                    document_id = %doc.id,
                    doc_type = %doc.doc_type,
                    number = %doc.number,
                    status = %doc.status,
                    "Document canceled"
                );
                Ok(doc)
            }
            Err(err) => {
                rollback(tx, document_id, "cancel", &err).await;
                Err(err)
            }
        }
    }

    async fn post_in_tx(
        &self,
        tx: &mut Tx,
        document_id: &str,
        actor: Option<&str>,
        number: Option<String>,
    ) -> PostingResult<Document> {
        let mut doc = self.lock_document(tx, document_id).await?;
        let status = doc.status.transition(DocumentStatus::Posted, &doc.id)?;

        validate_for_posting(&doc, self.config.accounting_policy)?;
        if doc.doc_type == DocumentType::Outcome {
            self.check_base_document(tx, &doc).await?;
        }

        match doc.doc_type {
            DocumentType::Income => self.post_income(tx, &doc).await?,
            DocumentType::Outcome => self.post_outcome(tx, &doc).await?,
            DocumentType::Order => {
                let warehouse_id = doc.require_warehouse()?;
                self.reservations.reserve(tx, &doc, warehouse_id).await?;
            }
            DocumentType::Transfer => self.post_transfer(tx, &doc).await?,
            DocumentType::Inventory => self.post_inventory(tx, &doc).await?,
            DocumentType::PriceUpdate => {
                self.prices.publish(tx, &doc).await?;
            }
        }

        let now = depot_core::now();
        if doc.number.trim().is_empty() {
            doc.number = match number {
                Some(number) => number,
                None => self.sequences.allocate(tx, doc.doc_type, now.year()).await?,
            };
        }

        doc.status = status;
        doc.posted_at = Some(now);
        doc.updated_at = now;
        self.db.documents().save(tx, &doc).await?;
        self.db
            .documents()
            .insert_history(tx, &doc.id, Some(DocumentStatus::Draft), status, actor, "posted")
            .await?;

        Ok(doc)
    }

    async fn cancel_in_tx(&self, tx: &mut Tx, document_id: &str, actor: Option<&str>) -> PostingResult<Document> {
        let mut doc = self.lock_document(tx, document_id).await?;
        let status = doc.status.transition(DocumentStatus::Canceled, &doc.id)?;

        let movements = self.db.stock().list_movements_by_document(tx, &doc.id).await?;

        match doc.doc_type {
            DocumentType::Income | DocumentType::Inventory => {
                let warehouse_id = doc.require_warehouse()?;
                self.strategy.revert(tx, warehouse_id, &movements).await?;
            }
            DocumentType::Outcome => {
                let warehouse_id = doc.require_warehouse()?;
                if doc.base_document_id.is_some() {
                    self.reservations.revert_release(tx, &doc).await?;
                }
                self.strategy.revert(tx, warehouse_id, &movements).await?;
            }
            DocumentType::Order => {
                self.reservations.revert_reserve(tx, &doc).await?;
            }
            DocumentType::Transfer => {
                let from = doc.require_warehouse()?;
                let to = doc.require_to_warehouse()?;
                self.strategy.revert(tx, to, &movements).await?;
                self.strategy.revert(tx, from, &movements).await?;
            }
            DocumentType::PriceUpdate => {
                debug!(document_id = %doc.id, "Price update cancel leaves prices unchanged");
            }
        }

        doc.status = status;
        doc.updated_at = depot_core::now();
        self.db.documents().save(tx, &doc).await?;
        self.db
            .documents()
            .insert_history(tx, &doc.id, Some(DocumentStatus::Posted), status, actor, "canceled")
            .await?;

        Ok(doc)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    async fn post_income(&self, tx: &mut Tx, doc: &Document) -> PostingResult<()> {
        let warehouse_id = doc.require_warehouse()?;
        for item in doc.items_in_lock_order() {
            let receipt = Receipt {
                document_id: &doc.id,
                variant_id: &item.variant_id,
                quantity: item.quantity,
                unit_cost: item.price,
                arrival: doc.created_at,
                movement_type: MovementType::Income,
            };
            self.strategy.receive(tx, warehouse_id, &receipt).await?;
        }
        Ok(())
    }

    async fn post_outcome(&self, tx: &mut Tx, doc: &Document) -> PostingResult<()> {
        let warehouse_id = doc.require_warehouse()?;
        if doc.base_document_id.is_some() {
            let released = self.reservations.release(tx, doc, warehouse_id).await?;
            debug!(document_id = %doc.id, released = %released, "Released base order reservation");
        }

        for item in doc.items_in_lock_order() {
            let reserved = self
                .reservations
                .locked_quantity(tx, warehouse_id, &item.variant_id)
                .await?;
            let issue = Issue {
                document_id: &doc.id,
                variant_id: &item.variant_id,
                quantity: item.quantity,
                check: IssueCheck::KeepReserved(reserved),
                movement_type: MovementType::Outcome,
            };
            self.strategy.issue(tx, warehouse_id, &issue).await?;
        }
        Ok(())
    }

    async fn post_transfer(&self, tx: &mut Tx, doc: &Document) -> PostingResult<()> {
        let from = doc.require_warehouse()?;
        let to = doc.require_to_warehouse()?;

        let mut shipped: Vec<(&str, Option<Amount>, Vec<IssuedSlice>)> = Vec::new();
        for item in doc.items_in_lock_order() {
            let reserved = self.reservations.locked_quantity(tx, from, &item.variant_id).await?;
            let issue = Issue {
                document_id: &doc.id,
                variant_id: &item.variant_id,
                quantity: item.quantity,
                check: IssueCheck::KeepReserved(reserved),
                movement_type: MovementType::Transfer,
            };
            let slices = self.strategy.issue(tx, from, &issue).await?;
            shipped.push((item.variant_id.as_str(), item.price, slices));
        }

        // Destination lots arrive now and keep the cost of the slice they came from.
        let arrival = depot_core::now();
        for (variant_id, price, slices) in shipped {
            for slice in slices {
                let receipt = Receipt {
                    document_id: &doc.id,
                    variant_id,
                    quantity: slice.quantity,
                    unit_cost: slice.unit_cost.or(price),
                    arrival,
                    movement_type: MovementType::Transfer,
                };
                self.strategy.receive(tx, to, &receipt).await?;
            }
        }
        Ok(())
    }

    async fn post_inventory(&self, tx: &mut Tx, doc: &Document) -> PostingResult<()> {
        let warehouse_id = doc.require_warehouse()?;
        for item in doc.items_in_lock_order() {
            let balance = lock_balance(&self.db, tx, warehouse_id, &item.variant_id).await?;
            let delta = item
                .quantity
                .checked_sub(balance.quantity)
                .ok_or_else(|| ValidationError::out_of_range("items.quantity"))?;

            if delta.is_positive() {
                let receipt = Receipt {
                    document_id: &doc.id,
                    variant_id: &item.variant_id,
                    quantity: delta,
                    unit_cost: Some(item.price.unwrap_or(Amount::ZERO)),
                    arrival: doc.created_at,
                    movement_type: MovementType::Inventory,
                };
                self.strategy.receive(tx, warehouse_id, &receipt).await?;
            } else if delta.is_negative() {
                let issue = Issue {
                    document_id: &doc.id,
                    variant_id: &item.variant_id,
                    quantity: -delta,
                    check: IssueCheck::Unchecked,
                    movement_type: MovementType::Inventory,
                };
                self.strategy.issue(tx, warehouse_id, &issue).await?;
            }

            debug!(
                document_id = %doc.id,
                variant_id = %item.variant_id,
                counted = %item.quantity,
                delta = %delta,
                "Inventory line applied"
            );
        }
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Allocates and commits a number for a draft that has none.
    ///
    /// Returns `None` when the document is missing, already left draft, or
    /// carries a manual number; the posting transaction then decides.
    async fn draw_number(&self, document_id: &str) -> PostingResult<Option<String>> {
        let Some(doc) = self.db.documents().get(document_id).await? else {
            return Ok(None);
        };
        if doc.status != DocumentStatus::Draft || !doc.number.trim().is_empty() {
            return Ok(None);
        }

        let mut tx = self.db.begin().await?;
        let number = self
            .sequences
            .allocate(&mut tx, doc.doc_type, depot_core::now().year())
            .await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(Some(number))
    }

    async fn lock_document(&self, tx: &mut Tx, document_id: &str) -> PostingResult<Document> {
        self.db
            .documents()
            .get_for_update(tx, document_id)
            .await?
            .ok_or_else(|| PostingError::not_found("Document", document_id))
    }

    /// An outcome may only consume a posted order.
    async fn check_base_document(&self, tx: &mut Tx, doc: &Document) -> PostingResult<()> {
        let Some(base_id) = doc.base_document_id.as_deref() else {
            return Ok(());
        };

        let invalid = |reason: &str| ValidationError::InvalidBaseDocument {
            id: base_id.to_string(),
            reason: reason.to_string(),
        };

        let base = self
            .db
            .documents()
            .get_in_tx(tx, base_id)
            .await?
            .ok_or_else(|| invalid("not found"))?;

        if base.doc_type != DocumentType::Order {
            return Err(invalid("not an order").into());
        }
        if base.status != DocumentStatus::Posted {
            return Err(invalid("order is not posted").into());
        }
        if base.warehouse_id != doc.warehouse_id {
            return Err(invalid("order is for another warehouse").into());
        }
        Ok(())
    }
}

async fn rollback(tx: Tx, document_id: &str, operation: &str, err: &PostingError) {
    warn!(
        document_id = %document_id,
        operation,
        code = err.code().as_str(),
        error = %err,
        "Transition rolled back"
    );
    if let Err(e) = tx.rollback().await {
        warn!(document_id = %document_id, error = %e, "Rollback failed; connection will discard the transaction");
    }
}
