//! # Reservation Manager
//!
//! Soft holds placed by ORDER documents and consumed by OUTCOME documents
//! that name the order as their base.
//!
//! ```text
//!   on hand 20 ──┐
//!                ├──► available = 20 - 15 = 5
//!   reserved 15 ─┘
//!
//!   ORDER  +15  ──► reserved 15   journal (order,   +15)
//!   OUTCOME 15  ──► reserved  0   journal (outcome, -15)
//! ```
//!
//! Reservations never move stock. Every change is journaled per document so
//! a cancel restores exactly what the post changed, including clamping.
//!
//! The reservation row is shared by every order on a pair. What one order
//! still holds is its own journal plus the journals of the outcomes based
//! on it; releases never dig below that into another order's hold.

use tracing::debug;

use depot_core::{Amount, Document, ReservationEntry, StockReservation, ValidationError};
use depot_db::{Database, Tx};

use crate::error::PostingResult;
use crate::strategy::{ensure_available, lock_balance};

/// Applies reservation effects inside a posting transaction.
#[derive(Debug, Clone)]
pub struct ReservationManager {
    db: Database,
    allow_negative_stock: bool,
}

impl ReservationManager {
    pub fn new(db: Database, allow_negative_stock: bool) -> Self {
        Self { db, allow_negative_stock }
    }

    /// Reserved quantity of a pair, read under lock.
    pub async fn locked_quantity(&self, tx: &mut Tx, warehouse_id: &str, variant_id: &str) -> PostingResult<Amount> {
        Ok(self.lock(tx, warehouse_id, variant_id).await?.quantity)
    }

    /// Holds every item of an ORDER; each must fit in what is available.
    pub async fn reserve(&self, tx: &mut Tx, doc: &Document, warehouse_id: &str) -> PostingResult<()> {
        for item in doc.items_in_lock_order() {
            let balance = lock_balance(&self.db, tx, warehouse_id, &item.variant_id).await?;
            let reservation = self.lock(tx, warehouse_id, &item.variant_id).await?;

            if !self.allow_negative_stock {
                ensure_available(
                    warehouse_id,
                    &item.variant_id,
                    balance.quantity,
                    reservation.quantity,
                    item.quantity,
                )?;
            }

            self.change(tx, &doc.id, reservation, item.quantity).await?;
        }
        Ok(())
    }

    /// Consumes the base order's hold for every item of an OUTCOME.
    ///
    /// Each line releases at most what its order still holds for the pair,
    /// so holds of other orders on the same stock survive. Quantity beyond
    /// that is over-shipped from free stock. Returns the total released.
    pub async fn release(&self, tx: &mut Tx, doc: &Document, warehouse_id: &str) -> PostingResult<Amount> {
        let Some(order_id) = doc.base_document_id.as_deref() else {
            return Ok(Amount::ZERO);
        };

        let mut total = Amount::ZERO;
        for item in doc.items_in_lock_order() {
            let reservation = self.lock(tx, warehouse_id, &item.variant_id).await?;
            let held = self.outstanding(tx, order_id, warehouse_id, &item.variant_id).await?;
            let released = item.quantity.min(held).min(reservation.quantity).max(Amount::ZERO);
            if released.is_zero() {
                continue;
            }
            self.change(tx, &doc.id, reservation, -released).await?;
            total = total.saturating_add(released);
        }
        Ok(total)
    }

    /// Undoes [`release`](Self::release): puts back exactly what was released.
    pub async fn revert_release(&self, tx: &mut Tx, doc: &Document) -> PostingResult<()> {
        for entry in self.journal(tx, &doc.id).await? {
            if !entry.quantity.is_negative() {
                continue;
            }
            let reservation = self.lock(tx, &entry.warehouse_id, &entry.variant_id).await?;
            self.change(tx, &doc.id, reservation, -entry.quantity).await?;
        }
        Ok(())
    }

    /// Undoes [`reserve`](Self::reserve): drops what the order still holds.
    ///
    /// Stock already shipped against the order is not released twice.
    pub async fn revert_reserve(&self, tx: &mut Tx, doc: &Document) -> PostingResult<()> {
        let mut held: Vec<ReservationEntry> = self
            .journal(tx, &doc.id)
            .await?
            .into_iter()
            .filter(|entry| entry.quantity.is_positive())
            .collect();
        held.dedup_by(|a, b| a.warehouse_id == b.warehouse_id && a.variant_id == b.variant_id);

        for entry in held {
            let reservation = self.lock(tx, &entry.warehouse_id, &entry.variant_id).await?;
            let outstanding = self
                .outstanding(tx, &doc.id, &entry.warehouse_id, &entry.variant_id)
                .await?;
            let released = outstanding.min(reservation.quantity).max(Amount::ZERO);
            if released.is_zero() {
                continue;
            }
            self.change(tx, &doc.id, reservation, -released).await?;
        }
        Ok(())
    }

    /// What `order_id` still holds on a pair: its own entries plus those of
    /// the documents shipped against it, floored at zero.
    async fn outstanding(
        &self,
        tx: &mut Tx,
        order_id: &str,
        warehouse_id: &str,
        variant_id: &str,
    ) -> PostingResult<Amount> {
        let entries = self
            .db
            .stock()
            .order_hold_entries(tx, order_id, warehouse_id, variant_id)
            .await?;
        let mut held = Amount::ZERO;
        for entry in entries {
            held = held
                .checked_add(entry.quantity)
                .ok_or_else(|| ValidationError::out_of_range("reservation"))?;
        }
        Ok(held.max(Amount::ZERO))
    }

    async fn lock(&self, tx: &mut Tx, warehouse_id: &str, variant_id: &str) -> PostingResult<StockReservation> {
        let reservation = self.db.stock().lock_reservation(tx, warehouse_id, variant_id).await?;
        Ok(reservation.unwrap_or_else(|| StockReservation::empty(warehouse_id, variant_id)))
    }

    /// Journal of a document in lock order, so reverts lock like posts do.
    async fn journal(&self, tx: &mut Tx, document_id: &str) -> PostingResult<Vec<ReservationEntry>> {
        let mut entries = self.db.stock().reservation_entries_by_document(tx, document_id).await?;
        entries.sort_by(|a, b| {
            (a.warehouse_id.as_str(), a.variant_id.as_str(), a.id)
                .cmp(&(b.warehouse_id.as_str(), b.variant_id.as_str(), b.id))
        });
        Ok(entries)
    }

    async fn change(
        &self,
        tx: &mut Tx,
        document_id: &str,
        mut reservation: StockReservation,
        delta: Amount,
    ) -> PostingResult<()> {
        reservation.quantity = reservation
            .quantity
            .checked_add(delta)
            .ok_or_else(|| ValidationError::out_of_range("reservation"))?;
        reservation.updated_at = depot_core::now();
        self.db.stock().upsert_reservation(tx, &reservation).await?;
        self.db
            .stock()
            .append_reservation_entry(tx, document_id, &reservation.warehouse_id, &reservation.variant_id, delta)
            .await?;

        debug!(
            document_id = %document_id,
            warehouse_id = %reservation.warehouse_id,
            variant_id = %reservation.variant_id,
            delta = %delta,
            reserved = %reservation.quantity,
            "Reservation changed"
        );
        Ok(())
    }
}
