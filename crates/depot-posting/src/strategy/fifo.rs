//! # FIFO Strategy
//!
//! Every receipt is a lot; issues consume lots oldest first.
//!
//! ```text
//! lots of (W, V), by (arrival_date, id):
//!
//!   #1  10 @100   ──► take 10  (movement -10, source_lot_id 1, lot deleted)
//!   #2  20 @130   ──► take  5  (movement  -5, source_lot_id 2, lot keeps 15)
//!
//! issue 15 ─────────┘
//! ```
//!
//! Emptied lots are deleted once, after the loop.

use std::collections::HashMap;

use tracing::debug;

use depot_core::{Amount, NewLot, NewMovement, StockBalance, StockMovement, ValidationError};
use depot_db::{Database, Tx};

use super::{apply_balance, cancel_movement, ensure_available, lock_balance, locked_reserved};
use super::{Issue, IssueCheck, IssuedSlice, Receipt};
use crate::error::{PostingError, PostingResult};

/// Tracks the balance plus one lot per receipt.
#[derive(Debug, Clone)]
pub struct FifoStrategy {
    db: Database,
    allow_negative_stock: bool,
}

impl FifoStrategy {
    pub fn new(db: Database, allow_negative_stock: bool) -> Self {
        Self { db, allow_negative_stock }
    }

    pub(super) async fn receive(&self, tx: &mut Tx, warehouse_id: &str, receipt: &Receipt<'_>) -> PostingResult<()> {
        let balance = lock_balance(&self.db, tx, warehouse_id, receipt.variant_id).await?;
        let unit_cost = receipt.unit_cost.unwrap_or(Amount::ZERO);

        let lot_id = self
            .db
            .stock()
            .insert_lot(
                tx,
                &NewLot {
                    warehouse_id: warehouse_id.to_string(),
                    variant_id: receipt.variant_id.to_string(),
                    income_document_id: receipt.document_id.to_string(),
                    arrival_date: receipt.arrival,
                    quantity: receipt.quantity,
                    unit_cost,
                },
            )
            .await?;

        self.db
            .stock()
            .append_movement(
                tx,
                &NewMovement {
                    document_id: receipt.document_id.to_string(),
                    variant_id: receipt.variant_id.to_string(),
                    warehouse_id: warehouse_id.to_string(),
                    quantity: receipt.quantity,
                    movement_type: receipt.movement_type,
                    source_lot_id: Some(lot_id),
                    unit_cost: Some(unit_cost),
                },
            )
            .await?;

        apply_balance(&self.db, tx, balance, receipt.quantity).await?;
        Ok(())
    }

    pub(super) async fn issue(
        &self,
        tx: &mut Tx,
        warehouse_id: &str,
        issue: &Issue<'_>,
    ) -> PostingResult<Vec<IssuedSlice>> {
        let balance = lock_balance(&self.db, tx, warehouse_id, issue.variant_id).await?;
        let lots = self
            .db
            .stock()
            .lock_oldest_lots(tx, warehouse_id, issue.variant_id)
            .await?;

        if let IssueCheck::KeepReserved(reserved) = issue.check {
            if !self.allow_negative_stock {
                let in_lots: Amount = lots.iter().map(|lot| lot.current_quantity).sum();
                ensure_available(warehouse_id, issue.variant_id, in_lots, reserved, issue.quantity)?;
            }
        }

        let mut remaining = issue.quantity;
        let mut slices = Vec::new();
        let mut emptied = Vec::new();

        for mut lot in lots {
            if !remaining.is_positive() {
                break;
            }

            let take = lot.current_quantity.min(remaining);
            lot.current_quantity -= take;
            remaining -= take;

            self.db
                .stock()
                .append_movement(
                    tx,
                    &NewMovement {
                        document_id: issue.document_id.to_string(),
                        variant_id: issue.variant_id.to_string(),
                        warehouse_id: warehouse_id.to_string(),
                        quantity: -take,
                        movement_type: issue.movement_type,
                        source_lot_id: Some(lot.id),
                        unit_cost: Some(lot.unit_cost),
                    },
                )
                .await?;

            if lot.current_quantity.is_zero() {
                emptied.push(lot.id);
            } else {
                self.db.stock().update_lot(tx, &lot).await?;
            }

            slices.push(IssuedSlice {
                lot_id: Some(lot.id),
                quantity: take,
                unit_cost: Some(lot.unit_cost),
            });
        }

        // Lots ran out: only reachable with negative stock allowed or an unchecked issue.
        if remaining.is_positive() {
            self.db
                .stock()
                .append_movement(
                    tx,
                    &NewMovement {
                        document_id: issue.document_id.to_string(),
                        variant_id: issue.variant_id.to_string(),
                        warehouse_id: warehouse_id.to_string(),
                        quantity: -remaining,
                        movement_type: issue.movement_type,
                        source_lot_id: None,
                        unit_cost: None,
                    },
                )
                .await?;

            slices.push(IssuedSlice {
                lot_id: None,
                quantity: remaining,
                unit_cost: None,
            });
        }

        self.db.stock().delete_lots(tx, &emptied).await?;
        apply_balance(&self.db, tx, balance, -issue.quantity).await?;

        debug!(
            warehouse_id = %warehouse_id,
            variant_id = %issue.variant_id,
            quantity = %issue.quantity,
            slices = slices.len(),
            lots_emptied = emptied.len(),
            "Issued from lots"
        );
        Ok(slices)
    }

    pub(super) async fn revert(
        &self,
        tx: &mut Tx,
        warehouse_id: &str,
        movements: &[&StockMovement],
    ) -> PostingResult<()> {
        // Receipts sort first. Their lots are dropped in one statement once
        // every one is verified, before an issue revert can tag a reclaim
        // lot with the same document.
        let (receipts, issues) = movements.split_at(movements.partition_point(|m| m.quantity.is_positive()));

        for movement in receipts {
            let balance = lock_balance(&self.db, tx, warehouse_id, &movement.variant_id).await?;
            let lot_id = self.take_back_receipt(tx, warehouse_id, movement, balance.quantity).await?;
            self.record_revert(tx, movement, lot_id, balance).await?;
        }
        if let Some(first) = receipts.first() {
            let deleted = self.db.stock().delete_lots_by_income_doc(tx, &first.document_id).await?;
            debug!(document_id = %first.document_id, deleted, "Took back receipt lots");
        }

        // Deleted lots recreated during this revert, by original lot id.
        let mut reclaimed: HashMap<i64, i64> = HashMap::new();
        for movement in issues {
            let balance = lock_balance(&self.db, tx, warehouse_id, &movement.variant_id).await?;
            let lot_id = self.give_back_issue(tx, warehouse_id, movement, &mut reclaimed).await?;
            self.record_revert(tx, movement, lot_id, balance).await?;
        }
        Ok(())
    }

    async fn record_revert(
        &self,
        tx: &mut Tx,
        movement: &StockMovement,
        lot_id: Option<i64>,
        balance: StockBalance,
    ) -> PostingResult<()> {
        self.db
            .stock()
            .append_movement(tx, &cancel_movement(movement, lot_id))
            .await?;
        apply_balance(&self.db, tx, balance, -movement.quantity).await?;
        Ok(())
    }

    /// Verifies the lot a receipt created was never touched.
    async fn take_back_receipt(
        &self,
        tx: &mut Tx,
        warehouse_id: &str,
        movement: &StockMovement,
        on_hand: Amount,
    ) -> PostingResult<Option<i64>> {
        if let Some(lot_id) = movement.source_lot_id {
            let lot = self.db.stock().lock_lot(tx, lot_id).await?;
            match lot {
                Some(lot) if lot.current_quantity >= lot.initial_quantity => {}
                Some(lot) => {
                    return Err(PostingError::IntegrityViolation(format!(
                        "lot {} of document {} is partly consumed ({} of {} left)",
                        lot_id, movement.document_id, lot.current_quantity, lot.initial_quantity
                    )));
                }
                None => {
                    return Err(PostingError::IntegrityViolation(format!(
                        "lot {} of document {} is fully consumed",
                        lot_id, movement.document_id
                    )));
                }
            }
        }

        if !self.allow_negative_stock {
            let reserved = locked_reserved(&self.db, tx, warehouse_id, &movement.variant_id).await?;
            ensure_available(warehouse_id, &movement.variant_id, on_hand, reserved, movement.quantity)?;
        }
        Ok(movement.source_lot_id)
    }

    /// Returns issued stock to its lot, or to a reclaim lot if the lot is gone.
    async fn give_back_issue(
        &self,
        tx: &mut Tx,
        warehouse_id: &str,
        movement: &StockMovement,
        reclaimed: &mut HashMap<i64, i64>,
    ) -> PostingResult<Option<i64>> {
        let Some(original_id) = movement.source_lot_id else {
            return Ok(None);
        };
        let quantity = -movement.quantity;
        let target_id = reclaimed.get(&original_id).copied().unwrap_or(original_id);

        if let Some(mut lot) = self.db.stock().lock_lot(tx, target_id).await? {
            lot.current_quantity = lot
                .current_quantity
                .checked_add(quantity)
                .ok_or_else(|| ValidationError::out_of_range("lot"))?;
            self.db.stock().update_lot(tx, &lot).await?;
            return Ok(Some(lot.id));
        }

        let reclaim_id = self
            .db
            .stock()
            .insert_lot(
                tx,
                &NewLot {
                    warehouse_id: warehouse_id.to_string(),
                    variant_id: movement.variant_id.clone(),
                    income_document_id: movement.document_id.clone(),
                    arrival_date: depot_core::now(),
                    quantity,
                    unit_cost: movement.unit_cost.unwrap_or(Amount::ZERO),
                },
            )
            .await?;
        reclaimed.insert(original_id, reclaim_id);

        debug!(original_lot_id = original_id, reclaim_lot_id = reclaim_id, "Recreated consumed lot");
        Ok(Some(reclaim_id))
    }
}
