//! Total-quantity strategy: one balance row per pair, no lots.

use tracing::debug;

use depot_core::{NewMovement, StockMovement};
use depot_db::{Database, Tx};

use super::{apply_balance, cancel_movement, ensure_available, lock_balance, locked_reserved};
use super::{Issue, IssueCheck, IssuedSlice, Receipt};
use crate::error::PostingResult;

/// Tracks only the aggregate balance.
#[derive(Debug, Clone)]
pub struct TotalStrategy {
    db: Database,
    allow_negative_stock: bool,
}

impl TotalStrategy {
    pub fn new(db: Database, allow_negative_stock: bool) -> Self {
        Self { db, allow_negative_stock }
    }

    pub(super) async fn receive(&self, tx: &mut Tx, warehouse_id: &str, receipt: &Receipt<'_>) -> PostingResult<()> {
        let balance = lock_balance(&self.db, tx, warehouse_id, receipt.variant_id).await?;

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
                    source_lot_id: None,
                    unit_cost: receipt.unit_cost,
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

        if let IssueCheck::KeepReserved(reserved) = issue.check {
            if !self.allow_negative_stock {
                ensure_available(warehouse_id, issue.variant_id, balance.quantity, reserved, issue.quantity)?;
            }
        }

        self.db
            .stock()
            .append_movement(
                tx,
                &NewMovement {
                    document_id: issue.document_id.to_string(),
                    variant_id: issue.variant_id.to_string(),
                    warehouse_id: warehouse_id.to_string(),
                    quantity: -issue.quantity,
                    movement_type: issue.movement_type,
                    source_lot_id: None,
                    unit_cost: None,
                },
            )
            .await?;

        apply_balance(&self.db, tx, balance, -issue.quantity).await?;

        Ok(vec![IssuedSlice {
            lot_id: None,
            quantity: issue.quantity,
            unit_cost: None,
        }])
    }

    pub(super) async fn revert(
        &self,
        tx: &mut Tx,
        warehouse_id: &str,
        movements: &[&StockMovement],
    ) -> PostingResult<()> {
        for movement in movements {
            let balance = lock_balance(&self.db, tx, warehouse_id, &movement.variant_id).await?;

            // Taking back a receipt must not strand stock that was already issued or promised.
            if movement.quantity.is_positive() && !self.allow_negative_stock {
                let reserved = locked_reserved(&self.db, tx, warehouse_id, &movement.variant_id).await?;
                ensure_available(
                    warehouse_id,
                    &movement.variant_id,
                    balance.quantity,
                    reserved,
                    movement.quantity,
                )?;
            }

            self.db
                .stock()
                .append_movement(tx, &cancel_movement(movement, None))
                .await?;
            apply_balance(&self.db, tx, balance, -movement.quantity).await?;

            debug!(
                movement_id = movement.id,
                variant_id = %movement.variant_id,
                quantity = %movement.quantity,
                "Reverted movement"
            );
        }
        Ok(())
    }
}
