//! # Quantity Strategies
//!
//! How receipts and issues change balances (and, in FIFO, lots).
//!
//! ## Primitives
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     QuantityStrategy                                    │
//! │                                                                         │
//! │   receive(wh, Receipt)          issue(wh, variant, qty, check)          │
//! │        │                               │                                │
//! │   Total: balance += qty         Total: balance -= qty                   │
//! │   Fifo:  new lot + balance      Fifo:  consume oldest lots, one         │
//! │                                        movement per consumed slice      │
//! │                                                                         │
//! │   revert(wh, recorded movements)                                        │
//! │        positive row ──► un-receive (Fifo: the lot must be untouched)    │
//! │        negative row ──► give back (Fifo: refill or reclaim the lot)     │
//! │        each row gets a CANCEL movement with the inverse quantity        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lifecycle controller composes these: INCOME is one receive per item,
//! TRANSFER is an issue at the source followed by a receive per slice at the
//! destination, INVENTORY is a receive or an issue of the delta.
//!
//! Both strategies are stateless. Every call runs inside the caller's
//! transaction and locks the rows it reads before writing them.

mod fifo;
mod total;

pub use fifo::FifoStrategy;
pub use total::TotalStrategy;

use chrono::{DateTime, Utc};

use depot_core::{
    AccountingPolicy, Amount, MovementType, NewMovement, StockBalance, StockMovement, ValidationError,
};
use depot_db::{Database, Tx};

use crate::error::{PostingError, PostingResult};

// =============================================================================
// Inputs and Outputs
// =============================================================================

/// Stock arriving at a warehouse.
#[derive(Debug, Clone)]
pub struct Receipt<'a> {
    pub document_id: &'a str,
    pub variant_id: &'a str,
    pub quantity: Amount,
    /// Lot cost in FIFO; recorded on the movement in both modes.
    pub unit_cost: Option<Amount>,
    /// Lot arrival date in FIFO.
    pub arrival: DateTime<Utc>,
    pub movement_type: MovementType,
}

/// Stock leaving a warehouse.
#[derive(Debug, Clone)]
pub struct Issue<'a> {
    pub document_id: &'a str,
    pub variant_id: &'a str,
    pub quantity: Amount,
    pub check: IssueCheck,
    pub movement_type: MovementType,
}

/// Availability rule applied before an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCheck {
    /// On hand minus `reserved` must cover the issue.
    KeepReserved(Amount),
    /// No check; the balance may go negative.
    Unchecked,
}

/// One consumed piece of an issue.
///
/// Total issues produce a single slice without a lot.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedSlice {
    pub lot_id: Option<i64>,
    pub quantity: Amount,
    pub unit_cost: Option<Amount>,
}

// =============================================================================
// Strategy
// =============================================================================

/// The accounting policy in effect, chosen once from configuration.
#[derive(Debug, Clone)]
pub enum QuantityStrategy {
    Total(TotalStrategy),
    Fifo(FifoStrategy),
}

impl QuantityStrategy {
    /// Builds the strategy for `policy`.
    pub fn for_policy(db: Database, policy: AccountingPolicy, allow_negative_stock: bool) -> Self {
        match policy {
            AccountingPolicy::Total => QuantityStrategy::Total(TotalStrategy::new(db, allow_negative_stock)),
            AccountingPolicy::Fifo => QuantityStrategy::Fifo(FifoStrategy::new(db, allow_negative_stock)),
        }
    }

    /// Adds stock at `warehouse_id`.
    pub async fn receive(&self, tx: &mut Tx, warehouse_id: &str, receipt: &Receipt<'_>) -> PostingResult<()> {
        match self {
            QuantityStrategy::Total(s) => s.receive(tx, warehouse_id, receipt).await,
            QuantityStrategy::Fifo(s) => s.receive(tx, warehouse_id, receipt).await,
        }
    }

    /// Removes stock from `warehouse_id`; returns what was consumed.
    pub async fn issue(&self, tx: &mut Tx, warehouse_id: &str, issue: &Issue<'_>) -> PostingResult<Vec<IssuedSlice>> {
        match self {
            QuantityStrategy::Total(s) => s.issue(tx, warehouse_id, issue).await,
            QuantityStrategy::Fifo(s) => s.issue(tx, warehouse_id, issue).await,
        }
    }

    /// Undoes `movements`, all recorded at `warehouse_id` by one document.
    ///
    /// Positive rows are reverted before negative ones so a FIFO lot
    /// refilled by this call is never mistaken for consumed stock.
    pub async fn revert(
        &self,
        tx: &mut Tx,
        warehouse_id: &str,
        movements: &[StockMovement],
    ) -> PostingResult<()> {
        let mut ordered: Vec<&StockMovement> = movements
            .iter()
            .filter(|m| m.warehouse_id == warehouse_id && m.movement_type != MovementType::Cancel)
            .collect();
        ordered.sort_by(|a, b| {
            b.quantity
                .is_positive()
                .cmp(&a.quantity.is_positive())
                .then_with(|| a.variant_id.cmp(&b.variant_id))
                .then_with(|| a.id.cmp(&b.id))
        });

        match self {
            QuantityStrategy::Total(s) => s.revert(tx, warehouse_id, &ordered).await,
            QuantityStrategy::Fifo(s) => s.revert(tx, warehouse_id, &ordered).await,
        }
    }
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Locks the balance row of a pair, starting from zero if it never moved.
pub(crate) async fn lock_balance(
    db: &Database,
    tx: &mut Tx,
    warehouse_id: &str,
    variant_id: &str,
) -> PostingResult<StockBalance> {
    let balance = db.stock().lock_balance(tx, warehouse_id, variant_id).await?;
    Ok(balance.unwrap_or_else(|| StockBalance::empty(warehouse_id, variant_id)))
}

/// Applies `delta` to a locked balance and writes it back.
pub(crate) async fn apply_balance(
    db: &Database,
    tx: &mut Tx,
    mut balance: StockBalance,
    delta: Amount,
) -> PostingResult<StockBalance> {
    balance.quantity = balance
        .quantity
        .checked_add(delta)
        .ok_or_else(|| ValidationError::out_of_range("balance"))?;
    balance.updated_at = depot_core::now();
    db.stock().upsert_balance(tx, &balance).await?;
    Ok(balance)
}

/// Reserved quantity of a pair, read under lock.
pub(crate) async fn locked_reserved(
    db: &Database,
    tx: &mut Tx,
    warehouse_id: &str,
    variant_id: &str,
) -> PostingResult<Amount> {
    let reservation = db.stock().lock_reservation(tx, warehouse_id, variant_id).await?;
    Ok(reservation.map(|r| r.quantity).unwrap_or(Amount::ZERO))
}

/// Fails unless `on_hand - reserved` covers `requested`.
pub(crate) fn ensure_available(
    warehouse_id: &str,
    variant_id: &str,
    on_hand: Amount,
    reserved: Amount,
    requested: Amount,
) -> PostingResult<()> {
    let available = on_hand.saturating_sub(reserved);
    if available < requested {
        return Err(PostingError::insufficient_stock(warehouse_id, variant_id, available, requested));
    }
    Ok(())
}

/// The compensating CANCEL row for a recorded movement.
pub(crate) fn cancel_movement(original: &StockMovement, source_lot_id: Option<i64>) -> NewMovement {
    NewMovement {
        document_id: original.document_id.clone(),
        variant_id: original.variant_id.clone(),
        warehouse_id: original.warehouse_id.clone(),
        quantity: -original.quantity,
        movement_type: MovementType::Cancel,
        source_lot_id,
        unit_cost: original.unit_cost,
    }
}
