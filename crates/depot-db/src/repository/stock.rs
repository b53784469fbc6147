//! # Stock Repository
//!
//! Balances, FIFO lots, reservations, the reservation journal and the
//! movement ledger.
//!
//! ## Row Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock_balances            one row per (warehouse, variant), upserted  │
//! │  stock_lots                FIFO parcels, deleted when empty            │
//! │  stock_reservations        one row per (warehouse, variant), upserted  │
//! │  stock_reservation_entries append-only, signed, per document           │
//! │  stock_movements           append-only ledger                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every method that reads a row the caller will then write takes `&mut Tx`
//! and touches the row first (see the module docs of [`crate::repository`]).

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::pool::Tx;
use crate::repository::ts;
use depot_core::{
    Amount, NewLot, NewMovement, ReservationEntry, StockBalance, StockLot, StockMovement,
    StockReservation,
};

const SELECT_BALANCE: &str = r#"
    SELECT warehouse_id, variant_id, quantity, updated_at
    FROM stock_balances
    WHERE warehouse_id = ?1 AND variant_id = ?2
"#;

const SELECT_RESERVATION: &str = r#"
    SELECT warehouse_id, variant_id, quantity, updated_at
    FROM stock_reservations
    WHERE warehouse_id = ?1 AND variant_id = ?2
"#;

const SELECT_LOTS: &str = r#"
    SELECT id, warehouse_id, variant_id, income_document_id, arrival_date,
           initial_quantity, current_quantity, unit_cost
    FROM stock_lots
    WHERE warehouse_id = ?1 AND variant_id = ?2
    ORDER BY arrival_date ASC, id ASC
"#;

const SELECT_MOVEMENTS_BY_DOCUMENT: &str = r#"
    SELECT id, document_id, variant_id, warehouse_id, quantity, type,
           source_lot_id, unit_cost, created_at
    FROM stock_movements
    WHERE document_id = ?1
    ORDER BY id
"#;

async fn fetch_lots(conn: &mut SqliteConnection, warehouse_id: &str, variant_id: &str) -> DbResult<Vec<StockLot>> {
    let lots = sqlx::query_as::<_, StockLot>(SELECT_LOTS)
        .bind(warehouse_id)
        .bind(variant_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(lots)
}

/// Repository for stock rows.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    // =========================================================================
    // Balances
    // =========================================================================

    /// Locks and reads the balance of a pair; `None` if it never moved.
    pub async fn lock_balance(
        &self,
        tx: &mut Tx,
        warehouse_id: &str,
        variant_id: &str,
    ) -> DbResult<Option<StockBalance>> {
        sqlx::query(
            "UPDATE stock_balances SET quantity = quantity WHERE warehouse_id = ?1 AND variant_id = ?2",
        )
        .bind(warehouse_id)
        .bind(variant_id)
        .execute(&mut **tx)
        .await?;

        let balance = sqlx::query_as::<_, StockBalance>(SELECT_BALANCE)
            .bind(warehouse_id)
            .bind(variant_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(balance)
    }

    /// Inserts or updates the balance of a pair.
    pub async fn upsert_balance(&self, tx: &mut Tx, balance: &StockBalance) -> DbResult<()> {
        debug!(
            warehouse_id = %balance.warehouse_id,
            variant_id = %balance.variant_id,
            quantity = %balance.quantity,
            "Upserting balance"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_balances (warehouse_id, variant_id, quantity, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (warehouse_id, variant_id)
            DO UPDATE SET quantity = excluded.quantity, updated_at = excluded.updated_at
            "#,
        )
        .bind(&balance.warehouse_id)
        .bind(&balance.variant_id)
        .bind(balance.quantity)
        .bind(ts(balance.updated_at))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Reads a balance without locking.
    pub async fn get_balance(&self, warehouse_id: &str, variant_id: &str) -> DbResult<Option<StockBalance>> {
        let balance = sqlx::query_as::<_, StockBalance>(SELECT_BALANCE)
            .bind(warehouse_id)
            .bind(variant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(balance)
    }

    /// All balances, ordered by warehouse then variant.
    pub async fn list_all_balances(&self) -> DbResult<Vec<StockBalance>> {
        let rows = sqlx::query_as::<_, StockBalance>(
            r#"
            SELECT warehouse_id, variant_id, quantity, updated_at
            FROM stock_balances
            ORDER BY warehouse_id, variant_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // =========================================================================
    // Lots
    // =========================================================================

    /// Locks the lots of a pair with quantity left, oldest first.
    ///
    /// Order is `(arrival_date ASC, id ASC)`.
    pub async fn lock_oldest_lots(
        &self,
        tx: &mut Tx,
        warehouse_id: &str,
        variant_id: &str,
    ) -> DbResult<Vec<StockLot>> {
        sqlx::query(
            "UPDATE stock_lots SET current_quantity = current_quantity WHERE warehouse_id = ?1 AND variant_id = ?2",
        )
        .bind(warehouse_id)
        .bind(variant_id)
        .execute(&mut **tx)
        .await?;

        let lots = fetch_lots(tx, warehouse_id, variant_id).await?;
        Ok(lots.into_iter().filter(|lot| lot.current_quantity.is_positive()).collect())
    }

    /// Locks and reads one lot; `None` if it has been deleted.
    pub async fn lock_lot(&self, tx: &mut Tx, lot_id: i64) -> DbResult<Option<StockLot>> {
        sqlx::query("UPDATE stock_lots SET current_quantity = current_quantity WHERE id = ?1")
            .bind(lot_id)
            .execute(&mut **tx)
            .await?;

        let lot = sqlx::query_as::<_, StockLot>(
            r#"
            SELECT id, warehouse_id, variant_id, income_document_id, arrival_date,
                   initial_quantity, current_quantity, unit_cost
            FROM stock_lots
            WHERE id = ?1
            "#,
        )
        .bind(lot_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(lot)
    }

    /// Inserts a lot and returns its id.
    pub async fn insert_lot(&self, tx: &mut Tx, lot: &NewLot) -> DbResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO stock_lots (
                warehouse_id, variant_id, income_document_id, arrival_date,
                initial_quantity, current_quantity, unit_cost, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?7)
            "#,
        )
        .bind(&lot.warehouse_id)
        .bind(&lot.variant_id)
        .bind(&lot.income_document_id)
        .bind(ts(lot.arrival_date))
        .bind(lot.quantity)
        .bind(lot.unit_cost)
        .bind(ts(depot_core::now()))
        .execute(&mut **tx)
        .await?;

        let id = result.last_insert_rowid();
        debug!(
            lot_id = id,
            warehouse_id = %lot.warehouse_id,
            variant_id = %lot.variant_id,
            quantity = %lot.quantity,
            "Inserted lot"
        );
        Ok(id)
    }

    /// Writes back a lot's current quantity.
    pub async fn update_lot(&self, tx: &mut Tx, lot: &StockLot) -> DbResult<()> {
        debug!(lot_id = lot.id, current_quantity = %lot.current_quantity, "Updating lot");

        sqlx::query("UPDATE stock_lots SET current_quantity = ?2 WHERE id = ?1")
            .bind(lot.id)
            .bind(lot.current_quantity)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Deletes lots by id.
    pub async fn delete_lots(&self, tx: &mut Tx, lot_ids: &[i64]) -> DbResult<()> {
        for id in lot_ids {
            sqlx::query("DELETE FROM stock_lots WHERE id = ?1")
                .bind(id)
                .execute(&mut **tx)
                .await?;
        }
        if !lot_ids.is_empty() {
            debug!(count = lot_ids.len(), "Deleted emptied lots");
        }
        Ok(())
    }

    /// Deletes every lot created by a document; returns the count.
    pub async fn delete_lots_by_income_doc(&self, tx: &mut Tx, document_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM stock_lots WHERE income_document_id = ?1")
            .bind(document_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// Lots of a pair, oldest first, without locking.
    pub async fn list_lots(&self, warehouse_id: &str, variant_id: &str) -> DbResult<Vec<StockLot>> {
        let mut conn = self.pool.acquire().await?;
        fetch_lots(&mut conn, warehouse_id, variant_id).await
    }

    // =========================================================================
    // Reservations
    // =========================================================================

    /// Locks and reads the reservation of a pair; `None` if there never was one.
    pub async fn lock_reservation(
        &self,
        tx: &mut Tx,
        warehouse_id: &str,
        variant_id: &str,
    ) -> DbResult<Option<StockReservation>> {
        sqlx::query(
            "UPDATE stock_reservations SET quantity = quantity WHERE warehouse_id = ?1 AND variant_id = ?2",
        )
        .bind(warehouse_id)
        .bind(variant_id)
        .execute(&mut **tx)
        .await?;

        let reservation = sqlx::query_as::<_, StockReservation>(SELECT_RESERVATION)
            .bind(warehouse_id)
            .bind(variant_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(reservation)
    }

    /// Inserts or updates the reservation of a pair.
    pub async fn upsert_reservation(&self, tx: &mut Tx, reservation: &StockReservation) -> DbResult<()> {
        debug!(
            warehouse_id = %reservation.warehouse_id,
            variant_id = %reservation.variant_id,
            quantity = %reservation.quantity,
            "Upserting reservation"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_reservations (warehouse_id, variant_id, quantity, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (warehouse_id, variant_id)
            DO UPDATE SET quantity = excluded.quantity, updated_at = excluded.updated_at
            "#,
        )
        .bind(&reservation.warehouse_id)
        .bind(&reservation.variant_id)
        .bind(reservation.quantity)
        .bind(ts(reservation.updated_at))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Reads a reservation without locking.
    pub async fn get_reservation(
        &self,
        warehouse_id: &str,
        variant_id: &str,
    ) -> DbResult<Option<StockReservation>> {
        let reservation = sqlx::query_as::<_, StockReservation>(SELECT_RESERVATION)
            .bind(warehouse_id)
            .bind(variant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reservation)
    }

    /// Appends a signed journal entry for a document.
    pub async fn append_reservation_entry(
        &self,
        tx: &mut Tx,
        document_id: &str,
        warehouse_id: &str,
        variant_id: &str,
        quantity: Amount,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_reservation_entries (document_id, warehouse_id, variant_id, quantity, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(document_id)
        .bind(warehouse_id)
        .bind(variant_id)
        .bind(quantity)
        .bind(ts(depot_core::now()))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Journal entries of a document, in write order.
    pub async fn reservation_entries_by_document(
        &self,
        tx: &mut Tx,
        document_id: &str,
    ) -> DbResult<Vec<ReservationEntry>> {
        let rows = sqlx::query_as::<_, ReservationEntry>(
            r#"
            SELECT id, document_id, warehouse_id, variant_id, quantity, created_at
            FROM stock_reservation_entries
            WHERE document_id = ?1
            ORDER BY id
            "#,
        )
        .bind(document_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows)
    }

    /// Journal entries of a pair written by an order or by any document
    /// based on it, in write order.
    pub async fn order_hold_entries(
        &self,
        tx: &mut Tx,
        order_id: &str,
        warehouse_id: &str,
        variant_id: &str,
    ) -> DbResult<Vec<ReservationEntry>> {
        let rows = sqlx::query_as::<_, ReservationEntry>(
            r#"
            SELECT id, document_id, warehouse_id, variant_id, quantity, created_at
            FROM stock_reservation_entries
            WHERE warehouse_id = ?2
              AND variant_id = ?3
              AND (document_id = ?1
                   OR document_id IN (SELECT id FROM documents WHERE base_document_id = ?1))
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .bind(warehouse_id)
        .bind(variant_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows)
    }

    // =========================================================================
    // Movements
    // =========================================================================

    /// Appends a ledger row and returns its id.
    pub async fn append_movement(&self, tx: &mut Tx, movement: &NewMovement) -> DbResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO stock_movements (
                document_id, variant_id, warehouse_id, quantity, type,
                source_lot_id, unit_cost, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&movement.document_id)
        .bind(&movement.variant_id)
        .bind(&movement.warehouse_id)
        .bind(movement.quantity)
        .bind(movement.movement_type)
        .bind(movement.source_lot_id)
        .bind(movement.unit_cost)
        .bind(ts(depot_core::now()))
        .execute(&mut **tx)
        .await?;

        debug!(
            document_id = %movement.document_id,
            warehouse_id = %movement.warehouse_id,
            variant_id = %movement.variant_id,
            quantity = %movement.quantity,
            movement_type = ?movement.movement_type,
            source_lot_id = ?movement.source_lot_id,
            "Appended movement"
        );
        Ok(result.last_insert_rowid())
    }

    /// Movements of a document inside a transaction, in write order.
    pub async fn list_movements_by_document(
        &self,
        tx: &mut Tx,
        document_id: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, StockMovement>(SELECT_MOVEMENTS_BY_DOCUMENT)
            .bind(document_id)
            .fetch_all(&mut **tx)
            .await?;
        Ok(rows)
    }

    /// Movements of a document, in write order, without a transaction.
    pub async fn movements_for_document(&self, document_id: &str) -> DbResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, StockMovement>(SELECT_MOVEMENTS_BY_DOCUMENT)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Movements of a pair, in write order.
    pub async fn movements_for_pair(&self, warehouse_id: &str, variant_id: &str) -> DbResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, document_id, variant_id, warehouse_id, quantity, type,
                   source_lot_id, unit_cost, created_at
            FROM stock_movements
            WHERE warehouse_id = ?1 AND variant_id = ?2
            ORDER BY id
            "#,
        )
        .bind(warehouse_id)
        .bind(variant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::seeded_db;
    use chrono::{Duration, TimeZone, Utc};
    use depot_core::{Document, DocumentItem, DocumentStatus, DocumentType, MovementType};
    use rust_decimal_macros::dec;

    async fn insert_income(db: &crate::Database, tx: &mut Tx, id: &str) {
        insert_document(db, tx, id, DocumentType::Income, None).await;
    }

    async fn insert_document(
        db: &crate::Database,
        tx: &mut Tx,
        id: &str,
        doc_type: DocumentType,
        base_document_id: Option<&str>,
    ) {
        let now = depot_core::now();
        let doc = Document {
            id: id.to_string(),
            doc_type,
            number: String::new(),
            warehouse_id: Some("wh-1".to_string()),
            to_warehouse_id: None,
            counterparty_id: None,
            price_type_id: None,
            base_document_id: base_document_id.map(str::to_string),
            comment: String::new(),
            status: DocumentStatus::Draft,
            created_at: now,
            updated_at: now,
            posted_at: None,
            items: vec![DocumentItem {
                id: depot_core::new_id(),
                document_id: id.to_string(),
                variant_id: "v-1".to_string(),
                quantity: Amount::from(1),
                price: None,
            }],
        };
        db.documents().insert(tx, &doc).await.unwrap();
    }

    fn lot(doc: &str, quantity: i64, arrival: chrono::DateTime<Utc>) -> NewLot {
        NewLot {
            warehouse_id: "wh-1".to_string(),
            variant_id: "v-1".to_string(),
            income_document_id: doc.to_string(),
            arrival_date: arrival,
            quantity: Amount::from(quantity),
            unit_cost: Amount::from(100),
        }
    }

    #[tokio::test]
    async fn test_balance_upsert_and_lock() {
        let db = seeded_db().await;
        let repo = db.stock();

        let mut tx = db.begin().await.unwrap();
        assert!(repo.lock_balance(&mut tx, "wh-1", "v-1").await.unwrap().is_none());

        let mut balance = StockBalance::empty("wh-1", "v-1");
        balance.quantity = Amount::new(dec!(12.5));
        repo.upsert_balance(&mut tx, &balance).await.unwrap();
        balance.quantity = Amount::new(dec!(7.25));
        repo.upsert_balance(&mut tx, &balance).await.unwrap();

        let locked = repo.lock_balance(&mut tx, "wh-1", "v-1").await.unwrap().unwrap();
        assert_eq!(locked.quantity, Amount::new(dec!(7.25)));
        tx.commit().await.unwrap();

        let stored: String = sqlx::query_scalar("SELECT quantity FROM stock_balances")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(stored, "7.2500");
        assert_eq!(repo.list_all_balances().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lots_ordered_by_arrival_then_id() {
        let db = seeded_db().await;
        let repo = db.stock();
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();

        let mut tx = db.begin().await.unwrap();
        insert_income(&db, &mut tx, "in-1").await;
        let late = repo.insert_lot(&mut tx, &lot("in-1", 5, t0 + Duration::days(1))).await.unwrap();
        let first = repo.insert_lot(&mut tx, &lot("in-1", 3, t0)).await.unwrap();
        let tie = repo.insert_lot(&mut tx, &lot("in-1", 4, t0)).await.unwrap();

        let lots = repo.lock_oldest_lots(&mut tx, "wh-1", "v-1").await.unwrap();
        let ids: Vec<i64> = lots.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![first, tie, late]);
        assert_eq!(lots[0].initial_quantity, lots[0].current_quantity);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_lot_update_and_delete() {
        let db = seeded_db().await;
        let repo = db.stock();

        let mut tx = db.begin().await.unwrap();
        insert_income(&db, &mut tx, "in-1").await;
        let id = repo.insert_lot(&mut tx, &lot("in-1", 5, depot_core::now())).await.unwrap();

        let mut stored = repo.lock_lot(&mut tx, id).await.unwrap().unwrap();
        stored.current_quantity = Amount::from(2);
        repo.update_lot(&mut tx, &stored).await.unwrap();
        assert_eq!(
            repo.lock_lot(&mut tx, id).await.unwrap().unwrap().current_quantity,
            Amount::from(2)
        );

        repo.delete_lots(&mut tx, &[id]).await.unwrap();
        assert!(repo.lock_lot(&mut tx, id).await.unwrap().is_none());

        repo.insert_lot(&mut tx, &lot("in-1", 1, depot_core::now())).await.unwrap();
        repo.insert_lot(&mut tx, &lot("in-1", 1, depot_core::now())).await.unwrap();
        assert_eq!(repo.delete_lots_by_income_doc(&mut tx, "in-1").await.unwrap(), 2);
        assert_eq!(repo.delete_lots_by_income_doc(&mut tx, "in-1").await.unwrap(), 0);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_reservation_and_journal() {
        let db = seeded_db().await;
        let repo = db.stock();

        let mut tx = db.begin().await.unwrap();
        insert_income(&db, &mut tx, "ord-1").await;
        assert!(repo.lock_reservation(&mut tx, "wh-1", "v-1").await.unwrap().is_none());

        let mut reservation = StockReservation::empty("wh-1", "v-1");
        reservation.quantity = Amount::from(4);
        repo.upsert_reservation(&mut tx, &reservation).await.unwrap();
        repo.append_reservation_entry(&mut tx, "ord-1", "wh-1", "v-1", Amount::from(4))
            .await
            .unwrap();
        repo.append_reservation_entry(&mut tx, "ord-1", "wh-1", "v-1", -Amount::from(1))
            .await
            .unwrap();

        let entries = repo.reservation_entries_by_document(&mut tx, "ord-1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].quantity, -Amount::from(1));
        tx.commit().await.unwrap();

        let stored = repo.get_reservation("wh-1", "v-1").await.unwrap().unwrap();
        assert_eq!(stored.quantity, Amount::from(4));
    }

    #[tokio::test]
    async fn test_order_hold_entries_follow_base_document() {
        let db = seeded_db().await;
        let repo = db.stock();

        let mut tx = db.begin().await.unwrap();
        insert_document(&db, &mut tx, "ord-1", DocumentType::Order, None).await;
        insert_document(&db, &mut tx, "ord-2", DocumentType::Order, None).await;
        insert_document(&db, &mut tx, "out-1", DocumentType::Outcome, Some("ord-1")).await;

        for (doc, qty) in [("ord-1", 6), ("ord-2", 5), ("out-1", -4)] {
            repo.append_reservation_entry(&mut tx, doc, "wh-1", "v-1", Amount::from(qty))
                .await
                .unwrap();
        }
        repo.append_reservation_entry(&mut tx, "ord-1", "wh-2", "v-1", Amount::from(9))
            .await
            .unwrap();

        let entries = repo.order_hold_entries(&mut tx, "ord-1", "wh-1", "v-1").await.unwrap();
        let seen: Vec<(&str, Amount)> = entries
            .iter()
            .map(|e| (e.document_id.as_str(), e.quantity))
            .collect();
        assert_eq!(seen, vec![("ord-1", Amount::from(6)), ("out-1", Amount::from(-4))]);

        let other = repo.order_hold_entries(&mut tx, "ord-2", "wh-1", "v-1").await.unwrap();
        assert_eq!(other.len(), 1);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_movements_append_only_in_order() {
        let db = seeded_db().await;
        let repo = db.stock();

        let mut tx = db.begin().await.unwrap();
        insert_income(&db, &mut tx, "in-1").await;
        for (qty, kind) in [(10, MovementType::Income), (-10, MovementType::Cancel)] {
            repo.append_movement(
                &mut tx,
                &NewMovement {
                    document_id: "in-1".to_string(),
                    variant_id: "v-1".to_string(),
                    warehouse_id: "wh-1".to_string(),
                    quantity: Amount::from(qty),
                    movement_type: kind,
                    source_lot_id: Some(7),
                    unit_cost: Some(Amount::from(3)),
                },
            )
            .await
            .unwrap();
        }
        let in_tx = repo.list_movements_by_document(&mut tx, "in-1").await.unwrap();
        assert_eq!(in_tx.len(), 2);
        tx.commit().await.unwrap();

        let movements = repo.movements_for_document("in-1").await.unwrap();
        assert_eq!(movements[0].movement_type, MovementType::Income);
        assert_eq!(movements[1].movement_type, MovementType::Cancel);
        assert_eq!(movements[1].source_lot_id, Some(7));
        let net: Amount = repo
            .movements_for_pair("wh-1", "v-1")
            .await
            .unwrap()
            .iter()
            .map(|m| m.quantity)
            .sum();
        assert!(net.is_zero());
    }
}
