//! Shared fixtures for posting engine integration tests.

#![allow(dead_code)]

use std::time::Duration;

use tempfile::TempDir;

use depot_core::{Amount, Document, DocumentDraft, DocumentType, DraftItem, StockMovement};
use depot_db::{Database, DbConfig};
use depot_posting::{PostingConfig, PostingService};

pub const W1: &str = "wh-main";
pub const W2: &str = "wh-store";
pub const MILK: &str = "v-milk";
pub const BREAD: &str = "v-bread";
pub const RETAIL: &str = "pt-retail";

/// Inserts the catalog rows every test relies on.
pub async fn seed_catalog(db: &Database) {
    for sql in [
        "INSERT INTO warehouses (id, name) VALUES ('wh-main', 'Main warehouse'), ('wh-store', 'Shop floor')",
        "INSERT INTO categories (id, name) VALUES ('cat-dairy', 'Dairy'), ('cat-bakery', 'Bakery')",
        "INSERT INTO units (id, name) VALUES ('pcs', 'Pieces')",
        "INSERT INTO products (id, name, category_id, unit_id) VALUES \
         ('p-milk', 'Milk 1L', 'cat-dairy', 'pcs'), ('p-bread', 'White bread', 'cat-bakery', 'pcs')",
        "INSERT INTO variants (id, product_id, sku, unit_id) VALUES \
         ('v-milk', 'p-milk', 'MILK-1L', 'pcs'), ('v-bread', 'p-bread', 'BREAD-W', 'pcs')",
        "INSERT INTO price_types (id, name, currency) VALUES ('pt-retail', 'Retail', 'EUR')",
        "INSERT INTO counterparties (id, name) VALUES ('cp-farm', 'Green Farm')",
    ] {
        sqlx::query(sql).execute(db.pool()).await.unwrap();
    }
}

/// Service over a seeded in-memory database.
pub async fn memory_service(config: PostingConfig) -> PostingService {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    seed_catalog(&db).await;
    PostingService::new(db, config)
}

/// Service over a seeded file database with a multi-connection pool.
///
/// Keep the returned directory alive for the duration of the test.
pub async fn file_service(config: PostingConfig) -> (PostingService, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = Database::new(
        DbConfig::new(dir.path().join("depot.db"))
            .max_connections(8)
            .lock_timeout(Duration::from_secs(10)),
    )
    .await
    .unwrap();
    seed_catalog(&db).await;
    (PostingService::new(db, config), dir)
}

pub fn qty(value: i64) -> Amount {
    Amount::from(value)
}

pub fn draft(doc_type: DocumentType, warehouse_id: &str, items: Vec<DraftItem>) -> DocumentDraft {
    DocumentDraft {
        doc_type: Some(doc_type),
        warehouse_id: Some(warehouse_id.to_string()),
        items,
        ..Default::default()
    }
}

pub fn income(warehouse_id: &str, variant_id: &str, quantity: i64, price: i64) -> DocumentDraft {
    draft(
        DocumentType::Income,
        warehouse_id,
        vec![DraftItem::new(variant_id, quantity).with_price(price)],
    )
}

pub fn outcome(warehouse_id: &str, variant_id: &str, quantity: i64) -> DocumentDraft {
    draft(DocumentType::Outcome, warehouse_id, vec![DraftItem::new(variant_id, quantity)])
}

pub fn order(warehouse_id: &str, variant_id: &str, quantity: i64) -> DocumentDraft {
    draft(DocumentType::Order, warehouse_id, vec![DraftItem::new(variant_id, quantity)])
}

pub fn transfer(from: &str, to: &str, variant_id: &str, quantity: i64) -> DocumentDraft {
    DocumentDraft {
        doc_type: Some(DocumentType::Transfer),
        warehouse_id: Some(from.to_string()),
        to_warehouse_id: Some(to.to_string()),
        items: vec![DraftItem::new(variant_id, quantity)],
        ..Default::default()
    }
}

/// Creates and posts a draft.
pub async fn post_new(service: &PostingService, draft: DocumentDraft) -> Document {
    let doc = service.create_document(draft).await.unwrap();
    service.post_document(&doc.id, Some("tester")).await.unwrap()
}

pub async fn balance(service: &PostingService, warehouse_id: &str, variant_id: &str) -> Amount {
    service
        .database()
        .stock()
        .get_balance(warehouse_id, variant_id)
        .await
        .unwrap()
        .map(|b| b.quantity)
        .unwrap_or(Amount::ZERO)
}

pub async fn reserved(service: &PostingService, warehouse_id: &str, variant_id: &str) -> Amount {
    service
        .database()
        .stock()
        .get_reservation(warehouse_id, variant_id)
        .await
        .unwrap()
        .map(|r| r.quantity)
        .unwrap_or(Amount::ZERO)
}

pub async fn movements(service: &PostingService, document_id: &str) -> Vec<StockMovement> {
    service.list_movements(document_id).await.unwrap()
}

/// Balance equals the ledger sum, and in FIFO also the lot sum.
pub async fn assert_ledger_consistent(service: &PostingService, warehouse_id: &str, variant_id: &str, fifo: bool) {
    let on_hand = balance(service, warehouse_id, variant_id).await;

    let ledger: Amount = service
        .database()
        .stock()
        .movements_for_pair(warehouse_id, variant_id)
        .await
        .unwrap()
        .iter()
        .map(|m| m.quantity)
        .sum();
    assert_eq!(on_hand, ledger, "balance vs movements of {warehouse_id}/{variant_id}");

    if fifo {
        let in_lots: Amount = service
            .list_lots(warehouse_id, variant_id)
            .await
            .unwrap()
            .iter()
            .map(|lot| lot.current_quantity)
            .sum();
        assert_eq!(on_hand, in_lots, "balance vs lots of {warehouse_id}/{variant_id}");
    }
}
