//! # Document Repository
//!
//! Documents, their items, and the lifecycle history.
//!
//! ## Document Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert()            → documents + document_items, status draft        │
//! │  update_draft()      → header replaced, items deleted and re-inserted  │
//! │  delete()            → cascades items and history                      │
//! │  get_for_update()    → locks the document row inside a Tx              │
//! │  save()              → number / status / posted_at                     │
//! │  insert_history()    → append-only log row                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::pool::Tx;
use crate::repository::{page, ts, TextMatch};
use depot_core::{
    Amount, Document, DocumentFilter, DocumentHistory, DocumentItem, DocumentStatus,
    DocumentSummary, DocumentType, DEFAULT_PAGE_LIMIT,
};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    #[sqlx(rename = "type")]
    doc_type: DocumentType,
    number: String,
    warehouse_id: Option<String>,
    to_warehouse_id: Option<String>,
    counterparty_id: Option<String>,
    price_type_id: Option<String>,
    base_document_id: Option<String>,
    comment: String,
    status: DocumentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    posted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    document_id: String,
    variant_id: String,
    quantity: Amount,
    price: Option<Amount>,
}

impl From<ItemRow> for DocumentItem {
    fn from(row: ItemRow) -> Self {
        DocumentItem {
            id: row.id,
            document_id: row.document_id,
            variant_id: row.variant_id,
            quantity: row.quantity,
            price: row.price,
        }
    }
}

impl DocumentRow {
    fn into_document(self, items: Vec<ItemRow>) -> Document {
        Document {
            id: self.id,
            doc_type: self.doc_type,
            number: self.number,
            warehouse_id: self.warehouse_id,
            to_warehouse_id: self.to_warehouse_id,
            counterparty_id: self.counterparty_id,
            price_type_id: self.price_type_id,
            base_document_id: self.base_document_id,
            comment: self.comment,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            posted_at: self.posted_at,
            items: items.into_iter().map(DocumentItem::from).collect(),
        }
    }
}

const SELECT_DOCUMENT: &str = r#"
    SELECT id, type, number, warehouse_id, to_warehouse_id, counterparty_id,
           price_type_id, base_document_id, comment, status,
           created_at, updated_at, posted_at
    FROM documents
    WHERE id = ?1
"#;

const SELECT_ITEMS: &str = r#"
    SELECT id, document_id, variant_id, quantity, price
    FROM document_items
    WHERE document_id = ?1
    ORDER BY line_no
"#;

async fn fetch_document(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Document>> {
    let row: Option<DocumentRow> = sqlx::query_as(SELECT_DOCUMENT)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items: Vec<ItemRow> = sqlx::query_as(SELECT_ITEMS)
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(Some(row.into_document(items)))
}

async fn insert_items(conn: &mut SqliteConnection, doc: &Document) -> DbResult<()> {
    for (line_no, item) in doc.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO document_items (id, document_id, line_no, variant_id, quantity, price)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&item.id)
        .bind(&doc.id)
        .bind(line_no as i64)
        .bind(&item.variant_id)
        .bind(item.quantity)
        .bind(item.price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for document database operations.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    /// Creates a new DocumentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    /// Gets a document with its items.
    pub async fn get(&self, id: &str) -> DbResult<Option<Document>> {
        let mut conn = self.pool.acquire().await?;
        fetch_document(&mut conn, id).await
    }

    /// Reads a document inside a transaction without locking it.
    pub async fn get_in_tx(&self, tx: &mut Tx, id: &str) -> DbResult<Option<Document>> {
        fetch_document(tx, id).await
    }

    /// Locks the document row and reads it with its items.
    ///
    /// Returns `None` if the document does not exist.
    pub async fn get_for_update(&self, tx: &mut Tx, id: &str) -> DbResult<Option<Document>> {
        sqlx::query("UPDATE documents SET updated_at = updated_at WHERE id = ?1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        fetch_document(tx, id).await
    }

    /// Inserts a new document with its items.
    pub async fn insert(&self, tx: &mut Tx, doc: &Document) -> DbResult<()> {
        debug!(id = %doc.id, doc_type = %doc.doc_type, items = doc.items.len(), "Inserting document");

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, type, number, warehouse_id, to_warehouse_id, counterparty_id,
                price_type_id, base_document_id, comment, status,
                created_at, updated_at, posted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&doc.id)
        .bind(doc.doc_type)
        .bind(&doc.number)
        .bind(&doc.warehouse_id)
        .bind(&doc.to_warehouse_id)
        .bind(&doc.counterparty_id)
        .bind(&doc.price_type_id)
        .bind(&doc.base_document_id)
        .bind(&doc.comment)
        .bind(doc.status)
        .bind(ts(doc.created_at))
        .bind(ts(doc.updated_at))
        .bind(doc.posted_at.map(ts))
        .execute(&mut **tx)
        .await?;

        insert_items(tx, doc).await
    }

    /// Replaces header fields and items of a document.
    pub async fn update_draft(&self, tx: &mut Tx, doc: &Document) -> DbResult<()> {
        debug!(id = %doc.id, items = doc.items.len(), "Replacing draft");

        sqlx::query(
            r#"
            UPDATE documents SET
                number = ?2,
                warehouse_id = ?3,
                to_warehouse_id = ?4,
                counterparty_id = ?5,
                price_type_id = ?6,
                base_document_id = ?7,
                comment = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.number)
        .bind(&doc.warehouse_id)
        .bind(&doc.to_warehouse_id)
        .bind(&doc.counterparty_id)
        .bind(&doc.price_type_id)
        .bind(&doc.base_document_id)
        .bind(&doc.comment)
        .bind(ts(doc.updated_at))
        .execute(&mut **tx)
        .await?;

        sqlx::query("DELETE FROM document_items WHERE document_id = ?1")
            .bind(&doc.id)
            .execute(&mut **tx)
            .await?;

        insert_items(tx, doc).await
    }

    /// Deletes a document; items and history go with it.
    pub async fn delete(&self, tx: &mut Tx, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting document");

        sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Persists number, status and timestamps after a transition.
    pub async fn save(&self, tx: &mut Tx, doc: &Document) -> DbResult<()> {
        debug!(id = %doc.id, number = %doc.number, status = %doc.status, "Saving document state");

        sqlx::query(
            r#"
            UPDATE documents SET
                number = ?2,
                status = ?3,
                posted_at = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.number)
        .bind(doc.status)
        .bind(doc.posted_at.map(ts))
        .bind(ts(doc.updated_at))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Appends a history row.
    pub async fn insert_history(
        &self,
        tx: &mut Tx,
        document_id: &str,
        from: Option<DocumentStatus>,
        to: DocumentStatus,
        actor: Option<&str>,
        note: &str,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO document_histories (document_id, from_status, to_status, actor, note, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(document_id)
        .bind(from)
        .bind(to)
        .bind(actor)
        .bind(note)
        .bind(ts(depot_core::now()))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Lists history rows of a document, oldest first.
    pub async fn list_history(&self, document_id: &str) -> DbResult<Vec<DocumentHistory>> {
        let rows = sqlx::query_as::<_, DocumentHistory>(
            r#"
            SELECT id, document_id, from_status, to_status, actor, note, created_at
            FROM document_histories
            WHERE document_id = ?1
            ORDER BY id
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Lists document headers matching a filter, newest first.
    pub async fn list(&self, filter: &DocumentFilter) -> DbResult<Vec<DocumentSummary>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT d.id, d.type, d.number, d.status, d.warehouse_id,
                   w.name AS warehouse_name, d.to_warehouse_id, d.counterparty_id,
                   d.comment, d.created_at, d.posted_at,
                   (SELECT COUNT(*) FROM document_items i WHERE i.document_id = d.id) AS item_count
            FROM documents d
            LEFT JOIN warehouses w ON w.id = d.warehouse_id
            WHERE 1 = 1
            "#,
        );

        if let Some(status) = filter.status {
            qb.push(" AND d.status = ").push_bind(status);
        }

        if !filter.types.is_empty() {
            qb.push(" AND d.type IN (");
            let mut separated = qb.separated(", ");
            for doc_type in &filter.types {
                separated.push_bind(*doc_type);
            }
            separated.push_unseparated(")");
        }

        if let Some(from) = filter.date_from {
            qb.push(" AND d.created_at >= ").push_bind(ts(from));
        }
        if let Some(to) = filter.date_to {
            qb.push(" AND d.created_at <= ").push_bind(ts(to));
        }

        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let text = filter.search.as_deref().and_then(TextMatch::new);

        qb.push(" ORDER BY d.created_at DESC, d.id DESC");
        if text.is_none() {
            qb.push(" LIMIT ")
                .push_bind(i64::from(limit))
                .push(" OFFSET ")
                .push_bind(i64::from(filter.offset));
        }

        let rows = qb
            .build_query_as::<DocumentSummary>()
            .fetch_all(&self.pool)
            .await?;

        // Text matching folds Unicode case, which SQLite cannot.
        Ok(match text {
            Some(text) => page(
                rows.into_iter()
                    .filter(|row| text.matches(&row.number) || text.matches(&row.comment))
                    .collect(),
                limit,
                filter.offset,
            ),
            None => rows,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::seeded_db;
    use depot_core::new_id;
    use rust_decimal_macros::dec;

    fn income(id: &str, comment: &str) -> Document {
        let now = depot_core::now();
        Document {
            id: id.to_string(),
            doc_type: DocumentType::Income,
            number: String::new(),
            warehouse_id: Some("wh-1".to_string()),
            to_warehouse_id: None,
            counterparty_id: None,
            price_type_id: None,
            base_document_id: None,
            comment: comment.to_string(),
            status: DocumentStatus::Draft,
            created_at: now,
            updated_at: now,
            posted_at: None,
            items: vec![
                DocumentItem {
                    id: new_id(),
                    document_id: id.to_string(),
                    variant_id: "v-2".to_string(),
                    quantity: Amount::new(dec!(2.5)),
                    price: Some(Amount::from(40)),
                },
                DocumentItem {
                    id: new_id(),
                    document_id: id.to_string(),
                    variant_id: "v-1".to_string(),
                    quantity: Amount::from(10),
                    price: None,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_preserves_items_in_order() {
        let db = seeded_db().await;
        let repo = db.documents();
        let doc = income("doc-1", "first delivery");

        let mut tx = db.begin().await.unwrap();
        repo.insert(&mut tx, &doc).await.unwrap();
        tx.commit().await.unwrap();

        let loaded = repo.get("doc-1").await.unwrap().unwrap();
        assert_eq!(loaded, doc);
        assert_eq!(loaded.items[0].variant_id, "v-2");
        assert_eq!(loaded.items[0].quantity, Amount::new(dec!(2.5)));
        assert_eq!(loaded.items[1].price, None);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let db = seeded_db().await;
        assert!(db.documents().get("nope").await.unwrap().is_none());

        let mut tx = db.begin().await.unwrap();
        assert!(db.documents().get_for_update(&mut tx, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_draft_replaces_items() {
        let db = seeded_db().await;
        let repo = db.documents();
        let mut doc = income("doc-1", "");

        let mut tx = db.begin().await.unwrap();
        repo.insert(&mut tx, &doc).await.unwrap();
        doc.items.truncate(1);
        doc.comment = "corrected".to_string();
        repo.update_draft(&mut tx, &doc).await.unwrap();
        tx.commit().await.unwrap();

        let loaded = repo.get("doc-1").await.unwrap().unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.comment, "corrected");
    }

    #[tokio::test]
    async fn test_save_and_history() {
        let db = seeded_db().await;
        let repo = db.documents();
        let mut doc = income("doc-1", "");

        let mut tx = db.begin().await.unwrap();
        repo.insert(&mut tx, &doc).await.unwrap();
        repo.insert_history(&mut tx, "doc-1", None, DocumentStatus::Draft, None, "created")
            .await
            .unwrap();
        doc.number = "ПР-000001".to_string();
        doc.status = DocumentStatus::Posted;
        doc.posted_at = Some(depot_core::now());
        repo.save(&mut tx, &doc).await.unwrap();
        repo.insert_history(
            &mut tx,
            "doc-1",
            Some(DocumentStatus::Draft),
            DocumentStatus::Posted,
            Some("alice"),
            "",
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let loaded = repo.get("doc-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, DocumentStatus::Posted);
        assert_eq!(loaded.number, "ПР-000001");
        assert!(loaded.posted_at.is_some());

        let history = repo.list_history("doc-1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from_status, None);
        assert_eq!(history[1].from_status, Some(DocumentStatus::Draft));
        assert_eq!(history[1].actor.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let db = seeded_db().await;
        let repo = db.documents();

        let mut tx = db.begin().await.unwrap();
        repo.insert(&mut tx, &income("doc-1", "")).await.unwrap();
        repo.delete(&mut tx, "doc-1").await.unwrap();
        tx.commit().await.unwrap();

        assert!(repo.get("doc-1").await.unwrap().is_none());
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(items, 0);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = seeded_db().await;
        let repo = db.documents();

        let mut tx = db.begin().await.unwrap();
        repo.insert(&mut tx, &income("doc-1", "weekly 50% milk")).await.unwrap();
        repo.insert(&mut tx, &income("doc-2", "bread")).await.unwrap();
        tx.commit().await.unwrap();

        let all = repo.list(&DocumentFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].item_count, 2);
        assert_eq!(all[0].warehouse_name.as_deref(), Some("Main"));

        let by_comment = repo
            .list(&DocumentFilter {
                search: Some("50%".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_comment.len(), 1);
        assert_eq!(by_comment[0].id, "doc-1");

        let mut tx = db.begin().await.unwrap();
        repo.insert(&mut tx, &income("doc-3", "Поставка от завода")).await.unwrap();
        tx.commit().await.unwrap();
        let cyrillic = repo
            .list(&DocumentFilter {
                search: Some("ПОСТАВКА".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cyrillic.len(), 1);
        assert_eq!(cyrillic[0].id, "doc-3");

        let orders = repo
            .list(&DocumentFilter {
                types: vec![DocumentType::Order, DocumentType::Outcome],
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(orders.is_empty());

        let paged = repo
            .list(&DocumentFilter {
                limit: Some(1),
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(paged.len(), 1);
    }
}
