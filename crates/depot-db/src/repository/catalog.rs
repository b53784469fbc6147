//! # Catalog Repository
//!
//! Read-only view of the catalog (warehouses, products, variants, units,
//! categories, price types, counterparties), plus the enriched stock reads
//! that join against it.
//!
//! ## Enriched Reads
//! ```text
//! list_balances(wh, filter)
//!   stock_balances ─┬─ variants ── products ── units
//!                   └─ stock_reservations (LEFT)      → BalanceView
//!
//! search_variants(filter)
//!   variants ── products ── units  (+ EXISTS on stock_balances) → VariantView
//! ```

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::DbResult;
use crate::pool::Tx;
use crate::repository::{page, TextMatch};
use depot_core::{
    Amount, BalanceFilter, BalanceView, StockStatus, VariantFilter, VariantView, DEFAULT_PAGE_LIMIT,
};

/// Catalog tables the posting engine checks references against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTable {
    Warehouses,
    Variants,
    PriceTypes,
    Counterparties,
}

impl CatalogTable {
    fn table_name(self) -> &'static str {
        match self {
            CatalogTable::Warehouses => "warehouses",
            CatalogTable::Variants => "variants",
            CatalogTable::PriceTypes => "price_types",
            CatalogTable::Counterparties => "counterparties",
        }
    }

    /// Entity name used in not-found messages.
    pub fn entity(self) -> &'static str {
        match self {
            CatalogTable::Warehouses => "Warehouse",
            CatalogTable::Variants => "Variant",
            CatalogTable::PriceTypes => "Price type",
            CatalogTable::Counterparties => "Counterparty",
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BalanceRow {
    warehouse_id: String,
    variant_id: String,
    product_id: String,
    product_name: String,
    sku: String,
    category_id: Option<String>,
    unit_id: Option<String>,
    unit_name: Option<String>,
    quantity: Amount,
    reserved: Option<Amount>,
}

impl From<BalanceRow> for BalanceView {
    fn from(row: BalanceRow) -> Self {
        let reserved = row.reserved.unwrap_or_default();
        BalanceView {
            warehouse_id: row.warehouse_id,
            variant_id: row.variant_id,
            product_id: row.product_id,
            product_name: row.product_name,
            sku: row.sku,
            category_id: row.category_id,
            unit_id: row.unit_id,
            unit_name: row.unit_name,
            quantity: row.quantity,
            reserved,
            available: row.quantity.saturating_sub(reserved),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    variant_id: String,
    product_id: String,
    product_name: String,
    sku: String,
    category_id: Option<String>,
    unit_name: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct QuantityRow {
    variant_id: String,
    quantity: Amount,
}

/// Repository for catalog look-ups.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Whether a row with `id` exists in a catalog table.
    pub async fn exists(&self, table: CatalogTable, id: &str) -> DbResult<bool> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = ?1)", table.table_name());
        let found: bool = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(found)
    }

    /// Currency of a price type, read inside a transaction.
    pub async fn price_type_currency(&self, tx: &mut Tx, price_type_id: &str) -> DbResult<Option<String>> {
        let currency: Option<String> =
            sqlx::query_scalar("SELECT currency FROM price_types WHERE id = ?1")
                .bind(price_type_id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(currency)
    }

    /// Balances of a warehouse joined with catalog data, ordered by variant id.
    ///
    /// `available` is `quantity - reserved`.
    pub async fn list_balances(&self, warehouse_id: &str, filter: &BalanceFilter) -> DbResult<Vec<BalanceView>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT b.warehouse_id, b.variant_id, v.product_id, p.name AS product_name, v.sku,
                   p.category_id, COALESCE(v.unit_id, p.unit_id) AS unit_id, u.name AS unit_name,
                   b.quantity, r.quantity AS reserved
            FROM stock_balances b
            JOIN variants v ON v.id = b.variant_id
            JOIN products p ON p.id = v.product_id
            LEFT JOIN units u ON u.id = COALESCE(v.unit_id, p.unit_id)
            LEFT JOIN stock_reservations r
                   ON r.warehouse_id = b.warehouse_id AND r.variant_id = b.variant_id
            WHERE b.warehouse_id = "#,
        );
        qb.push_bind(warehouse_id.to_string());

        if let Some(category_id) = &filter.category_id {
            qb.push(" AND p.category_id = ").push_bind(category_id.clone());
        }
        if let Some(sku) = &filter.sku {
            qb.push(" AND v.sku = ").push_bind(sku.clone());
        }
        qb.push(" ORDER BY b.variant_id ASC");

        let rows = qb.build_query_as::<BalanceRow>().fetch_all(&self.pool).await?;

        // Decimal comparison stays in Rust; SQLite would compare TEXT.
        Ok(rows
            .into_iter()
            .filter(|row| filter.min_qty.map_or(true, |min| row.quantity >= min))
            .map(BalanceView::from)
            .collect())
    }

    /// Searches variants by name or SKU with category and stock filters.
    pub async fn search_variants(&self, filter: &VariantFilter) -> DbResult<Vec<VariantView>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT v.id AS variant_id, v.product_id, p.name AS product_name, v.sku,
                   p.category_id, u.name AS unit_name
            FROM variants v
            JOIN products p ON p.id = v.product_id
            LEFT JOIN units u ON u.id = COALESCE(v.unit_id, p.unit_id)
            WHERE 1 = 1
            "#,
        );

        if let Some(category_id) = &filter.category_id {
            qb.push(" AND p.category_id = ").push_bind(category_id.clone());
        }

        if filter.stock_status != StockStatus::All {
            qb.push(if filter.stock_status == StockStatus::InStock {
                " AND EXISTS ("
            } else {
                " AND NOT EXISTS ("
            });
            // A stored decimal is positive iff it has no sign and a non-zero digit.
            qb.push(
                "SELECT 1 FROM stock_balances b WHERE b.variant_id = v.id \
                 AND substr(b.quantity, 1, 1) <> '-' AND b.quantity GLOB '*[1-9]*'",
            );
            if let Some(warehouse_id) = &filter.warehouse_id {
                qb.push(" AND b.warehouse_id = ").push_bind(warehouse_id.clone());
            }
            qb.push(")");
        }

        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let text = filter.query.as_deref().and_then(TextMatch::new);

        qb.push(" ORDER BY p.name ASC, v.sku ASC");
        if text.is_none() {
            qb.push(" LIMIT ")
                .push_bind(i64::from(limit))
                .push(" OFFSET ")
                .push_bind(i64::from(filter.offset));
        }

        let mut rows = qb.build_query_as::<VariantRow>().fetch_all(&self.pool).await?;
        if let Some(text) = text {
            rows.retain(|row| text.matches(&row.product_name) || text.matches(&row.sku));
            rows = page(rows, limit, filter.offset);
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let on_hand = self
            .on_hand_by_variant(rows.iter().map(|r| r.variant_id.clone()), filter.warehouse_id.as_deref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| VariantView {
                on_hand: on_hand.get(&row.variant_id).copied().unwrap_or_default(),
                variant_id: row.variant_id,
                product_id: row.product_id,
                product_name: row.product_name,
                sku: row.sku,
                category_id: row.category_id,
                unit_name: row.unit_name,
            })
            .collect())
    }

    async fn on_hand_by_variant(
        &self,
        variant_ids: impl Iterator<Item = String>,
        warehouse_id: Option<&str>,
    ) -> DbResult<HashMap<String, Amount>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT variant_id, quantity FROM stock_balances WHERE variant_id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in variant_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");
        if let Some(warehouse_id) = warehouse_id {
            qb.push(" AND warehouse_id = ").push_bind(warehouse_id.to_string());
        }

        let rows = qb.build_query_as::<QuantityRow>().fetch_all(&self.pool).await?;

        let mut totals: HashMap<String, Amount> = HashMap::new();
        for row in rows {
            let total = totals.entry(row.variant_id).or_default();
            *total = total.saturating_add(row.quantity);
        }
        Ok(totals)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
