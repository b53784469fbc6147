//! # Price Repository
//!
//! Current price per (variant, price type). Written only by posting a
//! PRICE_UPDATE document.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::pool::Tx;
use crate::repository::ts;
use depot_core::ItemPrice;

/// Repository for item prices.
#[derive(Debug, Clone)]
pub struct PriceRepository {
    pool: SqlitePool,
}

impl PriceRepository {
    /// Creates a new PriceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PriceRepository { pool }
    }

    /// Inserts or replaces prices, keyed by (variant, price type).
    pub async fn upsert_prices(&self, tx: &mut Tx, prices: &[ItemPrice]) -> DbResult<()> {
        for price in prices {
            sqlx::query(
                r#"
                INSERT INTO item_prices (variant_id, price_type_id, price, currency, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (variant_id, price_type_id)
                DO UPDATE SET price = excluded.price,
                              currency = excluded.currency,
                              updated_at = excluded.updated_at
                "#,
            )
            .bind(&price.variant_id)
            .bind(&price.price_type_id)
            .bind(price.price)
            .bind(&price.currency)
            .bind(ts(price.updated_at))
            .execute(&mut **tx)
            .await?;
        }
        debug!(count = prices.len(), "Upserted item prices");
        Ok(())
    }

    /// Reads the current price of a variant for a price type.
    pub async fn get(&self, variant_id: &str, price_type_id: &str) -> DbResult<Option<ItemPrice>> {
        let price = sqlx::query_as::<_, ItemPrice>(
            r#"
            SELECT variant_id, price_type_id, price, currency, updated_at
            FROM item_prices
            WHERE variant_id = ?1 AND price_type_id = ?2
            "#,
        )
        .bind(variant_id)
        .bind(price_type_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::seeded_db;
    use depot_core::Amount;
    use rust_decimal_macros::dec;

    fn price(variant: &str, value: Amount) -> ItemPrice {
        ItemPrice {
            variant_id: variant.to_string(),
            price_type_id: "retail".to_string(),
            price: value,
            currency: "EUR".to_string(),
            updated_at: depot_core::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_price() {
        let db = seeded_db().await;
        let repo = db.prices();

        let mut tx = db.begin().await.unwrap();
        repo.upsert_prices(&mut tx, &[price("v-1", Amount::from(10)), price("v-2", Amount::from(3))])
            .await
            .unwrap();
        repo.upsert_prices(&mut tx, &[price("v-1", Amount::new(dec!(11.99)))])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let stored = repo.get("v-1", "retail").await.unwrap().unwrap();
        assert_eq!(stored.price, Amount::new(dec!(11.99)));
        assert_eq!(stored.currency, "EUR");
        assert!(repo.get("v-1", "wholesale").await.unwrap().is_none());

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM item_prices")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 2);
    }
}
