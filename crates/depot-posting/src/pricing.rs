//! Price publisher: applies PRICE_UPDATE documents to the price table.

use tracing::debug;

use depot_core::{Document, ItemPrice, ValidationError};
use depot_db::{CatalogTable, Database, Tx};

use crate::error::{PostingError, PostingResult};

/// Writes current prices. Has no effect on stock.
#[derive(Debug, Clone)]
pub struct PricePublisher {
    db: Database,
}

impl PricePublisher {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Upserts one price per line under the document's price type.
    pub async fn publish(&self, tx: &mut Tx, doc: &Document) -> PostingResult<usize> {
        let price_type_id = doc
            .price_type_id
            .as_deref()
            .ok_or_else(|| ValidationError::required("price_type_id"))?;

        let currency = self
            .db
            .catalog()
            .price_type_currency(tx, price_type_id)
            .await?
            .ok_or_else(|| PostingError::not_found(CatalogTable::PriceTypes.entity(), price_type_id))?;

        let updated_at = depot_core::now();
        let prices = doc
            .items_in_lock_order()
            .into_iter()
            .map(|item| {
                let price = item.price.ok_or_else(|| ValidationError::required("items.price"))?;
                Ok(ItemPrice {
                    variant_id: item.variant_id.clone(),
                    price_type_id: price_type_id.to_string(),
                    price,
                    currency: currency.clone(),
                    updated_at,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        self.db.prices().upsert_prices(tx, &prices).await?;

        debug!(
            document_id = %doc.id,
            price_type_id = %price_type_id,
            count = prices.len(),
            "Published prices"
        );
        Ok(prices.len())
    }
}
