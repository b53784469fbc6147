//! # Sequence Repository
//!
//! Per-bucket counters behind document numbers.
//!
//! ```text
//! next(tx, "INCOME_2025")
//!   INSERT … VALUES (key, 1) ON CONFLICT DO UPDATE last_number + 1 RETURNING
//!   └── one statement: creates the bucket at 1 or bumps it, under the writer lock
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::pool::Tx;
use crate::repository::ts;

/// Repository for document sequence counters.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Increments the counter of `key` and returns the new value.
    ///
    /// A missing bucket starts at zero, so the first call returns 1.
    pub async fn next(&self, tx: &mut Tx, key: &str) -> DbResult<i64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO document_sequences (id, last_number, updated_at)
            VALUES (?1, 1, ?2)
            ON CONFLICT (id)
            DO UPDATE SET last_number = document_sequences.last_number + 1,
                          updated_at = excluded.updated_at
            RETURNING last_number
            "#,
        )
        .bind(key)
        .bind(ts(depot_core::now()))
        .fetch_one(&mut **tx)
        .await?;

        debug!(key = %key, value, "Allocated sequence value");
        Ok(value)
    }

    /// Last allocated value of `key`, 0 if none.
    pub async fn current(&self, key: &str) -> DbResult<i64> {
        let value: Option<i64> =
            sqlx::query_scalar("SELECT last_number FROM document_sequences WHERE id = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_next_starts_at_one_and_increments() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sequences();

        let mut tx = db.begin().await.unwrap();
        assert_eq!(repo.next(&mut tx, "INCOME_2025").await.unwrap(), 1);
        assert_eq!(repo.next(&mut tx, "INCOME_2025").await.unwrap(), 2);
        assert_eq!(repo.next(&mut tx, "ORDER_2025").await.unwrap(), 1);
        tx.commit().await.unwrap();

        assert_eq!(repo.current("INCOME_2025").await.unwrap(), 2);
        assert_eq!(repo.current("INCOME_2026").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rolled_back_allocation_is_not_kept() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sequences();

        {
            let mut tx = db.begin().await.unwrap();
            repo.next(&mut tx, "INCOME_2025").await.unwrap();
        }

        assert_eq!(repo.current("INCOME_2025").await.unwrap(), 0);
    }
}
