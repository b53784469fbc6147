//! # depot-db: Storage Gateway for the Depot Posting Engine
//!
//! All persistent reads and writes, row locks, and the transactional scope.
//! SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Depot Data Flow                                  │
//! │                                                                         │
//! │  PostingService::post_document(id)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     depot-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ DocumentRepo   │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │◄───│ StockRepo      │    │              │  │   │
//! │  │   │ begin() → Tx  │    │ SequenceRepo   │    │              │  │   │
//! │  │   │               │    │ PriceRepo      │    │              │  │   │
//! │  │   │               │    │ CatalogRepo    │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration, `Tx`
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use depot_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("depot.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! let balance = db.stock().lock_balance(&mut tx, "wh-1", "v-1").await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, Tx};

// Repository re-exports for convenience
pub use repository::catalog::{CatalogRepository, CatalogTable};
pub use repository::document::DocumentRepository;
pub use repository::price::PriceRepository;
pub use repository::sequence::SequenceRepository;
pub use repository::stock::StockRepository;
