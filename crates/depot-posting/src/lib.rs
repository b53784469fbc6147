//! # depot-posting: Posting Engine
//!
//! Translates business documents into reversible stock mutations: balances,
//! FIFO lots, reservations and an append-only movement ledger.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Posting Engine                                  │
//! │                                                                         │
//! │  PostingService (service.rs)                                           │
//! │     │   drafts, reads                   post / cancel                   │
//! │     ▼                                        │                          │
//! │  QuerySurface (query.rs)                     ▼                          │
//! │                          ┌────────────────────────────────────────┐     │
//! │                          │  LifecycleController (lifecycle.rs)    │     │
//! │                          │  one Tx per transition                 │     │
//! │                          └──┬─────────┬──────────┬──────────┬─────┘     │
//! │                             ▼         ▼          ▼          ▼           │
//! │                      QuantityStrategy Reservation Price     Sequence    │
//! │                      Total | Fifo     Manager     Publisher Allocator   │
//! │                             │         │          │          │           │
//! │                             └─────────┴────┬─────┴──────────┘           │
//! │                                            ▼                            │
//! │                                  depot-db (SQLite, row locks)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`service`] - `PostingService`, the façade
//! - [`lifecycle`] - draft → posted → canceled, dispatch by document type
//! - [`strategy`] - Total and FIFO quantity strategies
//! - [`reservation`] - Order holds and their journal
//! - [`pricing`] - PRICE_UPDATE publisher
//! - [`sequence`] - Document numbers
//! - [`query`] - Available quantity, balances, variant search, audit reads
//! - [`config`] - `PostingConfig`
//! - [`error`] - `PostingError`, the closed error set
//!
//! ## Usage
//!
//! ```rust,ignore
//! use depot_core::{DocumentDraft, DocumentType, DraftItem};
//! use depot_db::{Database, DbConfig};
//! use depot_posting::{PostingConfig, PostingService};
//!
//! let db = Database::new(DbConfig::new("depot.db")).await?;
//! let service = PostingService::new(db, PostingConfig::from_env()?);
//!
//! let draft = service
//!     .create_document(DocumentDraft {
//!         doc_type: Some(DocumentType::Income),
//!         warehouse_id: Some("wh-1".into()),
//!         items: vec![DraftItem::new("v-1", 10).with_price(100)],
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! let posted = service.post_document(&draft.id, Some("alice")).await?;
//! assert_eq!(posted.number, "ПР-000001");
//! ```

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod pricing;
pub mod query;
pub mod reservation;
pub mod sequence;
pub mod service;
pub mod strategy;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, PostingConfig};
pub use error::{ErrorCode, PostingError, PostingResult};
pub use lifecycle::LifecycleController;
pub use service::PostingService;
pub use strategy::QuantityStrategy;
