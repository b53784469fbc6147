//! # depot-core: Pure Domain Logic for the Depot Posting Engine
//!
//! Everything the posting engine knows about documents and stock that does
//! not need a database: decimal arithmetic, domain types, the document state
//! machine, numbering format and validation rules.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Depot Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              depot-posting (PostingService, depotctl)           │   │
//! │  │   lifecycle ──► strategies / reservations / prices / sequence  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ depot-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  decimal  │  │ numbering │  │ validation│  │   │
//! │  │   │ Document  │  │  Amount   │  │  ПР-0001  │  │   rules   │  │   │
//! │  │   │  Status   │  │           │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   depot-db (Storage Gateway)                    │   │
//! │  │          SQLite queries, row locks, migrations, repositories    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`decimal`] - `Amount`, fixed-point quantities and prices
//! - [`types`] - Documents, stock rows, query DTOs
//! - [`error`] - Domain error types
//! - [`validation`] - Draft and posting preconditions
//! - [`numbering`] - Sequence keys and document numbers
//!
//! ## Example Usage
//!
//! ```rust
//! use depot_core::{Amount, DocumentStatus};
//!
//! let on_hand: Amount = "20".parse().unwrap();
//! let reserved: Amount = "15".parse().unwrap();
//! assert_eq!((on_hand - reserved).to_string(), "5.0000");
//!
//! assert!(DocumentStatus::Draft.transition(DocumentStatus::Posted, "doc-1").is_ok());
//! assert!(DocumentStatus::Canceled.transition(DocumentStatus::Posted, "doc-1").is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod decimal;
pub mod error;
pub mod numbering;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use decimal::Amount;
pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

/// Generates a new document or item identifier (UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time at the precision timestamps are persisted with (microseconds).
pub fn now() -> chrono::DateTime<chrono::Utc> {
    use chrono::SubsecRound;
    chrono::Utc::now().trunc_subsecs(6)
}
