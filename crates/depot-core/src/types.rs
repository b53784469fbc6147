//! # Domain Types
//!
//! Core domain types used throughout the posting engine.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Document     │   │  StockBalance   │   │   StockLot      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  warehouse_id   │   │  id (seq)       │       │
//! │  │  doc_type       │   │  variant_id     │   │  income doc     │       │
//! │  │  number         │   │  quantity       │   │  arrival_date   │       │
//! │  │  status         │   └─────────────────┘   │  current qty    │       │
//! │  │  items[]        │                         └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ StockMovement   │   │StockReservation │   │   ItemPrice     │       │
//! │  │  append-only    │   │  logical hold   │   │  per price type │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Document Lifecycle
//! ```text
//! draft ──post──▶ posted ──cancel──▶ canceled (terminal)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::decimal::Amount;
use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Accounting Policy
// =============================================================================

/// How income and outcome affect stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountingPolicy {
    /// A single balance row per (warehouse, variant), no lots.
    Total,
    /// Balance plus FIFO lots consumed oldest first.
    #[default]
    Fifo,
}

impl fmt::Display for AccountingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountingPolicy::Total => write!(f, "total"),
            AccountingPolicy::Fifo => write!(f, "fifo"),
        }
    }
}

impl FromStr for AccountingPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "total" => Ok(AccountingPolicy::Total),
            "fifo" => Ok(AccountingPolicy::Fifo),
            _ => Err(ValidationError::NotAllowed {
                field: "accounting_policy".to_string(),
                allowed: vec!["total".to_string(), "fifo".to_string()],
            }),
        }
    }
}

// =============================================================================
// Document Type
// =============================================================================

/// The business meaning of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    /// Goods received.
    Income,
    /// Goods issued.
    Outcome,
    /// Customer order (reserves stock).
    Order,
    /// Move between two warehouses.
    Transfer,
    /// Stock count with absolute target quantities.
    Inventory,
    /// Publishes prices of one price type.
    PriceUpdate,
}

impl DocumentType {
    /// All document types.
    pub const ALL: [DocumentType; 6] = [
        DocumentType::Income,
        DocumentType::Outcome,
        DocumentType::Order,
        DocumentType::Transfer,
        DocumentType::Inventory,
        DocumentType::PriceUpdate,
    ];

    /// Upper-case code, as stored and as used in sequence keys.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Income => "INCOME",
            DocumentType::Outcome => "OUTCOME",
            DocumentType::Order => "ORDER",
            DocumentType::Transfer => "TRANSFER",
            DocumentType::Inventory => "INVENTORY",
            DocumentType::PriceUpdate => "PRICE_UPDATE",
        }
    }

    /// Whether posting this type touches physical stock.
    pub const fn moves_stock(&self) -> bool {
        matches!(
            self,
            DocumentType::Income
                | DocumentType::Outcome
                | DocumentType::Transfer
                | DocumentType::Inventory
        )
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: DocumentType::ALL
                    .iter()
                    .map(|t| t.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Document Status
// =============================================================================

/// Lifecycle state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Editable, no side effects applied.
    #[default]
    Draft,
    /// Side effects applied.
    Posted,
    /// Side effects reversed. Terminal.
    Canceled,
}

impl DocumentStatus {
    /// Validates a lifecycle step and returns the target status.
    ///
    /// ## Allowed Transitions
    /// ```text
    /// Draft  ──▶ Posted
    /// Posted ──▶ Canceled
    /// ```
    pub fn transition(self, to: DocumentStatus, document_id: &str) -> CoreResult<DocumentStatus> {
        match (self, to) {
            (DocumentStatus::Draft, DocumentStatus::Posted)
            | (DocumentStatus::Posted, DocumentStatus::Canceled) => Ok(to),
            _ => Err(CoreError::IllegalTransition {
                document_id: document_id.to_string(),
                from: self,
                to,
            }),
        }
    }

    /// Header and items may only change in draft.
    #[inline]
    pub fn is_editable(&self) -> bool {
        matches!(self, DocumentStatus::Draft)
    }

    /// Lower-case code, as stored.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Posted => "posted",
            DocumentStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Movement Type
// =============================================================================

/// Kind of ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Positive, from an income document.
    Income,
    /// Negative, from an outcome document.
    Outcome,
    /// Either sign, one row per side of a transfer.
    Transfer,
    /// Signed delta from a stock count.
    Inventory,
    /// Inverse of a prior movement, written on cancel.
    Cancel,
}

impl MovementType {
    /// Movement type written when posting a document of `doc_type`.
    pub const fn for_document(doc_type: DocumentType) -> MovementType {
        match doc_type {
            DocumentType::Outcome => MovementType::Outcome,
            DocumentType::Transfer => MovementType::Transfer,
            DocumentType::Inventory => MovementType::Inventory,
            _ => MovementType::Income,
        }
    }
}

// =============================================================================
// Document
// =============================================================================

/// A line of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentItem {
    pub id: String,
    pub document_id: String,
    pub variant_id: String,
    /// Absolute target for INVENTORY, moved quantity otherwise.
    pub quantity: Amount,
    pub price: Option<Amount>,
}

/// A business document: header, status, and lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// UUID v4.
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    /// Human-readable number ("ПР-000001"); empty until allocated.
    pub number: String,
    pub warehouse_id: Option<String>,
    pub to_warehouse_id: Option<String>,
    pub counterparty_id: Option<String>,
    pub price_type_id: Option<String>,
    /// For OUTCOME: the ORDER whose reservation it consumes.
    pub base_document_id: Option<String>,
    pub comment: String,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
    pub items: Vec<DocumentItem>,
}

impl Document {
    /// Items ordered by variant id, the order rows are locked in.
    pub fn items_in_lock_order(&self) -> Vec<&DocumentItem> {
        let mut items: Vec<&DocumentItem> = self.items.iter().collect();
        items.sort_by(|a, b| a.variant_id.cmp(&b.variant_id));
        items
    }

    /// Warehouse a stock document posts against.
    pub fn require_warehouse(&self) -> Result<&str, ValidationError> {
        self.warehouse_id
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .ok_or_else(|| ValidationError::required("warehouse_id"))
    }

    /// Destination of a transfer.
    pub fn require_to_warehouse(&self) -> Result<&str, ValidationError> {
        self.to_warehouse_id
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .ok_or_else(|| ValidationError::required("to_warehouse_id"))
    }
}

/// Input for creating or replacing a draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    /// Set when updating an existing draft.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<DocumentType>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub warehouse_id: Option<String>,
    #[serde(default)]
    pub to_warehouse_id: Option<String>,
    #[serde(default)]
    pub counterparty_id: Option<String>,
    #[serde(default)]
    pub price_type_id: Option<String>,
    #[serde(default)]
    pub base_document_id: Option<String>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub items: Vec<DraftItem>,
}

/// A line of a [`DocumentDraft`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftItem {
    pub variant_id: String,
    pub quantity: Amount,
    #[serde(default)]
    pub price: Option<Amount>,
}

impl DraftItem {
    /// Convenience constructor.
    pub fn new(variant_id: impl Into<String>, quantity: impl Into<Amount>) -> Self {
        DraftItem {
            variant_id: variant_id.into(),
            quantity: quantity.into(),
            price: None,
        }
    }

    /// Sets the unit price.
    pub fn with_price(mut self, price: impl Into<Amount>) -> Self {
        self.price = Some(price.into());
        self
    }
}

/// An append-only lifecycle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct DocumentHistory {
    pub id: i64,
    pub document_id: String,
    /// `None` for the creation row.
    pub from_status: Option<DocumentStatus>,
    pub to_status: DocumentStatus,
    pub actor: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "created_at"))]
    pub timestamp: DateTime<Utc>,
    pub note: String,
}

// =============================================================================
// Stock
// =============================================================================

/// On-hand quantity of a variant at a warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct StockBalance {
    pub warehouse_id: String,
    pub variant_id: String,
    pub quantity: Amount,
    pub updated_at: DateTime<Utc>,
}

impl StockBalance {
    /// A zero balance for a pair that has never moved.
    pub fn empty(warehouse_id: &str, variant_id: &str) -> Self {
        StockBalance {
            warehouse_id: warehouse_id.to_string(),
            variant_id: variant_id.to_string(),
            quantity: Amount::zero(),
            updated_at: Utc::now(),
        }
    }
}

/// A FIFO parcel from one income event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct StockLot {
    /// Monotonic; breaks arrival-date ties.
    pub id: i64,
    pub warehouse_id: String,
    pub variant_id: String,
    pub income_document_id: String,
    pub arrival_date: DateTime<Utc>,
    pub initial_quantity: Amount,
    pub current_quantity: Amount,
    pub unit_cost: Amount,
}

/// A lot to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLot {
    pub warehouse_id: String,
    pub variant_id: String,
    pub income_document_id: String,
    pub arrival_date: DateTime<Utc>,
    pub quantity: Amount,
    pub unit_cost: Amount,
}

/// Logical hold created by posted orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct StockReservation {
    pub warehouse_id: String,
    pub variant_id: String,
    pub quantity: Amount,
    pub updated_at: DateTime<Utc>,
}

impl StockReservation {
    /// A zero reservation.
    pub fn empty(warehouse_id: &str, variant_id: &str) -> Self {
        StockReservation {
            warehouse_id: warehouse_id.to_string(),
            variant_id: variant_id.to_string(),
            quantity: Amount::zero(),
            updated_at: Utc::now(),
        }
    }
}

/// A signed change to a reservation, recorded per document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ReservationEntry {
    pub id: i64,
    pub document_id: String,
    pub warehouse_id: String,
    pub variant_id: String,
    pub quantity: Amount,
    pub created_at: DateTime<Utc>,
}

/// An immutable ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: i64,
    pub document_id: String,
    pub variant_id: String,
    pub warehouse_id: String,
    /// Signed.
    pub quantity: Amount,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub movement_type: MovementType,
    pub source_lot_id: Option<i64>,
    pub unit_cost: Option<Amount>,
    pub created_at: DateTime<Utc>,
}

/// A movement to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub document_id: String,
    pub variant_id: String,
    pub warehouse_id: String,
    pub quantity: Amount,
    pub movement_type: MovementType,
    pub source_lot_id: Option<i64>,
    pub unit_cost: Option<Amount>,
}

// =============================================================================
// Prices
// =============================================================================

/// Current price of a variant for one price type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ItemPrice {
    pub variant_id: String,
    pub price_type_id: String,
    pub price: Amount,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Query DTOs
// =============================================================================

/// Filter for [`BalanceView`] listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceFilter {
    pub category_id: Option<String>,
    /// Exact SKU match.
    pub sku: Option<String>,
    /// Only balances with quantity ≥ this value.
    pub min_qty: Option<Amount>,
}

/// A balance row joined with catalog data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub warehouse_id: String,
    pub variant_id: String,
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub category_id: Option<String>,
    pub unit_id: Option<String>,
    pub unit_name: Option<String>,
    pub quantity: Amount,
    pub reserved: Amount,
    pub available: Amount,
}

/// Stock-status filter for variant search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    All,
    InStock,
    OutOfStock,
}

/// Default page size for searches.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Filter for variant search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantFilter {
    /// Case-insensitive substring of product name or SKU.
    pub query: Option<String>,
    pub category_id: Option<String>,
    #[serde(default)]
    pub stock_status: StockStatus,
    /// Scopes the stock-status filter and `on_hand` to one warehouse.
    pub warehouse_id: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

/// A variant search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantView {
    pub variant_id: String,
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub category_id: Option<String>,
    pub unit_name: Option<String>,
    pub on_hand: Amount,
}

/// Filter for document listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFilter {
    /// Substring of number or comment.
    pub search: Option<String>,
    pub status: Option<DocumentStatus>,
    #[serde(default)]
    pub types: Vec<DocumentType>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

/// A document header row for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub doc_type: DocumentType,
    pub number: String,
    pub status: DocumentStatus,
    pub warehouse_id: Option<String>,
    pub warehouse_name: Option<String>,
    pub to_warehouse_id: Option<String>,
    pub counterparty_id: Option<String>,
    pub comment: String,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================
