//! # Domain Types
//!
//! Core domain types used throughout Caja.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Purchase     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (unit code) │   │  id (time)      │   │  id (time)      │       │
//! │  │  price (Money)  │   │  items[]        │   │  supplier       │       │
//! │  │  stock (>= 0)   │   │  total (exact)  │   │  items[]        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Customer      │   │      User       │   │  ExternalApp    │       │
//! │  │  (lazy create)  │   │  role: Role     │   │  (reference)    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  AppData = the five-collection snapshot (purchases are write-only)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity Rules
//! - Products prefer a physical unit code (IMEI/serial) as `id`, falling
//!   back to a generic code, falling back to a synthesized time-based id
//! - Sale and purchase ids are time-derived digit strings
//! - Customer ids are the dedup key for lazy creation

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// `stock` is never negative: the normalizer clamps incoming values and the
/// store clamps every stock write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unit code (IMEI/serial) when known, else a generic or synthesized id.
    pub id: String,

    /// Display name shown in listings and on receipts.
    pub name: String,

    /// Sale price.
    pub price: Money,

    /// Current stock level, always >= 0.
    pub stock: i64,

    /// Secondary business code (often mirrors the unit code).
    pub sku: String,

    /// Free-form category, defaults to "General".
    pub category: String,
}

impl Product {
    /// Checks whether the requested quantity is covered by current stock.
    #[inline]
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Payment Type
// =============================================================================

/// How a sale is settled: immediately or on credit.
///
/// Credit sales require a named customer so the receivable can be tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    /// Paid in full at the counter.
    Contado,
    /// Sold on credit against a named customer.
    Credito,
}

impl PaymentType {
    /// Wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Contado => "contado",
            PaymentType::Credito => "credito",
        }
    }
}

impl Default for PaymentType {
    fn default() -> Self {
        PaymentType::Contado
    }
}

impl FromStr for PaymentType {
    type Err = ();

    /// Tolerant parse: anything that isn't recognizably credit is cash.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credito" | "crédito" | "credit" => Ok(PaymentType::Credito),
            _ => Ok(PaymentType::Contado),
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A line item in a sale.
///
/// `price_at_sale` freezes the product price at the moment of sale; later
/// price changes never rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_id: String,
    /// Quantity sold, >= 1.
    pub quantity: i64,
    /// Unit price at time of sale (frozen).
    pub price_at_sale: Money,
    /// Product name at time of sale (frozen).
    pub name: String,
}

impl SaleItem {
    /// Returns the line total (price_at_sale × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price_at_sale.multiply_quantity(self.quantity)
    }
}

/// A completed sale transaction. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    /// Time-derived unique id.
    pub id: String,

    /// ISO-8601 timestamp. Preserved verbatim when it came from the remote;
    /// RFC 3339 UTC when generated locally.
    pub date: String,

    /// Ordered line items.
    pub items: Vec<SaleItem>,

    /// Exact sum of line totals.
    pub total: Money,

    /// Free-form tender description ("Efectivo", "Tarjeta", ...).
    pub payment_method: String,

    /// Cash or credit settlement.
    pub payment_type: PaymentType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    /// Exchange rate captured at sale time, when the shop quotes in a
    /// second currency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<f64>,
}

/// Computes a sale total as the exact integer-cents sum of line totals.
pub fn sale_total(items: &[SaleItem]) -> Money {
    items
        .iter()
        .fold(Money::zero(), |acc, item| acc + item.line_total())
}

// =============================================================================
// Purchase
// =============================================================================

/// A line item in a supplier purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub product_id: String,
    pub quantity: i64,
    /// Unit cost from the supplier.
    pub cost: Money,
    pub name: String,
}

impl PurchaseItem {
    /// Returns the line total (cost × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.cost.multiply_quantity(self.quantity)
    }
}

/// A recorded supplier purchase.
///
/// Purchases are write-only toward the remote: they are sent to the
/// `Purchases` sheet but are not part of the snapshot and are not cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub date: String,
    pub supplier: String,
    pub items: Vec<PurchaseItem>,
    pub total: Money,
}

/// Computes a purchase total as the exact integer-cents sum of line totals.
pub fn purchase_total(items: &[PurchaseItem]) -> Money {
    items
        .iter()
        .fold(Money::zero(), |acc, item| acc + item.line_total())
}

// =============================================================================
// Customer
// =============================================================================

/// A customer record. Created lazily the first time a sale references an
/// unseen customer id; the id is the dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

// =============================================================================
// User & Role
// =============================================================================

/// User role. Gates navigation in a front end; not a security boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Seller,
    Warehouse,
}

impl Role {
    /// Wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Seller => "seller",
            Role::Warehouse => "warehouse",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Seller
    }
}

impl FromStr for Role {
    type Err = ();

    /// Tolerant parse: accepts the Spanish sheet values; unknowns become
    /// the least-privileged role.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" | "administrador" => Ok(Role::Admin),
            "warehouse" | "almacen" | "almacén" => Ok(Role::Warehouse),
            _ => Ok(Role::Seller),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user account. The password is stored and compared in plaintext,
/// faithfully to the sheet it comes from; hardening it is out of scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub role: Role,
    pub password: String,
}

// =============================================================================
// External App
// =============================================================================

/// A launcher entry for an external tool. Pure reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalApp {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub icon_name: String,
}

// =============================================================================
// App Data Snapshot
// =============================================================================

/// The five-collection snapshot held by the local cache and exchanged with
/// the remote. Purchases are deliberately absent (write-only).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub sales: Vec<Sale>,
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub apps: Vec<ExternalApp>,
}

impl AppData {
    /// True when every collection is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
            && self.sales.is_empty()
            && self.customers.is_empty()
            && self.users.is_empty()
            && self.apps.is_empty()
    }
}

// =============================================================================
// Collection
// =============================================================================

/// The remote sheet a record belongs to. The serialized name is the sheet
/// name the endpoint expects in mutation envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collection {
    Products,
    Sales,
    Purchases,
    Customers,
    Users,
    Apps,
}

impl Collection {
    /// Sheet name as the endpoint spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Products => "Products",
            Collection::Sales => "Sales",
            Collection::Purchases => "Purchases",
            Collection::Customers => "Customers",
            Collection::Users => "Users",
            Collection::Apps => "Apps",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Stock Policy
// =============================================================================

/// What to do when a sale asks for more units than the cache holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockPolicy {
    /// Floor the resulting stock at zero and record the sale as requested.
    #[serde(rename = "clamp")]
    ClampToZero,
    /// Fail the checkout before any state changes.
    #[serde(rename = "reject")]
    RejectInsufficient,
}

impl Default for StockPolicy {
    fn default() -> Self {
        StockPolicy::ClampToZero
    }
}

impl FromStr for StockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clamp" => Ok(StockPolicy::ClampToZero),
            "reject" => Ok(StockPolicy::RejectInsufficient),
            other => Err(format!("unknown stock policy: {other}")),
        }
    }
}

impl fmt::Display for StockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockPolicy::ClampToZero => f.write_str("clamp"),
            StockPolicy::RejectInsufficient => f.write_str("reject"),
        }
    }
}

// =============================================================================
// Drafts
// =============================================================================

/// Input to a checkout: the cart plus settlement details. The orchestrator
/// turns a valid draft into an immutable `Sale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDraft {
    /// Cart lines with prices already frozen by the caller.
    pub items: Vec<SaleItem>,
    pub payment_method: String,
    pub payment_type: PaymentType,
    /// Customer to attach (and lazily create) with the sale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<f64>,
}

/// Input to recording a supplier purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDraft {
    pub supplier: String,
    pub items: Vec<PurchaseItem>,
}

// =============================================================================
// Time-Derived Ids
// =============================================================================

static ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Generates a time-derived id: epoch milliseconds plus a 4-digit sequence
/// so ids stay unique within the same millisecond.
///
/// ## Example
/// ```rust
/// use caja_core::types::time_based_id;
///
/// let a = time_based_id();
/// let b = time_based_id();
/// assert_ne!(a, b);
/// assert!(a.chars().all(|c| c.is_ascii_digit()));
/// ```
pub fn time_based_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed) % 10_000;
    format!("{millis}{seq:04}")
}

/// Current time as the RFC 3339 string stored on sales and purchases.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// =============================================================================
// Unit Tests
// =============================================================================
