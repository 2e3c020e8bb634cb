//! # Local Cache Store
//!
//! The working copy of all business data, held in memory and shared across
//! the sync service, the checkout flow, and the CLI.
//!
//! ## Write Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Who Writes What                                     │
//! │                                                                         │
//! │  Remote refresh ──► replace_all()                                      │
//! │    Replaces a collection ONLY when the incoming copy is non-empty.     │
//! │    A server that answers with [] (cold sheet, auth hiccup) must not    │
//! │    wipe sales recorded offline.                                        │
//! │                                                                         │
//! │  Checkout ──► apply_stock_level(), append_sale(), upsert_customer()    │
//! │    Runs synchronously BEFORE any network delivery is attempted, so     │
//! │    the register keeps working when the link is down.                   │
//! │                                                                         │
//! │  Admin actions ──► append_user(), append_app(), remove_app()           │
//! │                                                                         │
//! │  Stock levels are absolute values, clamped to zero. The remote side    │
//! │  receives the same absolute value, so replaying a stock update is      │
//! │  idempotent.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All operations are synchronous and hold the lock only for the duration
//! of the call. Nothing here touches the network or the filesystem.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use caja_core::{AppData, Collection, Customer, ExternalApp, Product, Sale, User};

// =============================================================================
// Replace Report
// =============================================================================

/// Outcome of a [`Store::replace_all`] call.
///
/// Lists which collections were overwritten by the incoming snapshot and
/// which kept their local copy because the incoming version was empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaceReport {
    /// Collections overwritten with incoming data.
    pub replaced: Vec<Collection>,

    /// Collections left untouched because the incoming copy was empty.
    pub kept: Vec<Collection>,
}

impl ReplaceReport {
    /// Returns true if at least one collection was overwritten.
    pub fn any_replaced(&self) -> bool {
        !self.replaced.is_empty()
    }
}

// =============================================================================
// Store
// =============================================================================

/// Shared in-memory cache of all business data.
///
/// Cheap to clone; all clones point at the same underlying state.
///
/// ## Usage
/// ```
/// use caja_store::Store;
///
/// let store = Store::new();
/// let for_worker = store.clone();
///
/// assert!(store.snapshot().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct Store {
    data: Arc<RwLock<AppData>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.data.read();
        f.debug_struct("Store")
            .field("products", &data.products.len())
            .field("sales", &data.sales.len())
            .field("customers", &data.customers.len())
            .field("users", &data.users.len())
            .field("apps", &data.apps.len())
            .finish()
    }
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Store {
            data: Arc::new(RwLock::new(AppData::default())),
        }
    }

    /// Creates a store pre-filled with the given data.
    pub fn with_data(data: AppData) -> Self {
        Store {
            data: Arc::new(RwLock::new(data)),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Returns a full copy of the current state.
    ///
    /// Checkout takes one of these BEFORE computing stock deltas so every
    /// line in a sale is priced against the same pre-transaction view.
    pub fn snapshot(&self) -> AppData {
        self.data.read().clone()
    }

    /// Returns a copy of the product list.
    pub fn products(&self) -> Vec<Product> {
        self.data.read().products.clone()
    }

    /// Returns a copy of the sales list.
    pub fn sales(&self) -> Vec<Sale> {
        self.data.read().sales.clone()
    }

    /// Returns a copy of the customer list.
    pub fn customers(&self) -> Vec<Customer> {
        self.data.read().customers.clone()
    }

    /// Returns a copy of the user list.
    pub fn users(&self) -> Vec<User> {
        self.data.read().users.clone()
    }

    /// Returns a copy of the external app list.
    pub fn apps(&self) -> Vec<ExternalApp> {
        self.data.read().apps.clone()
    }

    /// Looks up a product by ID.
    pub fn find_product(&self, id: &str) -> Option<Product> {
        self.data.read().products.iter().find(|p| p.id == id).cloned()
    }

    /// Returns true if every collection is empty (fresh install, no snapshot).
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    // =========================================================================
    // Remote refresh
    // =========================================================================

    /// Merges a freshly fetched snapshot into the store.
    ///
    /// Each collection is replaced only when the incoming copy is non-empty.
    /// An empty collection in the response means "the server had nothing to
    /// say", not "delete everything local".
    pub fn replace_all(&self, incoming: AppData) -> ReplaceReport {
        let mut report = ReplaceReport::default();
        let mut data = self.data.write();

        macro_rules! merge {
            ($field:ident, $collection:expr) => {
                if incoming.$field.is_empty() {
                    report.kept.push($collection);
                } else {
                    data.$field = incoming.$field;
                    report.replaced.push($collection);
                }
            };
        }

        merge!(products, Collection::Products);
        merge!(sales, Collection::Sales);
        merge!(customers, Collection::Customers);
        merge!(users, Collection::Users);
        merge!(apps, Collection::Apps);

        debug!(
            replaced = report.replaced.len(),
            kept = report.kept.len(),
            "Merged remote snapshot"
        );
        report
    }

    // =========================================================================
    // Local mutations
    // =========================================================================

    /// Sets a product's stock to an absolute level, clamped at zero.
    ///
    /// Returns false when no product with that ID exists locally. Callers
    /// may still forward the update to the remote side; the sheet can know
    /// products this cache has not seen yet.
    pub fn apply_stock_level(&self, product_id: &str, new_stock: i64) -> bool {
        let mut data = self.data.write();
        match data.products.iter_mut().find(|p| p.id == product_id) {
            Some(product) => {
                product.stock = new_stock.max(0);
                true
            }
            None => {
                debug!(product_id = %product_id, "Stock update for unknown product");
                false
            }
        }
    }

    /// Appends a completed sale to the ledger.
    pub fn append_sale(&self, sale: Sale) {
        self.data.write().sales.push(sale);
    }

    /// Adds a customer if no customer with the same ID exists.
    ///
    /// Returns true when the customer was inserted, false when a record
    /// with that ID was already present (the existing record wins).
    pub fn upsert_customer(&self, customer: Customer) -> bool {
        let mut data = self.data.write();
        if data.customers.iter().any(|c| c.id == customer.id) {
            return false;
        }
        data.customers.push(customer);
        true
    }

    /// Appends a user account.
    pub fn append_user(&self, user: User) {
        self.data.write().users.push(user);
    }

    /// Appends an external app shortcut.
    pub fn append_app(&self, app: ExternalApp) {
        self.data.write().apps.push(app);
    }

    /// Removes an external app shortcut by ID.
    ///
    /// Returns true if an app was removed.
    pub fn remove_app(&self, app_id: &str) -> bool {
        let mut data = self.data.write();
        let before = data.apps.len();
        data.apps.retain(|a| a.id != app_id);
        data.apps.len() < before
    }
}
