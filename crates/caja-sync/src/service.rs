//! # Sync Service
//!
//! The facade the application talks to. Owns the cache, the remote
//! client, and the write queue, and enforces the one rule the rest of
//! the crate is built around: reads and commits are local and
//! synchronous, remote traffic happens off the critical path.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SyncService                                     │
//! │                                                                         │
//! │   bootstrap ──► disk snapshot ──► starter seed ──► first refresh       │
//! │                                                                         │
//! │   refresh ────► RemoteClient.fetch ──ok──► Store.replace_all           │
//! │                        │                        │                       │
//! │                        │ err (absorbed)         └──► snapshot.json     │
//! │                        ▼                                                │
//! │                 cached data returned, register keeps selling           │
//! │                                                                         │
//! │   checkout ───► validate ──► commit to Store ──► WriteQueue            │
//! │   update_stock, add_customer, add_user, add_app, remove_app:           │
//! │                 same shape, one mutation each                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `refresh` never returns an error. A register with a dead uplink keeps
//! working from the cache; the failure is logged, reported through
//! [`SyncEvents`], and retried on the next refresh.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use caja_core::{AppData, Customer, ExternalApp, PurchaseDraft, SaleDraft, User};
use caja_store::{starter_data, SnapshotFile, Store};

use crate::checkout::{self, CheckoutReceipt, PurchaseReceipt};
use crate::client::RemoteClient;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::protocol::{self, OutboundMutation};
use crate::queue::{WriteQueue, WriteQueueHandle};

// =============================================================================
// Sync Events
// =============================================================================

/// Observer hooks for a UI layer. All methods default to no-ops so an
/// implementor only overrides what it displays.
pub trait SyncEvents: Send + Sync {
    /// A fetch succeeded and the cache was replaced with merged data.
    fn data_refreshed(&self, data: &AppData) {
        let _ = data;
    }

    /// A fetch failed and was absorbed; the cache kept serving.
    fn refresh_failed(&self, error: &SyncError) {
        let _ = error;
    }

    /// The queue worker delivered a mutation to the remote.
    fn mutation_sent(&self, mutation: &OutboundMutation) {
        let _ = mutation;
    }

    /// The queue worker gave up on a mutation.
    fn mutation_dropped(&self, mutation: &OutboundMutation, error: &SyncError) {
        let _ = (mutation, error);
    }
}

/// Default observer that ignores every event.
pub struct NoOpEvents;

impl SyncEvents for NoOpEvents {}

// =============================================================================
// Sync Status
// =============================================================================

/// Point-in-time view of the sync layer, for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    /// The configured remote endpoint.
    pub endpoint: String,

    /// Mutations waiting for or in delivery.
    pub pending: usize,

    /// Mutations delivered since startup.
    pub sent: u64,

    /// Mutations dropped after exhausting delivery attempts.
    pub dropped: u64,

    /// When the cache last merged a successful fetch, if ever.
    pub last_refresh: Option<DateTime<Utc>>,
}

// =============================================================================
// Sync Service
// =============================================================================

/// Owns the local cache and all remote synchronization.
///
/// ## Usage
/// ```rust,ignore
/// let config = SyncConfig::load_or_default(None);
/// let service = SyncService::new(config, Store::new())?;
///
/// service.bootstrap().await;                  // disk -> seed -> fetch
/// let receipt = service.checkout(draft)?;     // synchronous commit
/// service.shutdown().await;
/// ```
pub struct SyncService {
    config: SyncConfig,
    store: Store,
    client: RemoteClient,
    queue: WriteQueueHandle,
    snapshot_file: Option<SnapshotFile>,
    last_refresh: RwLock<Option<DateTime<Utc>>>,
    events: Arc<dyn SyncEvents>,
}

impl SyncService {
    /// Creates a service with no event observer.
    pub fn new(config: SyncConfig, store: Store) -> SyncResult<Self> {
        Self::with_events(config, store, Arc::new(NoOpEvents))
    }

    /// Creates a service that reports refreshes to `events`.
    ///
    /// Requires a configured endpoint; spawns the write queue worker.
    pub fn with_events(
        config: SyncConfig,
        store: Store,
        events: Arc<dyn SyncEvents>,
    ) -> SyncResult<Self> {
        let client = RemoteClient::new(&config.remote)?;
        let queue = WriteQueue::spawn_with_events(
            Arc::new(client.clone()),
            config.queue.clone(),
            events.clone(),
        );

        let snapshot_file = if config.snapshot.persist {
            match config.snapshot.path.clone() {
                Some(path) => Some(SnapshotFile::at(path)),
                None => match SnapshotFile::default_location() {
                    Ok(file) => Some(file),
                    Err(e) => {
                        warn!(error = %e, "Snapshot persistence disabled");
                        None
                    }
                },
            }
        } else {
            None
        };

        info!(endpoint = %client.endpoint(), "Sync service ready");

        Ok(SyncService {
            config,
            store,
            client,
            queue,
            snapshot_file,
            last_refresh: RwLock::new(None),
            events,
        })
    }

    /// The local cache. Reads through it are synchronous and never touch
    /// the network.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // =========================================================================
    // Startup & Refresh
    // =========================================================================

    /// Brings the cache up before first use.
    ///
    /// Restores the persisted snapshot if one exists, seeds starter data
    /// into an otherwise empty cache so the register is usable on a
    /// first run with no link, then attempts a refresh.
    pub async fn bootstrap(&self) -> AppData {
        if let Some(file) = &self.snapshot_file {
            if let Some(data) = file.load() {
                info!(
                    products = data.products.len(),
                    sales = data.sales.len(),
                    "Restored persisted snapshot"
                );
                self.store.replace_all(data);
            }
        }

        if self.store.is_empty() {
            info!("Cache empty, seeding starter data");
            self.store.replace_all(starter_data());
        }

        self.refresh().await
    }

    /// Fetches the remote snapshot and merges it into the cache.
    ///
    /// Returns the data the application should display. Fetch failures
    /// are absorbed: the cached snapshot comes back unchanged and the
    /// next call tries again.
    pub async fn refresh(&self) -> AppData {
        match self.client.fetch_snapshot().await {
            Ok(data) => {
                let report = self.store.replace_all(data);
                debug!(
                    replaced = ?report.replaced,
                    kept = ?report.kept,
                    "Remote snapshot merged"
                );

                let merged = self.store.snapshot();
                if let Some(file) = &self.snapshot_file {
                    if let Err(e) = file.save(&merged) {
                        warn!(error = %e, "Failed to persist snapshot");
                    }
                }

                *self.last_refresh.write().await = Some(Utc::now());
                self.events.data_refreshed(&merged);
                merged
            }

            Err(e) => {
                warn!(error = %e, "Snapshot fetch failed, serving cached data");
                self.events.refresh_failed(&e);
                self.store.snapshot()
            }
        }
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Processes a sale: validate, commit locally, queue remote writes.
    pub fn checkout(&self, draft: SaleDraft) -> SyncResult<CheckoutReceipt> {
        checkout::process_sale(&self.store, &self.queue, self.config.stock_policy(), draft)
    }

    /// Records a supplier purchase, restocking locally when configured.
    pub fn record_purchase(&self, draft: PurchaseDraft) -> SyncResult<PurchaseReceipt> {
        checkout::record_purchase(
            &self.store,
            &self.queue,
            self.config.policy.purchase_restock,
            draft,
        )
    }

    // =========================================================================
    // Single-Entity Writes
    // =========================================================================

    /// Sets a product's stock level by hand.
    ///
    /// The update is sent to the remote even when the product is missing
    /// from the cache: the sheet may hold rows a stale snapshot never
    /// delivered, and the update must not silently vanish.
    pub fn update_stock(&self, product_id: &str, stock: i64) -> SyncResult<()> {
        let level = stock.max(0);
        if !self.store.apply_stock_level(product_id, level) {
            debug!(product_id, "Stock update for product not in cache");
        }
        self.queue.enqueue(protocol::stock_update(product_id, level))
    }

    /// Adds a customer. Returns whether a new record was created; an
    /// existing id is left untouched and nothing is sent.
    pub fn add_customer(&self, customer: Customer) -> SyncResult<bool> {
        let mutation = protocol::customer_create(&customer)?;
        if self.store.upsert_customer(customer) {
            self.queue.enqueue(mutation)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Adds a user account.
    pub fn add_user(&self, user: User) -> SyncResult<()> {
        let mutation = protocol::user_create(&user)?;
        self.store.append_user(user);
        self.queue.enqueue(mutation)
    }

    /// Registers an external app tile.
    pub fn add_app(&self, app: ExternalApp) -> SyncResult<()> {
        let mutation = protocol::app_create(&app)?;
        self.store.append_app(app);
        self.queue.enqueue(mutation)
    }

    /// Removes an external app tile. The delete is sent even when the
    /// cache never held the app, for the same reason as stock updates.
    pub fn remove_app(&self, app_id: &str) -> SyncResult<()> {
        if !self.store.remove_app(app_id) {
            debug!(app_id, "Removing app not present in cache");
        }
        self.queue.enqueue(protocol::app_delete(app_id))
    }

    // =========================================================================
    // Observation & Shutdown
    // =========================================================================

    /// Current sync layer status.
    pub async fn status(&self) -> SyncStatus {
        SyncStatus {
            endpoint: self.client.endpoint().to_string(),
            pending: self.queue.pending(),
            sent: self.queue.sent(),
            dropped: self.queue.dropped(),
            last_refresh: *self.last_refresh.read().await,
        }
    }

    /// Stops the write queue worker. Queued mutations not yet delivered
    /// are discarded; the local cache is already consistent.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caja_core::Money;
    use httpmock::prelude::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn test_config(server: &MockServer, snapshot_path: Option<PathBuf>) -> SyncConfig {
        let mut config = SyncConfig::default();
        config.remote.endpoint_url = Some(server.base_url());
        config.remote.fetch_timeout_secs = 2;
        config.queue.pacing_delay_ms = 1;
        config.queue.max_attempts = 1;
        config.queue.initial_backoff_ms = 1;
        config.snapshot.persist = snapshot_path.is_some();
        config.snapshot.path = snapshot_path;
        config
    }

    async fn drain(service: &SyncService) {
        for _ in 0..500 {
            if service.status().await.pending == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("write queue did not drain");
    }

    #[tokio::test]
    async fn test_refresh_absorbs_server_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(500).body("boom");
        });

        let service = SyncService::new(test_config(&server, None), Store::new()).unwrap();
        service.store().replace_all(starter_data());

        let data = service.refresh().await;

        // The cached data comes back untouched, no error surfaces
        assert_eq!(data.products.len(), 5);
        assert_eq!(service.store().products().len(), 5);
        assert!(service.status().await.last_refresh.is_none());
    }

    #[tokio::test]
    async fn test_refresh_merges_and_persists() {
        let server = MockServer::start();
        let fetch = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"products":[{"ID":"p-9","name":"AUDIFONOS BT","price":"15.00","stock":4}]}"#);
        });

        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("snapshot.json");
        let config = test_config(&server, Some(snapshot_path.clone()));
        let service = SyncService::new(config, Store::new()).unwrap();

        let data = service.refresh().await;

        fetch.assert();
        assert_eq!(data.products.len(), 1);
        let product = service.store().find_product("p-9").unwrap();
        assert_eq!(product.name, "AUDIFONOS BT");
        assert_eq!(product.price, Money::from_cents(1500));
        assert_eq!(product.stock, 4);

        // Persisted for the next cold start
        assert!(snapshot_path.exists());
        assert!(service.status().await.last_refresh.is_some());
    }

    #[tokio::test]
    async fn test_bootstrap_restores_persisted_snapshot() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(500).body("down");
        });

        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("snapshot.json");
        let persisted = AppData {
            products: vec![caja_core::Product {
                id: "p-42".to_string(),
                name: "MICA 9H".to_string(),
                price: Money::from_cents(500),
                stock: 30,
                sku: "ACC-003".to_string(),
                category: "Accesorios".to_string(),
            }],
            ..AppData::default()
        };
        SnapshotFile::at(&snapshot_path).save(&persisted).unwrap();

        let config = test_config(&server, Some(snapshot_path));
        let service = SyncService::new(config, Store::new()).unwrap();

        let data = service.bootstrap().await;

        // Restored snapshot wins over starter data, fetch failure absorbed
        assert_eq!(data.products.len(), 1);
        assert!(service.store().find_product("p-42").is_some());
    }

    #[tokio::test]
    async fn test_bootstrap_seeds_starter_data_when_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(500).body("down");
        });

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server, Some(dir.path().join("missing.json")));
        let service = SyncService::new(config, Store::new()).unwrap();

        let data = service.bootstrap().await;

        // First run with no disk state and no link still has inventory
        assert_eq!(data.products.len(), 5);
        assert_eq!(data.users.len(), 2);
        assert_eq!(data.customers.len(), 1);
    }

    #[tokio::test]
    async fn test_update_stock_sends_even_when_unknown_locally() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .body_includes("updateStock")
                .body_includes("ghost");
            then.status(200).body("OK");
        });

        let service = SyncService::new(test_config(&server, None), Store::new()).unwrap();

        service.update_stock("ghost", 7).unwrap();
        drain(&service).await;

        post.assert();
        assert_eq!(service.status().await.sent, 1);
    }

    #[tokio::test]
    async fn test_update_stock_clamps_negative_levels() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST).path("/").body_includes("\"stock\":0");
            then.status(200).body("OK");
        });

        let service = SyncService::new(test_config(&server, None), Store::new()).unwrap();
        service.store().replace_all(AppData {
            products: vec![caja_core::Product {
                id: "p-1".to_string(),
                name: "FORRO".to_string(),
                price: Money::from_cents(1000),
                stock: 5,
                sku: String::new(),
                category: "Accesorios".to_string(),
            }],
            ..AppData::default()
        });

        service.update_stock("p-1", -3).unwrap();
        drain(&service).await;

        post.assert();
        assert_eq!(service.store().find_product("p-1").unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_duplicate_customer_is_not_resent() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(200).body("OK");
        });

        let service = SyncService::new(test_config(&server, None), Store::new()).unwrap();
        let customer = Customer {
            id: "V-7".to_string(),
            name: "Luis".to_string(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
        };

        assert!(service.add_customer(customer.clone()).unwrap());
        assert!(!service.add_customer(customer).unwrap());
        drain(&service).await;

        // One insert, one delivery; the duplicate never hit the queue
        assert_eq!(service.store().customers().len(), 1);
        assert_eq!(service.status().await.sent, 1);
    }
}
