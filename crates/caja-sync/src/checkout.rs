//! # Checkout Flow
//!
//! Turns a cart into a committed sale: validate, write the local cache,
//! then queue the remote writes. The network is never on the critical
//! path of taking money.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale State Machine                                │
//! │                                                                         │
//! │  Building ──► Submitted ──► LocallyCommitted ──► RemoteQueued ──► Done │
//! │                  │                                                      │
//! │                  └─ validation failed ──► rejected, nothing changed    │
//! │                                                                         │
//! │  SUBMITTED                                                              │
//! │    • Cart must be non-empty, quantities positive                        │
//! │    • Credit sales must name a customer                                  │
//! │    • Stock policy may reject insufficient stock here                    │
//! │                                                                         │
//! │  LOCALLY COMMITTED (synchronous, before any network)                    │
//! │    • New stock levels computed from the PRE-sale snapshot,             │
//! │      clamped at zero                                                    │
//! │    • Sale appended, customer inserted if unseen                         │
//! │                                                                         │
//! │  REMOTE QUEUED (fire-and-forget)                                        │
//! │    1. sale row                                                          │
//! │    2. one stock update per distinct line                                │
//! │    3. customer row, only if the commit inserted one                     │
//! │                                                                         │
//! │  DONE                                                                   │
//! │    The register reports success at enqueue time. Delivery succeeds     │
//! │    or dies in the background; the next refresh reconciles.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{debug, info, warn};

use caja_core::{
    now_iso, purchase_total, sale_total, time_based_id,
    validation::{next_stock_level, validate_purchase_draft, validate_sale_draft},
    CoreError, Purchase, PurchaseDraft, Sale, SaleDraft, StockPolicy,
};
use caja_store::Store;

use crate::error::SyncResult;
use crate::protocol::{self, OutboundMutation};
use crate::queue::WriteQueueHandle;

// =============================================================================
// Sale Phase
// =============================================================================

/// Where a sale is in its lifecycle. Used for logging and receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalePhase {
    /// Cart still being assembled by the operator.
    Building,
    /// Draft handed to checkout, validation in progress.
    Submitted,
    /// Cache updated; the sale survives a crash or dead link from here on.
    LocallyCommitted,
    /// Remote writes handed to the queue.
    RemoteQueued,
    /// Checkout finished from the register's point of view.
    Done,
}

impl std::fmt::Display for SalePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SalePhase::Building => write!(f, "building"),
            SalePhase::Submitted => write!(f, "submitted"),
            SalePhase::LocallyCommitted => write!(f, "locally_committed"),
            SalePhase::RemoteQueued => write!(f, "remote_queued"),
            SalePhase::Done => write!(f, "done"),
        }
    }
}

// =============================================================================
// Submit Outcome
// =============================================================================

/// What checkout can honestly promise about remote delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// All mutations are queued; the worker will deliver or drop them.
    Queued,

    /// The local commit succeeded but some mutations never reached the
    /// queue (worker shut down mid-checkout). The next refresh will show
    /// whatever the server actually recorded.
    DeliveryUnknown,
}

// =============================================================================
// Receipts
// =============================================================================

/// Result of a completed checkout.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    /// The committed sale as stored locally.
    pub sale: Sale,

    /// New absolute stock level per affected product.
    pub stock_levels: Vec<(String, i64)>,

    /// Mutations accepted by the write queue.
    pub queued_mutations: usize,

    /// Delivery promise for the queued mutations.
    pub outcome: SubmitOutcome,
}

/// Result of recording a supplier purchase.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    /// The recorded purchase.
    pub purchase: Purchase,

    /// New absolute stock level per restocked product (empty when the
    /// restock policy is off).
    pub stock_levels: Vec<(String, i64)>,

    /// Mutations accepted by the write queue.
    pub queued_mutations: usize,

    /// Delivery promise for the queued mutations.
    pub outcome: SubmitOutcome,
}

// =============================================================================
// Sale Processing
// =============================================================================

/// Processes a sale draft end to end.
///
/// Validation failures and stock rejections return before anything is
/// written. After the local commit, nothing can fail the sale anymore;
/// at worst the outcome is [`SubmitOutcome::DeliveryUnknown`].
pub fn process_sale(
    store: &Store,
    queue: &WriteQueueHandle,
    policy: StockPolicy,
    draft: SaleDraft,
) -> SyncResult<CheckoutReceipt> {
    validate_sale_draft(&draft).map_err(CoreError::from)?;
    debug!(
        phase = %SalePhase::Submitted,
        items = draft.items.len(),
        payment_type = %draft.payment_type,
        "Sale draft validated"
    );

    // Every line is priced against the same pre-sale view of stock
    let snapshot = store.snapshot();
    let mut stock_levels: Vec<(String, i64)> = Vec::with_capacity(draft.items.len());
    for item in &draft.items {
        match snapshot.products.iter().find(|p| p.id == item.product_id) {
            Some(product) => {
                let level = next_stock_level(product, item.quantity, policy)?;
                stock_levels.push((product.id.clone(), level));
            }
            None => {
                // The sale still records the line; there is just no local
                // stock row to update
                debug!(product_id = %item.product_id, "Sale line for product not in cache");
            }
        }
    }

    let sale = Sale {
        id: time_based_id(),
        date: now_iso(),
        total: sale_total(&draft.items),
        items: draft.items,
        payment_method: draft.payment_method,
        payment_type: draft.payment_type,
        customer_id: draft.customer.as_ref().map(|c| c.id.clone()),
        customer_name: draft.customer.as_ref().map(|c| c.name.clone()),
        exchange_rate: draft.exchange_rate,
    };

    // Build all wire payloads before touching the store, so a
    // serialization problem cannot strand a half-reported commit
    let sale_mutation = protocol::sale_create(&sale)?;
    let customer_mutation = match draft.customer.as_ref() {
        Some(customer) => Some(protocol::customer_create(customer)?),
        None => None,
    };

    // Local commit: synchronous, before any network
    for (product_id, level) in &stock_levels {
        store.apply_stock_level(product_id, *level);
    }
    store.append_sale(sale.clone());
    let customer_inserted = draft
        .customer
        .map(|customer| store.upsert_customer(customer))
        .unwrap_or(false);
    debug!(sale_id = %sale.id, phase = %SalePhase::LocallyCommitted, "Sale committed to cache");

    // Queue remote writes: sale row, stock updates, customer if new
    let mut mutations: Vec<OutboundMutation> = Vec::with_capacity(stock_levels.len() + 2);
    mutations.push(sale_mutation);
    for (product_id, level) in &stock_levels {
        mutations.push(protocol::stock_update(product_id, *level));
    }
    if customer_inserted {
        if let Some(mutation) = customer_mutation {
            mutations.push(mutation);
        }
    }

    let (queued, outcome) = enqueue_mutations(queue, mutations);

    info!(
        sale_id = %sale.id,
        total = %sale.total,
        phase = %SalePhase::Done,
        queued,
        "Sale complete"
    );

    Ok(CheckoutReceipt {
        sale,
        stock_levels,
        queued_mutations: queued,
        outcome,
    })
}

// =============================================================================
// Purchase Processing
// =============================================================================

/// Records a supplier purchase.
///
/// The purchase row is always sent. Stock only moves when `restock` is
/// on; receiving goods and recording the invoice are separate events in
/// most shops.
pub fn record_purchase(
    store: &Store,
    queue: &WriteQueueHandle,
    restock: bool,
    draft: PurchaseDraft,
) -> SyncResult<PurchaseReceipt> {
    validate_purchase_draft(&draft).map_err(CoreError::from)?;

    let purchase = Purchase {
        id: time_based_id(),
        date: now_iso(),
        supplier: draft.supplier,
        total: purchase_total(&draft.items),
        items: draft.items,
    };

    let mut stock_levels: Vec<(String, i64)> = Vec::new();
    if restock {
        let snapshot = store.snapshot();
        for item in &purchase.items {
            match snapshot.products.iter().find(|p| p.id == item.product_id) {
                Some(product) => {
                    stock_levels.push((product.id.clone(), product.stock + item.quantity));
                }
                None => {
                    debug!(product_id = %item.product_id, "Purchase line for product not in cache");
                }
            }
        }
    }

    let purchase_mutation = protocol::purchase_create(&purchase)?;

    for (product_id, level) in &stock_levels {
        store.apply_stock_level(product_id, *level);
    }

    let mut mutations = Vec::with_capacity(stock_levels.len() + 1);
    mutations.push(purchase_mutation);
    for (product_id, level) in &stock_levels {
        mutations.push(protocol::stock_update(product_id, *level));
    }

    let (queued, outcome) = enqueue_mutations(queue, mutations);

    info!(
        purchase_id = %purchase.id,
        supplier = %purchase.supplier,
        restocked = restock,
        queued,
        "Purchase recorded"
    );

    Ok(PurchaseReceipt {
        purchase,
        stock_levels,
        queued_mutations: queued,
        outcome,
    })
}

/// Enqueues mutations one by one, downgrading to
/// [`SubmitOutcome::DeliveryUnknown`] if the queue disappears mid-batch.
fn enqueue_mutations(
    queue: &WriteQueueHandle,
    mutations: Vec<OutboundMutation>,
) -> (usize, SubmitOutcome) {
    let mut queued = 0;
    for mutation in mutations {
        match queue.enqueue(mutation) {
            Ok(()) => queued += 1,
            Err(e) => {
                warn!(error = %e, queued, "Commit succeeded but enqueue failed");
                return (queued, SubmitOutcome::DeliveryUnknown);
            }
        }
    }
    (queued, SubmitOutcome::Queued)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueSettings;
    use crate::error::SyncError;
    use crate::queue::{MutationSender, WriteQueue};
    use async_trait::async_trait;
    use caja_core::{
        AppData, Customer, Money, PaymentType, Product, PurchaseItem, SaleItem,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Records envelope descriptions in delivery order.
    #[derive(Default)]
    struct RecordingSender {
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MutationSender for RecordingSender {
        async fn deliver(&self, mutation: &OutboundMutation) -> SyncResult<()> {
            self.delivered.lock().unwrap().push(mutation.describe());
            Ok(())
        }
    }

    /// Always refuses, as if the worker were unreachable.
    struct RejectingSender;

    #[async_trait]
    impl MutationSender for RejectingSender {
        async fn deliver(&self, _: &OutboundMutation) -> SyncResult<()> {
            Err(SyncError::HttpStatus { status: 500 })
        }
    }

    fn store_with_product(stock: i64) -> Store {
        Store::with_data(AppData {
            products: vec![Product {
                id: "p1".to_string(),
                name: "FORRO SILICONE CASE".to_string(),
                price: Money::from_cents(1000),
                stock,
                sku: "ACC-002".to_string(),
                category: "Accesorios".to_string(),
            }],
            ..AppData::default()
        })
    }

    fn draft(quantity: i64) -> SaleDraft {
        SaleDraft {
            items: vec![SaleItem {
                product_id: "p1".to_string(),
                quantity,
                price_at_sale: Money::from_cents(1000),
                name: "FORRO SILICONE CASE".to_string(),
            }],
            payment_method: "Efectivo".to_string(),
            payment_type: PaymentType::Contado,
            customer: None,
            exchange_rate: None,
        }
    }

    fn spawn_queue(sender: Arc<dyn MutationSender>) -> WriteQueueHandle {
        WriteQueue::spawn(
            sender,
            QueueSettings {
                pacing_delay_ms: 1,
                max_attempts: 1,
                initial_backoff_ms: 1,
                max_backoff_secs: 1,
            },
        )
    }

    async fn drain(queue: &WriteQueueHandle) {
        for _ in 0..500 {
            if queue.pending() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("queue did not drain");
    }

    #[tokio::test]
    async fn test_cash_sale_commits_and_queues_two_mutations() {
        let store = store_with_product(5);
        let sender = Arc::new(RecordingSender::default());
        let queue = spawn_queue(sender.clone());

        let receipt =
            process_sale(&store, &queue, StockPolicy::ClampToZero, draft(2)).unwrap();

        // Exact integer total, no float drift
        assert_eq!(receipt.sale.total, Money::from_cents(2000));
        assert_eq!(receipt.outcome, SubmitOutcome::Queued);
        assert_eq!(receipt.queued_mutations, 2);

        // Local commit happened synchronously
        assert_eq!(store.find_product("p1").unwrap().stock, 3);
        assert_eq!(store.sales().len(), 1);

        drain(&queue).await;
        assert_eq!(
            *sender.delivered.lock().unwrap(),
            vec!["create Sales", "updateStock Products"]
        );
    }

    #[tokio::test]
    async fn test_oversell_clamps_stock_but_sale_records_quantity() {
        let store = store_with_product(5);
        let queue = spawn_queue(Arc::new(RecordingSender::default()));

        let receipt =
            process_sale(&store, &queue, StockPolicy::ClampToZero, draft(10)).unwrap();

        // Stock floors at zero; the sale still says what was rung up
        assert_eq!(store.find_product("p1").unwrap().stock, 0);
        assert_eq!(receipt.sale.items[0].quantity, 10);
        assert_eq!(receipt.stock_levels, vec![("p1".to_string(), 0)]);
    }

    #[tokio::test]
    async fn test_reject_policy_aborts_before_any_commit() {
        let store = store_with_product(5);
        let queue = spawn_queue(Arc::new(RecordingSender::default()));

        let result = process_sale(&store, &queue, StockPolicy::RejectInsufficient, draft(10));

        assert!(matches!(
            result,
            Err(SyncError::Domain(CoreError::InsufficientStock { .. }))
        ));
        // Nothing changed, nothing queued
        assert_eq!(store.find_product("p1").unwrap().stock, 5);
        assert!(store.sales().is_empty());
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_credit_sale_without_customer_changes_nothing() {
        let store = store_with_product(5);
        let queue = spawn_queue(Arc::new(RecordingSender::default()));

        let mut credit = draft(1);
        credit.payment_type = PaymentType::Credito;

        let result = process_sale(&store, &queue, StockPolicy::ClampToZero, credit);

        assert!(result.is_err());
        assert_eq!(store.find_product("p1").unwrap().stock, 5);
        assert!(store.sales().is_empty());
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_new_customer_is_committed_and_queued_last() {
        let store = store_with_product(5);
        let sender = Arc::new(RecordingSender::default());
        let queue = spawn_queue(sender.clone());

        let mut with_customer = draft(1);
        with_customer.customer = Some(Customer {
            id: "V-99".to_string(),
            name: "Ana".to_string(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
        });

        let receipt =
            process_sale(&store, &queue, StockPolicy::ClampToZero, with_customer).unwrap();

        assert_eq!(receipt.queued_mutations, 3);
        assert_eq!(store.customers().len(), 1);
        assert_eq!(receipt.sale.customer_name.as_deref(), Some("Ana"));

        drain(&queue).await;
        assert_eq!(
            *sender.delivered.lock().unwrap(),
            vec!["create Sales", "updateStock Products", "create Customers"]
        );
    }

    #[tokio::test]
    async fn test_known_customer_is_not_recreated() {
        let store = store_with_product(5);
        store.upsert_customer(Customer {
            id: "V-99".to_string(),
            name: "Ana".to_string(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
        });
        let queue = spawn_queue(Arc::new(RecordingSender::default()));

        let mut with_customer = draft(1);
        with_customer.customer = Some(Customer {
            id: "V-99".to_string(),
            name: "Ana".to_string(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
        });

        let receipt =
            process_sale(&store, &queue, StockPolicy::ClampToZero, with_customer).unwrap();

        // Sale + stock update only; the customer row already exists
        assert_eq!(receipt.queued_mutations, 2);
        assert_eq!(store.customers().len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_survives_queue_shutdown() {
        let store = store_with_product(5);
        let queue = spawn_queue(Arc::new(RecordingSender::default()));

        queue.shutdown().await;
        // Wait for the worker to actually exit
        for _ in 0..200 {
            if queue.enqueue(protocol::stock_update("probe", 1)).is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let receipt =
            process_sale(&store, &queue, StockPolicy::ClampToZero, draft(2)).unwrap();

        // The sale is still committed; only the delivery promise weakens
        assert_eq!(receipt.outcome, SubmitOutcome::DeliveryUnknown);
        assert_eq!(store.find_product("p1").unwrap().stock, 3);
        assert_eq!(store.sales().len(), 1);
    }

    #[tokio::test]
    async fn test_purchase_without_restock_sends_one_row() {
        let store = store_with_product(5);
        let sender = Arc::new(RecordingSender::default());
        let queue = spawn_queue(sender.clone());

        let receipt = record_purchase(
            &store,
            &queue,
            false,
            PurchaseDraft {
                supplier: "Mayorista Centro".to_string(),
                items: vec![PurchaseItem {
                    product_id: "p1".to_string(),
                    quantity: 20,
                    cost: Money::from_cents(600),
                    name: "FORRO SILICONE CASE".to_string(),
                }],
            },
        )
        .unwrap();

        assert_eq!(receipt.queued_mutations, 1);
        assert_eq!(receipt.purchase.total, Money::from_cents(12_000));
        // Restock off: stock untouched
        assert_eq!(store.find_product("p1").unwrap().stock, 5);

        drain(&queue).await;
        assert_eq!(*sender.delivered.lock().unwrap(), vec!["create Purchases"]);
    }

    #[tokio::test]
    async fn test_purchase_with_restock_raises_stock() {
        let store = store_with_product(5);
        let queue = spawn_queue(Arc::new(RecordingSender::default()));

        let receipt = record_purchase(
            &store,
            &queue,
            true,
            PurchaseDraft {
                supplier: "Mayorista Centro".to_string(),
                items: vec![PurchaseItem {
                    product_id: "p1".to_string(),
                    quantity: 20,
                    cost: Money::from_cents(600),
                    name: "FORRO SILICONE CASE".to_string(),
                }],
            },
        )
        .unwrap();

        assert_eq!(store.find_product("p1").unwrap().stock, 25);
        assert_eq!(receipt.queued_mutations, 2);
        assert_eq!(receipt.stock_levels, vec![("p1".to_string(), 25)]);
    }

    #[tokio::test]
    async fn test_delivery_failure_never_reaches_checkout() {
        let store = store_with_product(5);
        let queue = spawn_queue(Arc::new(RejectingSender));

        let receipt =
            process_sale(&store, &queue, StockPolicy::ClampToZero, draft(2)).unwrap();

        // Enqueue succeeded even though every delivery will fail
        assert_eq!(receipt.outcome, SubmitOutcome::Queued);
        drain(&queue).await;
        assert_eq!(queue.dropped(), 2);
        // The local commit stands regardless
        assert_eq!(store.find_product("p1").unwrap().stock, 3);
    }
}
