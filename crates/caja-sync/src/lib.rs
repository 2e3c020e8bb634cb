//! # caja-sync: Sync Engine for Caja POS
//!
//! This crate provides the synchronization layer for Caja, keeping a
//! point-of-sale register fully usable offline while mirroring every
//! change to a remote sheet endpoint in the background.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Engine Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    SyncService (Facade)                          │  │
//! │  │                                                                  │  │
//! │  │  bootstrap / refresh / checkout / single-entity writes           │  │
//! │  │  Owns the store, the client, and the queue                       │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │  RemoteClient  │  │   WriteQueue   │  │  Checkout              │    │
//! │  │                │  │                │  │                        │    │
//! │  │ GET snapshot   │  │ FIFO worker,   │  │ validate → commit to   │    │
//! │  │ (HTML-sniffed, │  │ one in flight, │  │ cache → enqueue sale,  │    │
//! │  │ normalized)    │  │ paced, retried │  │ stock, customer        │    │
//! │  │ POST mutations │  │ with backoff   │  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  GUARANTEES                                                             │
//! │  ──────────                                                             │
//! │  • Reads and commits are synchronous against the local cache           │
//! │  • A dead uplink degrades to cached data, never to an error            │
//! │  • Mutations deliver in order; a failed one never blocks the next      │
//! │  • Checkout reports success at enqueue time, not delivery time         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`service`] - `SyncService` facade tying everything together
//! - [`checkout`] - Sale and purchase orchestration
//! - [`client`] - HTTP client for the remote sheet endpoint
//! - [`queue`] - Background write queue with pacing and retry
//! - [`protocol`] - Outbound mutation envelopes and wire quirks
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caja_store::Store;
//! use caja_sync::{SyncConfig, SyncService};
//!
//! let config = SyncConfig::load_or_default(None);
//! let service = SyncService::new(config, Store::new())?;
//!
//! // Restore, seed, and fetch; works with or without a link
//! let data = service.bootstrap().await;
//! println!("{} products ready", data.products.len());
//!
//! // Synchronous checkout, remote writes queued in the background
//! let receipt = service.checkout(draft)?;
//! println!("sale {} total {}", receipt.sale.id, receipt.sale.total);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod queue;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

// Facade
pub use service::{NoOpEvents, SyncEvents, SyncService, SyncStatus};

// Checkout
pub use checkout::{CheckoutReceipt, PurchaseReceipt, SalePhase, SubmitOutcome};

// Transport & queue
pub use client::RemoteClient;
pub use protocol::{MutationAction, OutboundMutation};
pub use queue::{MutationSender, WriteQueue, WriteQueueHandle};

// Configuration & errors
pub use config::{PolicySettings, QueueSettings, RemoteSettings, SnapshotSettings, SyncConfig};
pub use error::{SyncError, SyncResult};
