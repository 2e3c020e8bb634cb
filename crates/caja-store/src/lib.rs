//! # caja-store: Local Cache Layer for Caja POS
//!
//! This crate owns the working copy of all business data. The register
//! reads and writes this cache; the network only ever catches up with it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Data Flow                               │
//! │                                                                         │
//! │  Checkout / CLI command                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     caja-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │     Store     │    │ SnapshotFile  │    │ starter_data │  │   │
//! │  │   │  (store.rs)   │    │ (persist.rs)  │    │  (seed.rs)   │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ Arc<RwLock>   │◄───│ JSON file in  │    │ First-run    │  │   │
//! │  │   │ replace_all   │    │ data dir      │    │ inventory    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       ▲                                                                 │
//! │       │ replace_all() after each successful fetch                      │
//! │  caja-sync                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - Shared in-memory cache and its write rules
//! - [`persist`] - JSON snapshot saved between runs
//! - [`seed`] - Starter data for a fresh install
//! - [`error`] - Snapshot persistence errors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caja_store::{SnapshotFile, Store, starter_data};
//!
//! let store = match SnapshotFile::default_location()?.load() {
//!     Some(data) => Store::with_data(data),
//!     None => Store::with_data(starter_data()),
//! };
//!
//! store.apply_stock_level("1", 9);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod persist;
pub mod seed;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use persist::SnapshotFile;
pub use seed::starter_data;
pub use store::{ReplaceReport, Store};
