//! # Error Types
//!
//! Domain-specific error types for caja-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caja-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  caja-store errors (separate crate)                                    │
//! │  └── StoreError       - Snapshot persistence failures                  │
//! │                                                                         │
//! │  caja-sync errors (separate crate)                                     │
//! │  └── SyncError        - Transport, config and queue failures           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SyncError → caller                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, quantities, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They are raised synchronously, before any state is mutated, so a caller
/// that sees one can be certain nothing was committed locally or enqueued
/// for the remote.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found in the local cache.
    ///
    /// ## When This Occurs
    /// - A checkout line references an id the cache has never seen and the
    ///   configured stock policy requires verifying stock before commit
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete a sale under the reject policy.
    ///
    /// ## When This Occurs
    /// - A checkout line requests more units than the cache holds and the
    ///   stock policy is `reject` (the default `clamp` policy floors stock
    ///   at zero instead and never raises this)
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a draft doesn't meet requirements. Validation
/// runs before business logic, so rejection always means zero mutations.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A sale or purchase was submitted with no items.
    #[error("cart is empty")]
    EmptyCart,

    /// A credit sale was submitted without a named customer.
    #[error("credit sales require a customer name")]
    CustomerNameRequired,

    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
