//! # Validation Module
//!
//! Draft validation and stock policy math.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front end (forms)                                             │
//! │  ├── Basic format checks (empty, length)                                │
//! │  └── Immediate user feedback                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE, called by the checkout orchestrator              │
//! │  ├── Cart non-empty, quantity bounds                                    │
//! │  ├── Credit sales must name a customer                                  │
//! │  └── Stock sufficiency per the configured policy                        │
//! │                                                                         │
//! │  Rejection happens BEFORE any state mutation: a draft that fails here   │
//! │  commits nothing locally and enqueues nothing for the remote.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use caja_core::validation::validate_sale_draft;
//! use caja_core::types::{PaymentType, SaleDraft};
//!
//! let draft = SaleDraft {
//!     items: vec![],
//!     payment_method: "Efectivo".to_string(),
//!     payment_type: PaymentType::Contado,
//!     customer: None,
//!     exchange_rate: None,
//! };
//! assert!(validate_sale_draft(&draft).is_err()); // empty cart
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{PaymentType, Product, PurchaseDraft, SaleDraft, StockPolicy};
use crate::{MAX_ITEM_QUANTITY, MAX_SALE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Draft Validators
// =============================================================================

/// Validates a sale draft before the orchestrator touches any state.
///
/// ## Rules
/// - Cart must have at least one line and at most `MAX_SALE_ITEMS`
/// - Every quantity is between 1 and `MAX_ITEM_QUANTITY`
/// - A credit sale must carry a customer with a non-blank name
pub fn validate_sale_draft(draft: &SaleDraft) -> ValidationResult<()> {
    if draft.items.is_empty() {
        return Err(ValidationError::EmptyCart);
    }

    if draft.items.len() > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    for item in &draft.items {
        validate_quantity(item.quantity)?;
    }

    if draft.payment_type == PaymentType::Credito {
        let has_name = draft
            .customer
            .as_ref()
            .map(|c| !c.name.trim().is_empty())
            .unwrap_or(false);
        if !has_name {
            return Err(ValidationError::CustomerNameRequired);
        }
    }

    Ok(())
}

/// Validates a purchase draft.
///
/// ## Rules
/// - Supplier is required
/// - At least one line, every quantity between 1 and `MAX_ITEM_QUANTITY`
pub fn validate_purchase_draft(draft: &PurchaseDraft) -> ValidationResult<()> {
    if draft.supplier.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "supplier".to_string(),
        });
    }

    if draft.items.is_empty() {
        return Err(ValidationError::EmptyCart);
    }

    for item in &draft.items {
        validate_quantity(item.quantity)?;
    }

    Ok(())
}

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Stock Policy
// =============================================================================

/// Computes the stock level a product lands on after selling `quantity`
/// units, according to the configured policy.
///
/// ## Policies
/// ```text
/// clamp  (default): new_stock = max(0, stock - quantity)
///                   oversell floors at zero, the sale records as requested
/// reject          : insufficient stock fails the whole checkout before
///                   any state changes
/// ```
pub fn next_stock_level(
    product: &Product,
    quantity: i64,
    policy: StockPolicy,
) -> CoreResult<i64> {
    match policy {
        StockPolicy::ClampToZero => Ok((product.stock - quantity).max(0)),
        StockPolicy::RejectInsufficient => {
            if product.stock < quantity {
                Err(CoreError::InsufficientStock {
                    name: product.name.clone(),
                    available: product.stock,
                    requested: quantity,
                })
            } else {
                Ok(product.stock - quantity)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
