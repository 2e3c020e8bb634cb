//! # Mutation Protocol
//!
//! Wire format for writes sent to the sheet backend.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Mutation Envelope                                  │
//! │                                                                         │
//! │  Every write is one POST with a JSON body:                             │
//! │                                                                         │
//! │    { "action": "create",      "sheet": "Sales",     "data": {...} }    │
//! │    { "action": "updateStock", "sheet": "Products",  "data": {id,stock}}│
//! │    { "action": "delete",      "sheet": "Apps",      "data": {id} }     │
//! │                                                                         │
//! │  QUIRKS OF THE SHEET BACKEND                                           │
//! │  ───────────────────────────                                           │
//! │  • Body is sent as text/plain: the script reads the raw post body      │
//! │    and a JSON content type would trigger a CORS preflight it cannot    │
//! │    answer                                                              │
//! │  • Sale line items are embedded as a JSON *string* so they fit in one  │
//! │    spreadsheet cell                                                    │
//! │  • Optional sale fields are flattened to "" / 0 because sheet columns  │
//! │    have no notion of null                                              │
//! │                                                                         │
//! │  The `id` field on [`OutboundMutation`] is a local correlation id for  │
//! │  logs and never crosses the wire.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use caja_core::{Collection, Customer, ExternalApp, Purchase, Sale, User};

use crate::error::SyncResult;

// =============================================================================
// Mutation Action
// =============================================================================

/// The verb of a mutation, as the sheet script spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationAction {
    /// Append a new row.
    Create,
    /// Overwrite the stock column of an existing product row.
    UpdateStock,
    /// Remove a row by id.
    Delete,
}

impl std::fmt::Display for MutationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationAction::Create => write!(f, "create"),
            MutationAction::UpdateStock => write!(f, "updateStock"),
            MutationAction::Delete => write!(f, "delete"),
        }
    }
}

// =============================================================================
// Outbound Mutation
// =============================================================================

/// One write queued for delivery to the sheet backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMutation {
    /// Local correlation id for logging. Not part of the wire envelope.
    pub id: Uuid,

    /// What to do with the row.
    pub action: MutationAction,

    /// Which sheet tab to do it to.
    pub sheet: Collection,

    /// Row payload, already in wire shape.
    pub data: Value,
}

impl OutboundMutation {
    /// Creates a mutation with a fresh correlation id.
    pub fn new(action: MutationAction, sheet: Collection, data: Value) -> Self {
        OutboundMutation {
            id: Uuid::new_v4(),
            action,
            sheet,
            data,
        }
    }

    /// Serializes the wire envelope: `{action, sheet, data}`.
    pub fn envelope_json(&self) -> SyncResult<String> {
        let envelope = json!({
            "action": self.action,
            "sheet": self.sheet,
            "data": self.data,
        });
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Short description for log lines, e.g. `create Sales`.
    pub fn describe(&self) -> String {
        format!("{} {}", self.action, self.sheet)
    }
}

// =============================================================================
// Mutation Builders
// =============================================================================

/// Builds the mutation recording a completed sale.
///
/// Line items are embedded as a JSON string and optional fields flattened
/// to `""` / `0`, matching the sheet's column layout.
pub fn sale_create(sale: &Sale) -> SyncResult<OutboundMutation> {
    let mut data = serde_json::to_value(sale)?;

    if let Some(row) = data.as_object_mut() {
        let items = serde_json::to_string(&sale.items)?;
        row.insert("items".to_string(), Value::String(items));
        row.insert(
            "customerId".to_string(),
            Value::String(sale.customer_id.clone().unwrap_or_default()),
        );
        row.insert(
            "customerName".to_string(),
            Value::String(sale.customer_name.clone().unwrap_or_default()),
        );
        row.insert(
            "exchangeRate".to_string(),
            json!(sale.exchange_rate.unwrap_or(0.0)),
        );
    }

    Ok(OutboundMutation::new(
        MutationAction::Create,
        Collection::Sales,
        data,
    ))
}

/// Builds the mutation recording a supplier purchase.
pub fn purchase_create(purchase: &Purchase) -> SyncResult<OutboundMutation> {
    let mut data = serde_json::to_value(purchase)?;

    if let Some(row) = data.as_object_mut() {
        let items = serde_json::to_string(&purchase.items)?;
        row.insert("items".to_string(), Value::String(items));
    }

    Ok(OutboundMutation::new(
        MutationAction::Create,
        Collection::Purchases,
        data,
    ))
}

/// Builds an absolute stock level update for one product.
pub fn stock_update(product_id: &str, stock: i64) -> OutboundMutation {
    OutboundMutation::new(
        MutationAction::UpdateStock,
        Collection::Products,
        json!({ "id": product_id, "stock": stock }),
    )
}

/// Builds the mutation creating a customer row.
pub fn customer_create(customer: &Customer) -> SyncResult<OutboundMutation> {
    Ok(OutboundMutation::new(
        MutationAction::Create,
        Collection::Customers,
        serde_json::to_value(customer)?,
    ))
}

/// Builds the mutation creating a user row.
pub fn user_create(user: &User) -> SyncResult<OutboundMutation> {
    Ok(OutboundMutation::new(
        MutationAction::Create,
        Collection::Users,
        serde_json::to_value(user)?,
    ))
}

/// Builds the mutation creating an external app row.
pub fn app_create(app: &ExternalApp) -> SyncResult<OutboundMutation> {
    Ok(OutboundMutation::new(
        MutationAction::Create,
        Collection::Apps,
        serde_json::to_value(app)?,
    ))
}

/// Builds the mutation deleting an external app row.
pub fn app_delete(app_id: &str) -> OutboundMutation {
    OutboundMutation::new(
        MutationAction::Delete,
        Collection::Apps,
        json!({ "id": app_id }),
    )
}
