//! # Normalizer Module
//!
//! Maps loosely-typed remote records into canonical entities.
//!
//! ## The Problem
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The remote sheet is hand-edited. The same product column arrives as    │
//! │  any of:                                                                │
//! │                                                                         │
//! │    { "NOMBRE DEL PRODUCTO": "IPHONE 14", "Precio": "$1,200.00", ... }   │
//! │    { "Nombre": "IPHONE 14", "PRECIO": "1.200,00", ... }                 │
//! │    { "name": "IPHONE 14", "price": 1200, ... }                          │
//! │                                                                         │
//! │  Every field resolves through a priority-ordered alias table, every     │
//! │  number through a loose parser that never fails, and every miss gets    │
//! │  a safe default. Nothing here returns an error.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Alias Resolution Rules
//! - The first alias present with a truthy value wins (empty strings and
//!   zero numbers count as absent, so a blank cell falls through to the
//!   next alias)
//! - Product ids prefer a physical unit code (IMEI/serial) over a generic
//!   code; with neither, a time-based id is synthesized
//! - Sales, like apps, come back in the exact shape this client writes
//!   them, so they resolve canonical keys directly (plus tolerance for
//!   items arriving as a JSON-encoded string)
//!
//! Normalization is idempotent: feeding a canonical record back through
//! yields an identical entity.

use serde_json::Value;

use crate::money::Money;
use crate::types::{
    sale_total, time_based_id, AppData, Customer, ExternalApp, Product, Sale, SaleItem, User,
};

// =============================================================================
// Alias Tables
// =============================================================================
// One priority-ordered key list per canonical field. Declarative on purpose:
// adding a new sheet-header variant is a one-line change, and tests assert
// against these exact tables.

/// Physical unit code aliases. Wins over any generic product id.
pub const PRODUCT_UNIT_CODE_ALIASES: &[&str] = &["Imei", "IMEI", "Serial", "SERIE"];

/// Generic product code aliases, used when no unit code is present.
pub const PRODUCT_CODE_ALIASES: &[&str] = &["ID", "id", "Id"];

pub const PRODUCT_NAME_ALIASES: &[&str] = &["NOMBRE DEL PRODUCTO", "NOMBRE", "Nombre", "name"];
pub const PRODUCT_PRICE_ALIASES: &[&str] = &["Precio", "PRECIO", "price"];
pub const PRODUCT_STOCK_ALIASES: &[&str] = &["Stock", "STOCK", "stock"];
pub const PRODUCT_SKU_ALIASES: &[&str] = &["Imei", "IMEI", "sku", "Codigo"];
pub const PRODUCT_CATEGORY_ALIASES: &[&str] = &["CATEGORIA", "Categoria", "category"];

pub const CUSTOMER_ID_ALIASES: &[&str] = &["id", "ID", "Cedula", "CEDULA"];
pub const CUSTOMER_NAME_ALIASES: &[&str] = &["name", "Nombre", "NOMBRE"];
pub const CUSTOMER_EMAIL_ALIASES: &[&str] = &["email", "Email", "correo"];
pub const CUSTOMER_PHONE_ALIASES: &[&str] = &["phone", "Telefono", "telefono"];
pub const CUSTOMER_ADDRESS_ALIASES: &[&str] = &["address", "Direccion", "direccion"];

pub const USER_ID_ALIASES: &[&str] = &["id", "ID"];
pub const USER_NAME_ALIASES: &[&str] = &["name", "Nombre", "NOMBRE"];
pub const USER_USERNAME_ALIASES: &[&str] = &["username", "usuario", "Usuario"];
pub const USER_ROLE_ALIASES: &[&str] = &["role", "rol", "Rol"];
pub const USER_PASSWORD_ALIASES: &[&str] = &["password", "clave", "Clave"];

/// Fallback display name for products missing every name alias.
pub const DEFAULT_PRODUCT_NAME: &str = "Producto Sin Nombre";

/// Fallback category for products missing every category alias.
pub const DEFAULT_CATEGORY: &str = "General";

// =============================================================================
// Loose Numeric Parsing
// =============================================================================

/// Parses a numeric field that may arrive as a native number, a currency
/// string ("$1,234.56"), or a comma-decimal string ("1.234,56", "1,5").
///
/// Never fails: unparseable or absent input is `0.0`.
pub fn parse_loose_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_loose_str(s),
        _ => 0.0,
    }
}

/// String half of the loose parser.
///
/// Strips everything except digits, `.`, `,` and `-`, then resolves the
/// separators: when both `,` and `.` appear the later one is the decimal
/// point and the other is grouping; a repeated single separator is
/// grouping; a lone separator is the decimal point. Anything still
/// unparseable after that is `0.0`.
fn parse_loose_str(s: &str) -> f64 {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();

    let resolved = if commas > 0 && dots > 0 {
        let last_comma = cleaned.rfind(',').unwrap_or(0);
        let last_dot = cleaned.rfind('.').unwrap_or(0);
        if last_comma > last_dot {
            cleaned.replace('.', "").replace(',', ".")
        } else {
            cleaned.replace(',', "")
        }
    } else if commas == 1 {
        cleaned.replace(',', ".")
    } else if commas > 1 {
        cleaned.replace(',', "")
    } else if dots > 1 {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    resolved.parse::<f64>().unwrap_or(0.0)
}

/// Loose parse straight to Money (decimal units to cents).
pub fn parse_loose_money(value: &Value) -> Money {
    Money::from_units(parse_loose_number(value))
}

/// Loose parse to an integer count, rounding fractional input.
pub fn parse_loose_int(value: &Value) -> i64 {
    parse_loose_number(value).round() as i64
}

// =============================================================================
// Alias Resolution
// =============================================================================

/// True for values a blank sheet cell can produce: these fall through to
/// the next alias instead of claiming the field.
fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(b) => !b,
        _ => false,
    }
}

/// Returns the first alias whose value is present.
fn first_present<'a>(record: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|key| record.get(key))
        .find(|value| !is_absent(value))
}

/// Resolves a string field through an alias table. Numbers coerce to their
/// decimal representation, mirroring how the sheet hands back numeric cells
/// for code-like columns.
fn resolve_string(record: &Value, aliases: &[&str]) -> Option<String> {
    match first_present(record, aliases)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolves a numeric field through an alias table with the loose parser.
fn resolve_number(record: &Value, aliases: &[&str]) -> f64 {
    first_present(record, aliases)
        .map(parse_loose_number)
        .unwrap_or(0.0)
}

// =============================================================================
// Entity Mappers
// =============================================================================

/// Normalizes one raw product record.
///
/// Id precedence: unit code > generic code > synthesized time-based id.
/// Price and stock clamp at zero; the data model has no negative values.
pub fn normalize_product(raw: &Value) -> Product {
    let id = resolve_string(raw, PRODUCT_UNIT_CODE_ALIASES)
        .or_else(|| resolve_string(raw, PRODUCT_CODE_ALIASES))
        .unwrap_or_else(time_based_id);

    let price = Money::from_units(resolve_number(raw, PRODUCT_PRICE_ALIASES).max(0.0));
    let stock = (resolve_number(raw, PRODUCT_STOCK_ALIASES).round() as i64).max(0);

    Product {
        id,
        name: resolve_string(raw, PRODUCT_NAME_ALIASES)
            .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string()),
        price,
        stock,
        sku: resolve_string(raw, PRODUCT_SKU_ALIASES).unwrap_or_default(),
        category: resolve_string(raw, PRODUCT_CATEGORY_ALIASES)
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
    }
}

/// Normalizes one sale line item.
fn normalize_sale_item(raw: &Value) -> SaleItem {
    SaleItem {
        product_id: resolve_string(raw, &["productId"]).unwrap_or_default(),
        quantity: parse_loose_int(raw.get("quantity").unwrap_or(&Value::Null)),
        price_at_sale: parse_loose_money(raw.get("priceAtSale").unwrap_or(&Value::Null)),
        name: resolve_string(raw, &["name"]).unwrap_or_default(),
    }
}

/// Parses the items field, which arrives either as a JSON array or as a
/// JSON-encoded string of one (the write path packs items into a single
/// sheet cell).
fn normalize_sale_items(raw: &Value) -> Vec<SaleItem> {
    let parsed;
    let items = match raw {
        Value::Array(_) => raw,
        Value::String(s) => {
            parsed = serde_json::from_str::<Value>(s).unwrap_or(Value::Null);
            &parsed
        }
        _ => return Vec::new(),
    };

    match items.as_array() {
        Some(entries) => entries
            .iter()
            .filter(|entry| entry.is_object())
            .map(normalize_sale_item)
            .collect(),
        None => Vec::new(),
    }
}

/// Normalizes one raw sale record.
///
/// Sales come back in the shape this client writes them, so keys resolve
/// canonically. Blank customer fields and a zero exchange rate read back as
/// absent, matching how the write path flattens `None`.
pub fn normalize_sale(raw: &Value) -> Sale {
    let items = normalize_sale_items(raw.get("items").unwrap_or(&Value::Null));

    // A record missing its total gets one recomputed from the lines;
    // a present total passes through untouched.
    let total = match first_present(raw, &["total"]) {
        Some(value) => parse_loose_money(value),
        None => sale_total(&items),
    };

    let payment_type = resolve_string(raw, &["paymentType"])
        .map(|s| s.parse().unwrap_or_default())
        .unwrap_or_default();

    Sale {
        id: resolve_string(raw, &["id", "ID"]).unwrap_or_default(),
        date: resolve_string(raw, &["date", "Fecha", "fecha"]).unwrap_or_default(),
        items,
        total,
        payment_method: resolve_string(raw, &["paymentMethod"]).unwrap_or_default(),
        payment_type,
        customer_id: resolve_string(raw, &["customerId"]),
        customer_name: resolve_string(raw, &["customerName"]),
        exchange_rate: first_present(raw, &["exchangeRate"]).map(parse_loose_number),
    }
}

/// Normalizes one raw customer record.
pub fn normalize_customer(raw: &Value) -> Customer {
    Customer {
        id: resolve_string(raw, CUSTOMER_ID_ALIASES).unwrap_or_default(),
        name: resolve_string(raw, CUSTOMER_NAME_ALIASES).unwrap_or_default(),
        email: resolve_string(raw, CUSTOMER_EMAIL_ALIASES).unwrap_or_default(),
        phone: resolve_string(raw, CUSTOMER_PHONE_ALIASES).unwrap_or_default(),
        address: resolve_string(raw, CUSTOMER_ADDRESS_ALIASES).unwrap_or_default(),
    }
}

/// Normalizes one raw user record. Unknown roles fall back to seller.
pub fn normalize_user(raw: &Value) -> User {
    let role = resolve_string(raw, USER_ROLE_ALIASES)
        .map(|s| s.parse().unwrap_or_default())
        .unwrap_or_default();

    User {
        id: resolve_string(raw, USER_ID_ALIASES).unwrap_or_default(),
        name: resolve_string(raw, USER_NAME_ALIASES).unwrap_or_default(),
        username: resolve_string(raw, USER_USERNAME_ALIASES).unwrap_or_default(),
        role,
        password: resolve_string(raw, USER_PASSWORD_ALIASES).unwrap_or_default(),
    }
}

/// Normalizes one raw external-app record. Machine-written, so canonical
/// keys only.
pub fn normalize_app(raw: &Value) -> ExternalApp {
    ExternalApp {
        id: resolve_string(raw, &["id", "ID"]).unwrap_or_default(),
        name: resolve_string(raw, &["name"]).unwrap_or_default(),
        url: resolve_string(raw, &["url", "URL"]).unwrap_or_default(),
        description: resolve_string(raw, &["description"]).unwrap_or_default(),
        icon_name: resolve_string(raw, &["iconName", "icon"]).unwrap_or_default(),
    }
}

// =============================================================================
// Snapshot Mapping
// =============================================================================

/// Maps a collection inside a raw snapshot. Absent or non-array collections
/// become empty lists (the store's replace policy then keeps local data);
/// non-object elements are skipped.
fn normalize_collection<T>(raw: &Value, key: &str, map: fn(&Value) -> T) -> Vec<T> {
    match raw.get(key).and_then(Value::as_array) {
        Some(entries) => entries
            .iter()
            .filter(|entry| entry.is_object())
            .map(map)
            .collect(),
        None => Vec::new(),
    }
}

/// Normalizes a full remote snapshot into `AppData`.
///
/// Never fails: a snapshot that is not even an object yields all-empty
/// collections, which the store treats as "keep everything local".
pub fn normalize_snapshot(raw: &Value) -> AppData {
    AppData {
        products: normalize_collection(raw, "products", normalize_product),
        sales: normalize_collection(raw, "sales", normalize_sale),
        customers: normalize_collection(raw, "customers", normalize_customer),
        users: normalize_collection(raw, "users", normalize_user),
        apps: normalize_collection(raw, "apps", normalize_app),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentType, Role};
    use serde_json::json;

    #[test]
    fn test_loose_number_native_and_strings() {
        assert_eq!(parse_loose_number(&json!(1200)), 1200.0);
        assert_eq!(parse_loose_number(&json!(10.5)), 10.5);
        assert_eq!(parse_loose_number(&json!("25.00")), 25.0);
        assert_eq!(parse_loose_number(&json!("1,5")), 1.5);
        assert_eq!(parse_loose_number(&json!("$1,234.56")), 1234.56);
        assert_eq!(parse_loose_number(&json!("1.234,56")), 1234.56);
        assert_eq!(parse_loose_number(&json!("Bs. 1.234.567")), 1234567.0);
        assert_eq!(parse_loose_number(&json!("1,234,567.89")), 1234567.89);
        assert_eq!(parse_loose_number(&json!("-5")), -5.0);
    }

    #[test]
    fn test_loose_number_defaults_to_zero() {
        assert_eq!(parse_loose_number(&json!("")), 0.0);
        assert_eq!(parse_loose_number(&json!("abc")), 0.0);
        assert_eq!(parse_loose_number(&json!("-")), 0.0);
        assert_eq!(parse_loose_number(&Value::Null), 0.0);
        assert_eq!(parse_loose_number(&json!({"nested": 1})), 0.0);
        assert_eq!(parse_loose_number(&json!(true)), 0.0);
    }

    #[test]
    fn test_loose_money_to_cents() {
        assert_eq!(parse_loose_money(&json!("$10.99")).cents(), 1099);
        assert_eq!(parse_loose_money(&json!(1200)).cents(), 120000);
        assert_eq!(parse_loose_money(&json!("1.200,50")).cents(), 120050);
    }

    #[test]
    fn test_product_name_alias_precedence() {
        let raw = json!({
            "NOMBRE DEL PRODUCTO": "IPHONE 14 PRO MAX",
            "name": "wrong",
            "Precio": "1200",
            "Stock": 10
        });
        let product = normalize_product(&raw);
        assert_eq!(product.name, "IPHONE 14 PRO MAX");
        assert_eq!(product.price.cents(), 120000);
        assert_eq!(product.stock, 10);
    }

    #[test]
    fn test_product_id_prefers_unit_code() {
        let raw = json!({"Imei": "356938035643809", "ID": "42", "name": "X"});
        assert_eq!(normalize_product(&raw).id, "356938035643809");

        let raw = json!({"ID": "42", "name": "X"});
        assert_eq!(normalize_product(&raw).id, "42");
    }

    #[test]
    fn test_product_id_synthesized_when_absent() {
        let product = normalize_product(&json!({"name": "X"}));
        assert!(!product.id.is_empty());
        assert!(product.id.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_product_defaults() {
        let product = normalize_product(&json!({}));
        assert_eq!(product.name, DEFAULT_PRODUCT_NAME);
        assert_eq!(product.category, DEFAULT_CATEGORY);
        assert_eq!(product.sku, "");
        assert_eq!(product.price.cents(), 0);
        assert_eq!(product.stock, 0);
    }

    #[test]
    fn test_product_negative_values_clamp() {
        let raw = json!({"ID": "1", "Precio": "-50", "Stock": -3});
        let product = normalize_product(&raw);
        assert_eq!(product.price.cents(), 0);
        assert_eq!(product.stock, 0);
    }

    #[test]
    fn test_blank_cells_fall_through_aliases() {
        // An empty ID cell must not shadow a real id under another alias
        let raw = json!({"ID": "", "id": "real-id", "name": "X"});
        assert_eq!(normalize_product(&raw).id, "real-id");

        // A zero under the first price alias falls through to a real price
        let raw = json!({"Precio": 0, "PRECIO": 5, "ID": "1"});
        assert_eq!(normalize_product(&raw).price.cents(), 500);
    }

    #[test]
    fn test_numeric_id_coerces_to_string() {
        let raw = json!({"ID": 42, "name": "X"});
        assert_eq!(normalize_product(&raw).id, "42");
    }

    #[test]
    fn test_product_normalization_idempotent() {
        let raw = json!({
            "Imei": "356938035643809",
            "NOMBRE": "REDMI NOTE 12",
            "Precio": "$180.00",
            "Stock": "15",
            "Codigo": "PROD-002",
            "CATEGORIA": "Celulares"
        });
        let first = normalize_product(&raw);

        // Canonical output fed back through is identity
        let canonical = serde_json::to_value(&first).unwrap();
        let second = normalize_product(&canonical);
        assert_eq!(first, second);
    }

    #[test]
    fn test_sale_items_from_embedded_json_string() {
        let raw = json!({
            "id": "17000",
            "date": "2024-05-01T12:00:00Z",
            "items": "[{\"productId\":\"1\",\"quantity\":2,\"priceAtSale\":10.0,\"name\":\"Forro\"}]",
            "total": 20.0,
            "paymentMethod": "Efectivo"
        });
        let sale = normalize_sale(&raw);
        assert_eq!(sale.items.len(), 1);
        assert_eq!(sale.items[0].product_id, "1");
        assert_eq!(sale.items[0].quantity, 2);
        assert_eq!(sale.items[0].price_at_sale.cents(), 1000);
        assert_eq!(sale.total.cents(), 2000);
    }

    #[test]
    fn test_sale_total_recomputed_when_missing() {
        let raw = json!({
            "id": "17001",
            "items": [
                {"productId": "1", "quantity": 3, "priceAtSale": 5.0, "name": "Mica"}
            ]
        });
        assert_eq!(normalize_sale(&raw).total.cents(), 1500);
    }

    #[test]
    fn test_sale_blank_optionals_become_none() {
        // The write path flattens None to "" / 0; reading back restores None
        let raw = json!({
            "id": "17002",
            "items": [],
            "total": 0,
            "customerId": "",
            "customerName": "",
            "exchangeRate": 0
        });
        let sale = normalize_sale(&raw);
        assert_eq!(sale.customer_id, None);
        assert_eq!(sale.customer_name, None);
        assert_eq!(sale.exchange_rate, None);
        assert_eq!(sale.payment_type, PaymentType::Contado);
    }

    #[test]
    fn test_sale_credit_fields_survive() {
        let raw = json!({
            "id": "17003",
            "items": [],
            "total": 0,
            "paymentType": "credito",
            "customerId": "V-123",
            "customerName": "Maria",
            "exchangeRate": 36.5
        });
        let sale = normalize_sale(&raw);
        assert_eq!(sale.payment_type, PaymentType::Credito);
        assert_eq!(sale.customer_id.as_deref(), Some("V-123"));
        assert_eq!(sale.exchange_rate, Some(36.5));
    }

    #[test]
    fn test_user_spanish_headers_and_role() {
        let raw = json!({
            "ID": "u9",
            "Nombre": "Pedro",
            "usuario": "pedro",
            "rol": "almacén",
            "clave": "abc"
        });
        let user = normalize_user(&raw);
        assert_eq!(user.id, "u9");
        assert_eq!(user.username, "pedro");
        assert_eq!(user.role, Role::Warehouse);
        assert_eq!(user.password, "abc");
    }

    #[test]
    fn test_customer_spanish_headers() {
        let raw = json!({
            "Cedula": "V-98765",
            "Nombre": "Maria Lopez",
            "Telefono": "0414-1234567"
        });
        let customer = normalize_customer(&raw);
        assert_eq!(customer.id, "V-98765");
        assert_eq!(customer.name, "Maria Lopez");
        assert_eq!(customer.phone, "0414-1234567");
        assert_eq!(customer.email, "");
    }

    #[test]
    fn test_snapshot_missing_collections_are_empty() {
        let raw = json!({"products": [{"ID": "1", "name": "X"}]});
        let data = normalize_snapshot(&raw);
        assert_eq!(data.products.len(), 1);
        assert!(data.sales.is_empty());
        assert!(data.customers.is_empty());
        assert!(data.users.is_empty());
        assert!(data.apps.is_empty());
    }

    #[test]
    fn test_snapshot_non_array_collection_is_empty() {
        let raw = json!({"products": "not-a-list", "sales": {"weird": true}});
        let data = normalize_snapshot(&raw);
        assert!(data.products.is_empty());
        assert!(data.sales.is_empty());
    }

    #[test]
    fn test_snapshot_skips_non_object_elements() {
        let raw = json!({"products": [{"ID": "1", "name": "X"}, 42, "junk", null]});
        let data = normalize_snapshot(&raw);
        assert_eq!(data.products.len(), 1);
        assert_eq!(data.products[0].id, "1");
    }
}
