//! # Starter Data
//!
//! First-run inventory so the register is usable before it has ever
//! reached the remote sheet. Replaced wholesale by the first successful
//! fetch (the starter collections are all non-empty except sales and
//! apps, which start blank on the server too).

use caja_core::{AppData, Customer, Money, Product, Role, User};

/// Starter catalog: (id, name, price in cents, stock, sku, category).
const STARTER_PRODUCTS: &[(&str, &str, i64, i64, &str, &str)] = &[
    ("1", "IPHONE 14 PRO MAX", 120_000, 10, "PROD-001", "Celulares"),
    ("2", "CARGADOR 20W ORIGINAL", 2_500, 50, "ACC-001", "Accesorios"),
    ("3", "FORRO SILICONE CASE", 1_000, 100, "ACC-002", "Accesorios"),
    ("4", "REDMI NOTE 12", 18_000, 15, "PROD-002", "Celulares"),
    ("5", "MICA CERAMICA", 500, 200, "ACC-003", "Accesorios"),
];

/// Builds the data a fresh install starts with.
///
/// Includes a walk-in customer for quick cash sales and two login
/// accounts (one admin, one seller).
pub fn starter_data() -> AppData {
    let products = STARTER_PRODUCTS
        .iter()
        .map(|&(id, name, price_cents, stock, sku, category)| Product {
            id: id.to_string(),
            name: name.to_string(),
            price: Money::from_cents(price_cents),
            stock,
            sku: sku.to_string(),
            category: category.to_string(),
        })
        .collect();

    let customers = vec![Customer {
        id: "V-12345678".to_string(),
        name: "Cliente Mostrador".to_string(),
        email: String::new(),
        phone: "000-0000000".to_string(),
        address: String::new(),
    }];

    let users = vec![
        User {
            id: "admin".to_string(),
            name: "Administrador".to_string(),
            username: "admin".to_string(),
            role: Role::Admin,
            password: "123".to_string(),
        },
        User {
            id: "vendedor".to_string(),
            name: "Vendedor 1".to_string(),
            username: "vendedor".to_string(),
            role: Role::Seller,
            password: "123".to_string(),
        },
    ];

    AppData {
        products,
        sales: Vec::new(),
        customers,
        users,
        apps: Vec::new(),
    }
}
