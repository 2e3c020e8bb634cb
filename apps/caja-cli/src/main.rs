//! # Caja CLI
//!
//! Terminal shell over the sync engine.
//!
//! ## Command Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           caja <command>                                │
//! │                                                                         │
//! │  fetch      ──► bootstrap (disk → seed → remote) and print counts      │
//! │  inventory  ──► bootstrap and list cached products                      │
//! │  sell       ──► bootstrap, checkout, print receipt                      │
//! │  stock      ──► bootstrap, set one stock level                          │
//! │  purchase   ──► bootstrap, record a supplier purchase                   │
//! │  status     ──► print endpoint and queue counters                       │
//! │  config     ──► print (or save) the effective configuration             │
//! │                                                                         │
//! │  Commands that queue writes wait for the queue to drain before the     │
//! │  process exits; undelivered writes are reported, not retried across    │
//! │  runs (the next refresh reconciles with the server).                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use caja_core::{Customer, Money, PaymentType, PurchaseDraft, PurchaseItem, SaleDraft, SaleItem};
use caja_store::Store;
use caja_sync::{SubmitOutcome, SyncConfig, SyncService};

// =============================================================================
// Command Line Interface
// =============================================================================

/// Caja - offline-tolerant point of sale register
#[derive(Parser)]
#[command(name = "caja")]
#[command(about = "Caja - offline-tolerant point of sale register")]
#[command(version)]
struct Cli {
    /// Path to sync.toml (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the remote snapshot and refresh the local cache
    Fetch,

    /// Show the endpoint and write queue counters
    Status {
        /// Emit machine-readable JSON instead of the table
        #[arg(long)]
        json: bool,
    },

    /// List cached products
    Inventory,

    /// Ring up a sale
    Sell {
        /// Cart line as PRODUCT_ID:QTY, repeatable
        #[arg(short, long = "item", value_name = "PRODUCT_ID:QTY", required = true)]
        items: Vec<String>,

        /// Tender description recorded on the sale
        #[arg(long, default_value = "Efectivo")]
        method: String,

        /// Sell on credit (requires --customer-id and --customer-name)
        #[arg(long)]
        credit: bool,

        /// Customer id to attach to the sale
        #[arg(long)]
        customer_id: Option<String>,

        /// Customer name to attach to the sale
        #[arg(long)]
        customer_name: Option<String>,

        /// Exchange rate to record on the sale
        #[arg(long)]
        rate: Option<f64>,
    },

    /// Set a product's stock level
    Stock { product_id: String, level: i64 },

    /// Record a supplier purchase
    Purchase {
        /// Supplier name
        #[arg(long)]
        supplier: String,

        /// Purchase line as PRODUCT_ID:QTY:UNIT_COST, repeatable
        #[arg(short, long = "item", value_name = "PRODUCT_ID:QTY:COST", required = true)]
        items: Vec<String>,

        /// Raise local stock by the purchased quantities
        #[arg(long)]
        restock: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Also write it to the config file
        #[arg(long)]
        save: bool,
    },
}

// =============================================================================
// Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = SyncConfig::load_or_default(cli.config.clone());
    debug!(config_file = ?cli.config, "Configuration loaded");
    if let Commands::Purchase { restock: true, .. } = &cli.command {
        config.policy.purchase_restock = true;
    }

    // Config inspection must work before an endpoint is ever set
    if let Commands::Config { save } = &cli.command {
        return run_config(&config, *save);
    }

    let service = SyncService::new(config, Store::new()).context(
        "could not start the sync service; set endpoint_url in sync.toml or CAJA_ENDPOINT_URL",
    )?;

    match cli.command {
        Commands::Fetch => run_fetch(&service).await,
        Commands::Status { json } => run_status(&service, json).await?,
        Commands::Inventory => run_inventory(&service).await,
        Commands::Sell {
            items,
            method,
            credit,
            customer_id,
            customer_name,
            rate,
        } => run_sell(&service, items, method, credit, customer_id, customer_name, rate).await?,
        Commands::Stock { product_id, level } => run_stock(&service, &product_id, level).await?,
        Commands::Purchase {
            supplier, items, ..
        } => run_purchase(&service, supplier, items).await?,
        Commands::Config { .. } => unreachable!(),
    }

    drain_queue(&service, Duration::from_secs(30)).await;
    service.shutdown().await;
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_directives = match verbose {
        0 => "warn,caja_core=info,caja_store=info,caja_sync=info,caja_cli=info",
        1 => "info,caja_core=debug,caja_store=debug,caja_sync=debug,caja_cli=debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directives));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// =============================================================================
// Commands
// =============================================================================

async fn run_fetch(service: &SyncService) {
    let data = service.bootstrap().await;
    println!(
        "{} products, {} sales, {} customers, {} users, {} apps",
        data.products.len(),
        data.sales.len(),
        data.customers.len(),
        data.users.len(),
        data.apps.len()
    );
}

async fn run_status(service: &SyncService, json: bool) -> Result<()> {
    let status = service.status().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("endpoint:     {}", status.endpoint);
    println!("pending:      {}", status.pending);
    println!("sent:         {}", status.sent);
    println!("dropped:      {}", status.dropped);
    match status.last_refresh {
        Some(at) => println!("last refresh: {at}"),
        None => println!("last refresh: never"),
    }
    Ok(())
}

async fn run_inventory(service: &SyncService) {
    let data = service.bootstrap().await;
    if data.products.is_empty() {
        println!("no products in cache");
        return;
    }

    println!(
        "{:<18} {:<32} {:>10} {:>6}  {}",
        "ID", "NAME", "PRICE", "STOCK", "CATEGORY"
    );
    for product in &data.products {
        println!(
            "{:<18} {:<32} {:>10} {:>6}  {}",
            product.id,
            product.name,
            product.price.to_string(),
            product.stock,
            product.category
        );
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_sell(
    service: &SyncService,
    items: Vec<String>,
    method: String,
    credit: bool,
    customer_id: Option<String>,
    customer_name: Option<String>,
    rate: Option<f64>,
) -> Result<()> {
    // Prices come from the cache; refresh them first when a link is up
    service.bootstrap().await;

    let mut cart = Vec::new();
    for entry in &items {
        let (product_id, quantity) = parse_sale_line(entry)?;
        let product = service
            .store()
            .find_product(&product_id)
            .ok_or_else(|| anyhow!("unknown product id: {product_id}"))?;
        cart.push(SaleItem {
            product_id,
            quantity,
            price_at_sale: product.price,
            name: product.name,
        });
    }

    let customer = match (customer_id, customer_name) {
        (Some(id), Some(name)) => Some(Customer {
            id,
            name,
            email: String::new(),
            phone: String::new(),
            address: String::new(),
        }),
        (None, None) => None,
        _ => bail!("--customer-id and --customer-name must be given together"),
    };

    let draft = SaleDraft {
        items: cart,
        payment_method: method,
        payment_type: if credit {
            PaymentType::Credito
        } else {
            PaymentType::Contado
        },
        customer,
        exchange_rate: rate,
    };

    let receipt = service.checkout(draft)?;

    println!("Sale {} committed", receipt.sale.id);
    for item in &receipt.sale.items {
        println!(
            "  {:>3} x {:<32} {:>10}",
            item.quantity,
            item.name,
            item.line_total().to_string()
        );
    }
    println!("  total {}", receipt.sale.total);
    for (product_id, level) in &receipt.stock_levels {
        println!("  stock {product_id} -> {level}");
    }
    match receipt.outcome {
        SubmitOutcome::Queued => {
            println!("  {} write(s) queued for delivery", receipt.queued_mutations);
        }
        SubmitOutcome::DeliveryUnknown => {
            println!("  delivery unknown; the next refresh reconciles");
        }
    }
    Ok(())
}

async fn run_stock(service: &SyncService, product_id: &str, level: i64) -> Result<()> {
    service.bootstrap().await;
    service.update_stock(product_id, level)?;

    match service.store().find_product(product_id) {
        Some(product) => println!("{} stock -> {}", product.name, product.stock),
        None => println!("{product_id} not in cache; update sent to the remote anyway"),
    }
    Ok(())
}

async fn run_purchase(service: &SyncService, supplier: String, items: Vec<String>) -> Result<()> {
    service.bootstrap().await;

    let mut lines = Vec::new();
    for entry in &items {
        let (product_id, quantity, cost) = parse_purchase_line(entry)?;
        let name = service
            .store()
            .find_product(&product_id)
            .map(|p| p.name)
            .unwrap_or_else(|| product_id.clone());
        lines.push(PurchaseItem {
            product_id,
            quantity,
            cost,
            name,
        });
    }

    let receipt = service.record_purchase(PurchaseDraft {
        supplier,
        items: lines,
    })?;

    println!(
        "Purchase {} recorded, total {}",
        receipt.purchase.id, receipt.purchase.total
    );
    for (product_id, level) in &receipt.stock_levels {
        println!("  stock {product_id} -> {level}");
    }
    println!("  {} write(s) queued for delivery", receipt.queued_mutations);
    Ok(())
}

fn run_config(config: &SyncConfig, save: bool) -> Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    if save {
        config.save(None)?;
        println!("# saved");
    }
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

/// Waits for queued writes to deliver so a one-shot invocation does not
/// exit with mutations still in the channel.
async fn drain_queue(service: &SyncService, timeout: Duration) {
    let started = Instant::now();
    loop {
        let status = service.status().await;
        if status.pending == 0 {
            return;
        }
        if started.elapsed() > timeout {
            eprintln!(
                "warning: {} write(s) undelivered; the next refresh reconciles",
                status.pending
            );
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Parses a cart line of the form `PRODUCT_ID:QTY`.
fn parse_sale_line(entry: &str) -> Result<(String, i64)> {
    let (id, qty) = entry
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("cart line must look like PRODUCT_ID:QTY, got: {entry}"))?;
    let quantity: i64 = qty
        .parse()
        .with_context(|| format!("bad quantity in cart line: {entry}"))?;
    Ok((id.to_string(), quantity))
}

/// Parses a purchase line of the form `PRODUCT_ID:QTY:UNIT_COST`, with the
/// cost in decimal units.
fn parse_purchase_line(entry: &str) -> Result<(String, i64, Money)> {
    let bad_shape = || anyhow!("purchase line must look like PRODUCT_ID:QTY:COST, got: {entry}");

    let (rest, cost) = entry.rsplit_once(':').ok_or_else(bad_shape)?;
    let (id, qty) = rest.rsplit_once(':').ok_or_else(bad_shape)?;

    let quantity: i64 = qty
        .parse()
        .with_context(|| format!("bad quantity in purchase line: {entry}"))?;
    let cost: f64 = cost
        .parse()
        .with_context(|| format!("bad unit cost in purchase line: {entry}"))?;
    Ok((id.to_string(), quantity, Money::from_units(cost)))
}
