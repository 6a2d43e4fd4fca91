//! # Demo Data Seeder
//!
//! Populates a Bodega database with a small hardware-and-grocery store.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by BODEGA_DB_PATH (default ./bodega.db)
//! cargo run -p bodega-db --bin seed
//!
//! # Specify database path
//! cargo run -p bodega-db --bin seed -- --db ./data/bodega.db
//!
//! # More log output
//! RUST_LOG=debug cargo run -p bodega-db --bin seed
//! ```
//!
//! ## What Gets Created
//! - Suppliers and categories
//! - Products with barcodes, prices, average cost and minimum stock
//! - One confirmed purchase per supplier (opening stock + FC- invoice)
//! - Two customers and one paid cash sale
//!
//! Nothing is seeded when the database already has products.

use bodega_core::catalog::{NewCategory, NewCustomer, NewProduct, NewSupplier};
use bodega_core::{Money, PaymentInput, SaleChannel};
use bodega_db::{AppConfig, Database};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// (category, supplier index, name, barcode, price, cost, min stock, tax bps, opening qty)
const PRODUCTS: &[(&str, usize, &str, &str, i64, i64, i64, u32, i64)] = &[
    ("Granos", 0, "Arroz Progreso 1lb", "7421000100012", 1800, 1250, 20, 0, 120),
    ("Granos", 0, "Frijol Rojo 1lb", "7421000100029", 2400, 1700, 20, 0, 80),
    ("Granos", 0, "Azúcar Morena 5lb", "7421000100036", 5500, 4100, 10, 0, 40),
    ("Bebidas", 0, "Café Molido 400g", "7421000100043", 8900, 6200, 6, 1500, 24),
    ("Bebidas", 0, "Agua Purificada 5gal", "7421000100050", 4500, 2800, 10, 1500, 30),
    ("Ferretería", 1, "Cemento Gris 42.5kg", "7421000200019", 26500, 21000, 15, 1500, 60),
    ("Ferretería", 1, "Clavo 3in por libra", "7421000200026", 3500, 2200, 25, 1500, 100),
    ("Ferretería", 1, "Pintura Blanca 1gal", "7421000200033", 42000, 31000, 4, 1500, 12),
    ("Ferretería", 1, "Tubo PVC 1/2in", "7421000200040", 9800, 7000, 10, 1500, 8),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = AppConfig::from_env()?;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bodega Demo Data Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $BODEGA_DB_PATH or ./bodega.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Bodega Demo Data Seeder");
    println!("=======================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config.to_db_config()).await?;
    info!("Database connected and migrations applied");

    let existing = db.catalog().count_products().await?;
    if existing > 0 {
        println!("Database already has {} products, skipping seed.", existing);
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    let catalog = db.catalog();

    // Suppliers
    let mut abarrotes = NewSupplier::named("Distribuidora La Económica");
    abarrotes.rtn = Some("08019001234567".to_string());
    abarrotes.phone = Some("22324455".to_string());
    let mut ferreteria = NewSupplier::named("Materiales del Norte");
    ferreteria.contact = Some("Julia Rivera".to_string());
    let suppliers = vec![
        catalog.create_supplier(&abarrotes).await?,
        catalog.create_supplier(&ferreteria).await?,
    ];
    println!("✓ {} suppliers", suppliers.len());

    // Categories
    let mut categories = Vec::new();
    for name in ["Granos", "Bebidas", "Ferretería"] {
        let category = catalog
            .create_category(&NewCategory {
                name: name.to_string(),
                description: None,
            })
            .await?;
        categories.push(category);
    }
    println!("✓ {} categories", categories.len());

    // Products, with one draft purchase per supplier for the opening stock
    let purchases = db.purchases();
    let mut drafts = Vec::new();
    for supplier in &suppliers {
        drafts.push(purchases.create_draft(Some(&supplier.id), None, Some("seed")).await?);
    }

    let mut products = Vec::new();
    for &(category, supplier_idx, name, barcode, price, cost, min_stock, tax_bps, opening) in PRODUCTS {
        let mut input = NewProduct::new(name, price);
        input.barcode = Some(barcode.to_string());
        input.average_cost_cents = cost;
        input.min_stock = min_stock;
        input.tax_rate_bps = tax_bps;
        input.supplier_id = Some(suppliers[supplier_idx].id.clone());
        input.category_id = categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.id.clone());

        let product = catalog.create_product(&input).await?;
        purchases
            .add_line(&drafts[supplier_idx].id, &product.id, opening, None)
            .await?;
        products.push(product);
    }
    println!("✓ {} products", products.len());

    for draft in &drafts {
        let confirmation = purchases.confirm(&draft.id).await?;
        println!(
            "✓ Purchase {} confirmed: {} entries, total {}",
            confirmation.invoice.number,
            confirmation.entries_created,
            config.format_currency(confirmation.purchase.total_cents)
        );
    }

    // Customers and one cash sale
    let mut maria = NewCustomer::named("María Zelaya");
    maria.phone = Some("99887766".to_string());
    catalog.create_customer(&maria).await?;
    catalog
        .create_customer(&NewCustomer::named("Constructora Valle"))
        .await?;
    println!("✓ 2 customers");

    let sales = db.sales();
    let sale = sales.create_draft(Some("seed"), SaleChannel::Pos, None).await?;
    sales.add_line(&sale.id, &products[0].id, 3, 0).await?;
    sales.add_line(&sale.id, &products[3].id, 1, 0).await?;
    let receipt = sales
        .complete(&sale.id, &PaymentInput::cash(Money::from_cents(20000)), Some("seed"))
        .await?;
    println!(
        "✓ Sale {} paid: total {}, change {}",
        receipt.sale.number,
        config.format_currency(receipt.sale.total_cents),
        config.format_currency(receipt.sale.change_cents)
    );

    let low = db.stock().low_stock().await?;
    println!();
    println!("Low stock: {} products", low.len());
    for level in &low {
        println!("  {} ({} on hand, minimum {})", level.name, level.quantity, level.min_stock);
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Initializes the tracing subscriber for logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Verbose debugging
/// - `RUST_LOG=info` - Normal operation (default)
/// - `RUST_LOG=warn` - Only warnings and errors
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bodega=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();
}
