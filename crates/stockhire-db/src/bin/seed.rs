//! # Seed Data Generator
//!
//! Populates the database with demo customers and rental stock.
//!
//! ## Usage
//! ```bash
//! # Seed ./stockhire_dev.db
//! cargo run -p stockhire-db --bin seed
//!
//! # Specify database path
//! cargo run -p stockhire-db --bin seed -- --db ./data/stockhire.db
//! ```
//!
//! ## Generated Data
//! - A handful of customers with canonical phone numbers
//! - Camping and event stock in several colors/sizes, each with a daily
//!   late fee and a reorder threshold

use chrono::Utc;
use std::env;
use stockhire_core::validation::normalize_phone;
use stockhire_core::{Customer, StockItem};
use stockhire_db::{generate_id, Database, DbConfig};

/// Demo customers: (name, raw phone, national id)
const CUSTOMERS: &[(&str, &str, Option<&str>)] = &[
    ("Ada Lovelace", "0555 010 101", Some("AL-1815")),
    ("Grace Hopper", "+1 555 010 2020", None),
    ("Alan Turing", "0555 030 303", Some("AT-1912")),
    ("Katherine Johnson", "0555 040 404", None),
    ("Edsger Dijkstra", "0031 20 555 0505", None),
];

/// Demo stock: (name, colors, sizes, quantity, daily late fee, reorder threshold)
const STOCK: &[(&str, &[&str], &[&str], i64, i64, i64)] = &[
    ("Dome Tent", &["green", "orange"], &["2P", "4P"], 12, 500, 3),
    ("Sleeping Bag", &["blue"], &["M", "L"], 30, 150, 5),
    ("Camping Stove", &["black"], &[], 8, 250, 2),
    ("Folding Chair", &["grey", "red"], &[], 60, 50, 10),
    ("Marquee", &["white"], &["6x3", "12x6"], 4, 2500, 1),
    ("Lantern", &[], &[], 25, 75, 5),
];

/// Country code assumed for phones written without one.
const DEFAULT_COUNTRY_CODE: &str = "44";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./stockhire_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("StockHire Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./stockhire_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 StockHire Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.stock().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} stock items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();

    println!();
    println!("Registering customers...");
    for (name, raw_phone, national_id) in CUSTOMERS {
        let customer = Customer {
            id: generate_id(),
            name: name.to_string(),
            phone: normalize_phone(raw_phone, DEFAULT_COUNTRY_CODE)?,
            national_id: national_id.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        match db.customers().register(&customer).await {
            Ok(c) => println!("  {} {} ({})", c.id, c.name, c.phone),
            Err(e) => eprintln!("Failed to register {}: {}", name, e),
        }
    }

    println!();
    println!("Stocking shelves...");
    let mut generated = 0;
    for (name, colors, sizes, quantity, fee, threshold) in STOCK {
        for item in variants(name, colors, sizes, *quantity, *fee, *threshold) {
            if let Err(e) = db.stock().insert(&item).await {
                eprintln!("Failed to insert {}: {}", item.name, e);
                continue;
            }
            println!(
                "  {} {} [{} / {}] qty {}",
                item.id,
                item.name,
                item.color.as_deref().unwrap_or("-"),
                item.size.as_deref().unwrap_or("-"),
                item.quantity
            );
            generated += 1;
        }
    }

    println!();
    println!("✓ Created {} stock items", generated);
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Expands one catalog entry into one stock item per color/size pair.
fn variants(
    name: &str,
    colors: &[&str],
    sizes: &[&str],
    quantity: i64,
    daily_late_fee: i64,
    reorder_threshold: i64,
) -> Vec<StockItem> {
    let now = Utc::now();
    let colors: Vec<Option<&str>> = if colors.is_empty() {
        vec![None]
    } else {
        colors.iter().copied().map(Some).collect()
    };
    let sizes: Vec<Option<&str>> = if sizes.is_empty() {
        vec![None]
    } else {
        sizes.iter().copied().map(Some).collect()
    };

    let mut items = Vec::new();
    for color in &colors {
        for size in &sizes {
            items.push(StockItem {
                id: generate_id(),
                name: name.to_string(),
                color: color.map(str::to_string),
                size: size.map(str::to_string),
                quantity,
                daily_late_fee,
                reorder_threshold: Some(reorder_threshold),
                created_at: now,
                updated_at: now,
                version: 0,
            });
        }
    }
    items
}
