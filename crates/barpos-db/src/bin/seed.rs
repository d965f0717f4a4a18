//! # Seed Data Generator
//!
//! Populates the database with a small bar catalogue for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./barpos_dev.db
//! cargo run -p barpos-db --bin seed
//!
//! # Specify database path
//! cargo run -p barpos-db --bin seed -- --db ./data/barpos.db
//! ```
//!
//! ## Generated Data
//! - Beers and soft drinks with bottle deposits
//! - Spirits without deposits
//! - Kitchen items (never stock-tracked)
//! - One open-ended 10% happy-hour promotion on the beers
//! - Default 10% service charge / 8% tax

use std::env;

use barpos_core::{Money, Percent, Product, Promotion, PromotionType, RateSettings};
use barpos_db::{generate_product_id, generate_promotion_id, Database, DbConfig};
use chrono::{Local, Utc};
use rust_decimal::Decimal;

/// (category, name, price, cost, stock, deposit)
const CATALOGUE: &[(&str, &str, i64, i64, i64, i64)] = &[
    ("Beer", "Lion Lager 625ml", 650, 480, 120, 50),
    ("Beer", "Lion Stout 625ml", 720, 530, 60, 50),
    ("Beer", "Carlsberg 625ml", 700, 510, 15, 50),
    ("Beer", "Three Coins Pilsner", 600, 430, 48, 50),
    ("Soft Drinks", "Elephant House Ginger Beer", 250, 160, 80, 20),
    ("Soft Drinks", "Coca-Cola 400ml", 220, 140, 90, 20),
    ("Spirits", "Old Reserve Arrack 750ml", 4200, 3300, 12, 0),
    ("Spirits", "Rockland Gin 750ml", 4800, 3800, 6, 0),
    ("Kitchen", "Devilled Chicken", 1200, 550, 0, 0),
    ("Kitchen", "Hot Butter Cuttlefish", 1400, 700, 0, 0),
    ("Kitchen", "Chips", 600, 200, 0, 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./barpos_dev.db");

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
                println!("BarPOS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./barpos_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("BarPOS Seed Data Generator");
    println!("==========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut beer_ids = Vec::new();
    for &(category, name, price, cost, stock, deposit) in CATALOGUE {
        let product = catalogue_product(category, name, price, cost, stock, deposit);
        if category == "Beer" {
            beer_ids.push(product.id.clone());
        }
        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.name, e);
            continue;
        }
        println!("  + {:<28} {:>8}  ({})", product.name, product.price.to_string(), category);
    }

    let happy_hour = Promotion {
        id: generate_promotion_id(),
        name: "Happy Hour Beers".to_string(),
        description: Some("10% off bottled beer".to_string()),
        promotion_type: PromotionType::Percentage,
        value: Decimal::from(10),
        start_date: Local::now().date_naive(),
        end_date: None,
        is_active: true,
        selected_items: beer_ids,
    };
    db.promotions().insert(&happy_hour).await?;
    println!();
    println!("✓ Promotion '{}' on {} items", happy_hour.name, happy_hour.selected_items.len());

    db.settings()
        .set_rate_settings(&RateSettings::new(
            Percent::from_whole(10),
            Percent::from_whole(8),
        ))
        .await?;
    println!("✓ Rates: 10% service charge, 8% tax");

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn catalogue_product(
    category: &str,
    name: &str,
    price: i64,
    cost: i64,
    stock: i64,
    deposit: i64,
) -> Product {
    let now = Utc::now();

    Product {
        id: generate_product_id(),
        name: name.to_string(),
        category: category.to_string(),
        price: Money::from_major(price),
        cost_price: Money::from_major(cost),
        stock,
        is_deposit_enabled: deposit > 0,
        deposit_amount: Money::from_major(deposit),
        is_deleted: false,
        created_at: now,
        updated_at: now,
    }
}
