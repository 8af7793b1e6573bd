//! # Seed Data Generator
//!
//! Populates a development database with customers, tables and a week of
//! reservations for one owner.
//!
//! ## Usage
//! ```bash
//! # Seed the default owner ("admin")
//! cargo run -p tablebook-db --bin seed
//!
//! # Wipe the owner's data first
//! cargo run -p tablebook-db --bin seed -- --clear
//!
//! # Specify database path and owner
//! cargo run -p tablebook-db --bin seed -- --db ./data/tablebook.db --owner trattoria
//! ```
//!
//! ## Generated Data
//! - 10 customers with Chilean phone numbers
//! - 10 tables, capacities 2 to 10
//! - 5 to 10 reservations per day for the next 7 days, lunch and dinner
//!   slots, each one booked through the reservation validator

use std::env;
use std::time::Instant;

use chrono::Days;
use tablebook_core::{NewCustomer, NewReservation, NewTable, OwnerContext};
use tablebook_db::{AppConfig, Database, DbError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Juan Pérez", "juan.perez@email.com", "912345678"),
    ("María González", "maria.gonzalez@email.com", "923456789"),
    ("Carlos Rodríguez", "carlos.rodriguez@email.com", "934567890"),
    ("Ana Martínez", "ana.martinez@email.com", "945678901"),
    ("Pedro Sánchez", "pedro.sanchez@email.com", "956789012"),
    ("Laura Torres", "laura.torres@email.com", "967890123"),
    ("Diego Ramírez", "diego.ramirez@email.com", "978901234"),
    ("Carmen Flores", "carmen.flores@email.com", "989012345"),
    ("Roberto Silva", "roberto.silva@email.com", "990123456"),
    ("Patricia Díaz", "patricia.diaz@email.com", "221234567"),
];

/// (table number, capacity)
const TABLES: &[(u32, u32)] = &[
    (1, 2),
    (2, 2),
    (3, 4),
    (4, 4),
    (5, 4),
    (6, 6),
    (7, 6),
    (8, 8),
    (9, 8),
    (10, 10),
];

/// Lunch and dinner service, (hour, minute)
const SERVICE_TIMES: &[(u32, u32)] = &[
    (12, 0),
    (12, 30),
    (13, 0),
    (13, 30),
    (14, 0),
    (14, 30),
    (19, 0),
    (19, 30),
    (20, 0),
    (20, 30),
    (21, 0),
    (21, 30),
    (22, 0),
    (22, 30),
];

const DAYS_AHEAD: u64 = 7;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut config = AppConfig::from_env()?;
    let mut owner_name = String::from("admin");
    let mut clear = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--owner" | "-o" => {
                if i + 1 < args.len() {
                    owner_name = args[i + 1].clone();
                    i += 1;
                }
            }
            "--clear" => clear = true,
            "--help" | "-h" => {
                println!("Tablebook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: $TABLEBOOK_DATABASE_PATH)");
                println!("  -o, --owner <NAME>   Owner username to seed (default: admin)");
                println!("      --clear          Delete the owner's data before seeding");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    println!("🌱 Tablebook Seed Data Generator");
    println!("================================");
    println!("Database: {}", config.database_path.display());
    println!("Owner:    {}", owner_name);
    println!();

    let db = Database::from_app_config(&config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let ctx = match db.owners().find_by_username(&owner_name).await? {
        Some(owner) => owner.context(),
        None => {
            let email = format!("{}@tablebook.cl", owner_name.to_lowercase());
            let owner = db.owners().provision(&owner_name, &email).await?;
            println!("✓ Owner '{}' created", owner.username);
            owner.context()
        }
    };

    if clear {
        let cleared = db.owners().clear_data(&ctx).await?;
        println!(
            "✓ Removed {} reservations, {} tables, {} customers",
            cleared.reservations, cleared.tables, cleared.customers
        );
    }

    // The implicit customer is always there
    let existing = db.owners().counts(&ctx).await?;
    if existing.tables > 0 || existing.reservations > 0 || existing.customers > 1 {
        println!("⚠ Owner already has data");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Run again with --clear to regenerate.");
        return Ok(());
    }

    let start = Instant::now();
    let (customers, tables) = seed_directory(&db, &ctx).await?;
    println!("✓ {} customers created", customers.len());
    println!("✓ {} tables created", tables.len());

    let booked = seed_reservations(&db, &ctx, &customers, &tables).await?;
    println!("✓ {} reservations created", booked);

    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());

    let overview = db.stats().overview(&ctx).await?;
    println!("  Upcoming reservations: {}", overview.upcoming);
    let busiest: Vec<String> = overview
        .top_times
        .iter()
        .map(|slot| slot.time.format("%H:%M").to_string())
        .collect();
    println!("  Busiest times: {}", busiest.join(", "));

    db.close().await;
    Ok(())
}

/// Creates the customers and tables. Returns their ids.
async fn seed_directory(
    db: &Database,
    ctx: &OwnerContext,
) -> Result<(Vec<String>, Vec<String>), DbError> {
    let mut customers = Vec::with_capacity(CUSTOMERS.len());
    for (name, email, phone) in CUSTOMERS {
        let customer = db
            .customers()
            .create(
                ctx,
                &NewCustomer {
                    name: name.to_string(),
                    email: email.to_string(),
                    phone: phone.to_string(),
                },
            )
            .await?;
        customers.push(customer.id);
    }

    let mut tables = Vec::with_capacity(TABLES.len());
    for (number, capacity) in TABLES {
        let table = db
            .tables()
            .create(
                ctx,
                &NewTable {
                    table_number: *number,
                    capacity: *capacity,
                    is_active: true,
                },
            )
            .await?;
        tables.push(table.id);
    }

    Ok((customers, tables))
}

/// Books 5-10 reservations per day for the next week.
async fn seed_reservations(
    db: &Database,
    ctx: &OwnerContext,
    customers: &[String],
    tables: &[String],
) -> Result<usize, DbError> {
    let today = db.today();
    let mut booked = 0;

    for day in 0..DAYS_AHEAD {
        let Some(date) = today.checked_add_days(Days::new(day)) else {
            break;
        };

        let per_day = 5 + (day as usize * 3) % 6;
        for n in 0..per_day.min(tables.len()) {
            let seed = day as usize * 31 + n * 7;
            let (hour, minute) = SERVICE_TIMES[seed % SERVICE_TIMES.len()];
            let Some(time) = chrono::NaiveTime::from_hms_opt(hour, minute, 0) else {
                continue;
            };

            let input = NewReservation {
                date,
                time,
                customer_id: customers[seed % customers.len()].clone(),
                table_id: tables[(n + day as usize) % tables.len()].clone(),
                notes: None,
            };

            match db.reservations().create(ctx, &input).await {
                Ok(_) => booked += 1,
                // Seeding today after closing time, or a repeated slot
                Err(DbError::Validation(errors)) => {
                    info!(%date, %time, errors = %errors, "Skipped reservation");
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(booked)
}
