// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use book_distribution::config::{self, AppConfig};
use book_distribution::{
    logging, startup_checks, Dashboard, DistributionService, NocoClient, SeedData,
    SetupOrchestrator,
};
use std::env;
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    if matches!(command, Some("help") | Some("--help") | Some("-h")) {
        print_usage();
        return Ok(());
    }

    let config = config::load_and_validate()?;
    startup_checks()?;

    match command {
        Some("setup") => run_setup(&config),
        Some("seed") => run_seed(&config),
        Some("inventory") => run_inventory(&config),
        Some(other) => {
            eprintln!("❌ Unknown command: {}", other);
            print_usage();
            std::process::exit(2);
        }
        None => run_ui_mode(&config),
    }
}

fn print_usage() {
    println!("Usage: book-distribution [setup | seed | inventory]");
    println!("   setup      Create the four tables");
    println!("   seed       Populate Devotees, Books and Products");
    println!("   inventory  Print the inventory and low-stock tables");
    println!("   (none)     Start the terminal UI");
}

/// Runtime, client and resolved base id for one-shot commands
fn connect(config: &AppConfig) -> Result<(Runtime, NocoClient, String)> {
    logging::init_tracing(&config.log_level, None)?;

    let runtime = Runtime::new().context("Failed to start async runtime")?;
    let store = NocoClient::new(&config.store, &config.cache).context("Failed to build HTTP client")?;

    println!("\n🔌 Connecting to {} ...", config.store.base_url);
    let base_id = runtime
        .block_on(SetupOrchestrator::new(&store).connect(&config.store.project_name))
        .with_context(|| {
            format!(
                "Could not find Base ID for project: {}. Please check your project name and API token.",
                config.store.project_name
            )
        })?;
    println!("✓ Project {} → base {}", config.store.project_name, base_id);

    Ok((runtime, store, base_id))
}

fn run_setup(config: &AppConfig) -> Result<()> {
    println!("🛠️  Setup - Create Tables");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let (runtime, store, base_id) = connect(config)?;

    println!("\n📐 Creating tables...");
    let reports = runtime.block_on(SetupOrchestrator::new(&store).provision_schema(&base_id));
    for report in &reports {
        let mark = if report.is_success() { "✓" } else { "✗" };
        println!("{} {}", mark, report.message());
    }

    let created = reports.iter().filter(|r| r.is_success()).count();
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ {}/{} tables created", created, reports.len());

    Ok(())
}

fn run_seed(config: &AppConfig) -> Result<()> {
    println!("🌱 Setup - Populate Tables");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let seeds = SeedData::builtin()?;
    println!(
        "✓ Loaded {} devotees, {} books, {} products",
        seeds.devotees.len(),
        seeds.books.len(),
        seeds.products.len()
    );

    let (runtime, store, base_id) = connect(config)?;

    println!("\n💾 Inserting rows...");
    let reports = runtime.block_on(SetupOrchestrator::new(&store).seed_data(&base_id, &seeds));
    for report in &reports {
        let mark = if report.appended_duplicates() {
            "⚠"
        } else if report.is_success() {
            "✓"
        } else {
            "✗"
        };
        println!("{} {}", mark, report.message());
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if reports.iter().any(|r| r.appended_duplicates()) {
        println!("⚠️  Some tables already had rows; duplicates were appended.");
    } else if reports.iter().all(|r| r.is_success()) {
        println!("✅ All tables populated");
    } else {
        println!("❌ Some tables could not be populated");
    }

    Ok(())
}

fn run_inventory(config: &AppConfig) -> Result<()> {
    println!("📊 Inventory Dashboard");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let (runtime, store, base_id) = connect(config)?;
    let service = runtime.block_on(DistributionService::load(&store, &base_id))?;

    if service.products().is_empty() {
        println!("\n⚠️  No product data found. Run: book-distribution seed");
        return Ok(());
    }

    let dashboard = Dashboard::from_products(service.products());

    println!();
    println!(
        "{:<10} {:<24} {:<12} {:>6} {:>6} {:>6} {:>7}",
        "SKU", "Book", "Language", "Stock", "Min", "Cost", "Selling"
    );
    for row in &dashboard.inventory {
        println!(
            "{:<10} {:<24} {:<12} {:>6} {:>6} {:>6} {:>7}",
            row.sku, row.book, row.language, row.stock_quantity, row.min_stock, row.cost_price, row.selling_price
        );
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if dashboard.all_clear() {
        println!("✅ All items are sufficiently stocked.");
    } else {
        println!("⚠️  Low Stock Alert ({} items)", dashboard.low_stock.len());
        for row in &dashboard.low_stock {
            println!("   {:<10} {:<24} stock {:>3} / min {:>3}", row.sku, row.book, row.stock_quantity, row.min_stock);
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig) -> Result<()> {
    println!("🖥️  Loading Book Distribution UI...\n");

    logging::init_tracing(&config.log_level, Some(std::path::Path::new(&config.log_file)))?;

    let runtime = Runtime::new().context("Failed to start async runtime")?;
    let store = NocoClient::new(&config.store, &config.cache).context("Failed to build HTTP client")?;

    println!("Starting UI... (Press 'q' to quit, logs in {})\n", config.log_file);

    let mut app = ui::App::new(config.store.project_name.clone());
    ui::run_ui(&runtime, &store, &mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the CLI: book-distribution [setup | seed | inventory]");
    std::process::exit(1);
}
