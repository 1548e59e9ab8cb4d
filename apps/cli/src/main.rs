//! # StockHire Operator CLI
//!
//! ## Usage
//! ```bash
//! stockhire [--config PATH] <COMMAND> [ARGS]
//!
//! stockhire rent '{"customer_id":"c-1","deadline_date":"2024-01-10",
//!                  "paid_amount":0,"items":[{"stock_id":"s-1","qty":2}],
//!                  "processed_by":"desk-1"}'
//! stockhire return r-1 --paid 3000
//! stockhire list --overdue
//! ```
//!
//! ## Startup Sequence
//! 1. Parse global flags and the command name
//! 2. Initialize tracing (stderr, so stdout stays pure JSON)
//! 3. Load `stockhire.toml` + environment overrides
//! 4. Open the database and run migrations
//! 5. Run the command

mod commands;
mod error;

use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use stockhire_engine::{EngineConfig, RentalEngine};

use crate::commands::ArgCursor;
use crate::error::CliError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let global = match parse_global_args(env::args().skip(1).collect()) {
        Ok(global) => global,
        Err(err) => exit_with(err),
    };

    let mut rest = global.rest;
    if global.help || rest.is_empty() {
        print_help();
        return Ok(());
    }
    let command = rest.remove(0);

    init_tracing();

    if let Err(err) = run(global.config_path, &command, ArgCursor::new(rest)).await {
        exit_with(err);
    }

    Ok(())
}

/// Flags that come before the command name.
#[derive(Debug, Default, PartialEq)]
struct GlobalArgs {
    config_path: Option<PathBuf>,
    help: bool,
    /// Command name followed by its own arguments.
    rest: Vec<String>,
}

fn parse_global_args(args: Vec<String>) -> Result<GlobalArgs, CliError> {
    let mut global = GlobalArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" if global.rest.is_empty() => {
                let path = args
                    .next()
                    .ok_or_else(|| CliError::usage(format!("{} requires a path", arg)))?;
                global.config_path = Some(PathBuf::from(path));
            }
            "--help" | "-h" if global.rest.is_empty() => {
                global.help = true;
                return Ok(global);
            }
            _ => global.rest.push(arg),
        }
    }

    Ok(global)
}

fn exit_with(err: CliError) -> ! {
    eprintln!("{}", err.to_json());
    std::process::exit(err.exit_code());
}

async fn run(config_path: Option<PathBuf>, command: &str, args: ArgCursor) -> Result<(), CliError> {
    let config = EngineConfig::load(config_path)?;
    debug!(db = %config.database.path.display(), command, "Configuration loaded");

    if let Some(data_dir) = config.database.path.parent() {
        if !data_dir.as_os_str().is_empty() {
            std::fs::create_dir_all(data_dir)?;
        }
    }

    let engine = RentalEngine::open(config).await?;
    let result = commands::run(&engine, command, args).await;
    engine.db().close().await;

    result
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=stockhire_engine=trace` - Trace the engine only
/// - Default: info, debug for stockhire crates, warn for sqlx
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockhire=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_help() {
    println!("StockHire - rental and reservation engine");
    println!();
    println!("Usage: stockhire [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>   Config file (default: $STOCKHIRE_CONFIG or platform config dir)");
    println!("  -h, --help            Show this help message");
    println!();
    println!("Rentals:");
    println!("  rent <BODY>                           Create a rental");
    println!("  return <RENTAL_ID> [--paid N] [--note TEXT]");
    println!("                                        Return all items and settle fees");
    println!("  show <RENTAL_ID>                      Show one rental");
    println!("  list [--status S] [--overdue] [--customer ID] [--page N] [--limit N]");
    println!("  history [RENTAL_ID] [--customer ID] [--page N] [--limit N]");
    println!();
    println!("Catalog:");
    println!("  stock [--limit N]                     List stock items");
    println!("  low-stock                             Items at or below reorder threshold");
    println!("  stock-add <BODY>                      Add a stock item");
    println!("  stock-adjust <STOCK_ID> <DELTA>       Restock or write off units");
    println!("  late-fee <STOCK_ID> <FEE>             Change the daily late fee");
    println!("  customer-add <BODY>                   Register a customer");
    println!();
    println!("<BODY> is inline JSON, @path for a file, or - for stdin.");
}
