//! # Commands
//!
//! One function per subcommand. Each parses its own arguments, calls the
//! engine and prints the result as pretty JSON on stdout.
//!
//! ```text
//! rent <BODY>                         create a rental (JSON body)
//! return <RENTAL_ID> [--paid N] [--note TEXT]
//! show <RENTAL_ID>
//! list [--status S] [--overdue] [--customer ID] [--page N] [--limit N]
//! history [RENTAL_ID] [--customer ID] [--page N] [--limit N]
//! stock [--limit N]
//! low-stock
//! stock-add <BODY>
//! stock-adjust <STOCK_ID> <DELTA>
//! late-fee <STOCK_ID> <FEE>
//! customer-add <BODY>
//! ```
//!
//! `<BODY>` is inline JSON, `@path` to read a file, or `-` for stdin.

use serde::Serialize;
use std::io::Read;
use std::str::FromStr;

use stockhire_core::{
    CreateRentalRequest, NewCustomer, NewStockItem, RentalQuery, RentalStatus,
    ReturnRentalRequest,
};
use stockhire_engine::{ErrorKind, RentalEngine};

use crate::error::CliError;

/// Default row count for `stock`.
const STOCK_LIST_LIMIT: u32 = 100;

// =============================================================================
// Argument Cursor
// =============================================================================

/// Remaining arguments of one subcommand.
#[derive(Debug, Clone, Default)]
pub struct ArgCursor {
    args: Vec<String>,
}

impl ArgCursor {
    pub fn new(args: Vec<String>) -> Self {
        ArgCursor { args }
    }

    /// Removes a boolean flag, returning whether it was present.
    pub fn flag(&mut self, name: &str) -> bool {
        match self.args.iter().position(|a| a == name) {
            Some(idx) => {
                self.args.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Removes `name <VALUE>`.
    pub fn option(&mut self, name: &str) -> Result<Option<String>, CliError> {
        let Some(idx) = self.args.iter().position(|a| a == name) else {
            return Ok(None);
        };
        if idx + 1 >= self.args.len() {
            return Err(CliError::usage(format!("{} expects a value", name)));
        }
        let value = self.args.remove(idx + 1);
        self.args.remove(idx);
        Ok(Some(value))
    }

    /// Removes `name <VALUE>` and parses the value.
    pub fn parsed<T: FromStr>(&mut self, name: &str) -> Result<Option<T>, CliError> {
        match self.option(name)? {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| CliError::usage(format!("{} got an invalid value '{}'", name, raw))),
            None => Ok(None),
        }
    }

    /// Takes the next positional argument, if any.
    pub fn next_positional(&mut self) -> Option<String> {
        let idx = self.args.iter().position(|a| !a.starts_with("--"))?;
        Some(self.args.remove(idx))
    }

    /// Takes the next positional argument.
    pub fn positional(&mut self, what: &str) -> Result<String, CliError> {
        self.next_positional()
            .ok_or_else(|| CliError::usage(format!("missing {}", what)))
    }

    /// Fails on anything left over.
    pub fn finish(self) -> Result<(), CliError> {
        if self.args.is_empty() {
            Ok(())
        } else {
            Err(CliError::usage(format!(
                "unexpected arguments: {}",
                self.args.join(" ")
            )))
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Runs one subcommand.
pub async fn run(engine: &RentalEngine, command: &str, mut args: ArgCursor) -> Result<(), CliError> {
    match command {
        "rent" => {
            let body = read_body(&args.positional("<BODY>")?)?;
            args.finish()?;
            let request = CreateRentalRequest::from_json(&body)?;
            print_json(&engine.create_rental(&request).await?)
        }
        "return" => {
            // Options first so their values are not taken as positionals.
            let paid_on_return = args.parsed::<i64>("--paid")?;
            let note = args.option("--note")?;
            let rental_id = args.positional("<RENTAL_ID>")?;
            args.finish()?;
            let request = ReturnRentalRequest {
                rental_id,
                paid_on_return,
                note,
            };
            print_json(&engine.return_rental(&request).await?)
        }
        "show" => {
            let rental_id = args.positional("<RENTAL_ID>")?;
            args.finish()?;
            print_json(&engine.get_rental(&rental_id).await?)
        }
        "list" => {
            let status = args
                .option("--status")?
                .map(|s| RentalStatus::from_str(&s))
                .transpose()?;
            let query = RentalQuery {
                status,
                overdue: args.flag("--overdue"),
                customer_id: args.option("--customer")?,
                page: args.parsed("--page")?,
                limit: args.parsed("--limit")?,
            };
            args.finish()?;
            print_json(&engine.list_rentals(&query).await?)
        }
        "history" => {
            let customer_id = args.option("--customer")?;
            let page = args.parsed("--page")?;
            let limit = args.parsed("--limit")?;
            let rental_id = args.next_positional();
            args.finish()?;

            match rental_id {
                Some(rental_id) => match engine.get_history(&rental_id).await? {
                    Some(record) => print_json(&record),
                    None => Err(CliError::new(
                        ErrorKind::NotFound,
                        format!("No history for rental {}", rental_id),
                    )),
                },
                None => print_json(
                    &engine
                        .list_history(customer_id.as_deref(), page, limit)
                        .await?,
                ),
            }
        }
        "stock" => {
            let limit = args.parsed("--limit")?.unwrap_or(STOCK_LIST_LIMIT);
            args.finish()?;
            print_json(&engine.catalog().list_stock(limit).await?)
        }
        "low-stock" => {
            args.finish()?;
            print_json(&engine.catalog().low_stock().await?)
        }
        "stock-add" => {
            let body = read_body(&args.positional("<BODY>")?)?;
            args.finish()?;
            let request = NewStockItem::from_json(&body)?;
            print_json(&engine.catalog().add_stock(&request).await?)
        }
        "stock-adjust" => {
            let stock_id = args.positional("<STOCK_ID>")?;
            let delta = parse_number("<DELTA>", &args.positional("<DELTA>")?)?;
            args.finish()?;
            print_json(&engine.catalog().adjust_stock(&stock_id, delta).await?)
        }
        "late-fee" => {
            let stock_id = args.positional("<STOCK_ID>")?;
            let fee = parse_number("<FEE>", &args.positional("<FEE>")?)?;
            args.finish()?;
            print_json(&engine.catalog().set_late_fee(&stock_id, fee).await?)
        }
        "customer-add" => {
            let body = read_body(&args.positional("<BODY>")?)?;
            args.finish()?;
            let request = NewCustomer::from_json(&body)?;
            print_json(&engine.catalog().register_customer(&request).await?)
        }
        other => Err(CliError::usage(format!(
            "unknown command '{}' (try --help)",
            other
        ))),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Resolves a `<BODY>` argument to JSON text.
fn read_body(arg: &str) -> Result<String, CliError> {
    if arg == "-" {
        let mut body = String::new();
        std::io::stdin().read_to_string(&mut body)?;
        Ok(body)
    } else if let Some(path) = arg.strip_prefix('@') {
        Ok(std::fs::read_to_string(path)?)
    } else {
        Ok(arg.to_string())
    }
}

fn parse_number(what: &str, raw: &str) -> Result<i64, CliError> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::usage(format!("{} must be an integer, got '{}'", what, raw)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
