//! Command-line surface over the engine. Every command prints the shared
//! response envelope, exactly as an HTTP layer would serialize it.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::Value;
use tally_config::TallyConfig;
use tally_core::{
    CustomerId, ExpenseKind, MovementKind, ProductId, PurchaseId, ResponseEnvelope, SaleId,
    TxnKind,
};
use tally_engine::{
    Engine, EngineError, EngineResult, MovementRequest, RevaluationRequest,
};
use tally_ledger::{invoice, LedgerStore, MainAccountQuery};
use uuid::Uuid;

use crate::{export, telemetry};

#[derive(Parser)]
#[command(name = "tally", version, about = "Small-business ledger and inventory engine")]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Override the configured database path.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the database schema and exit.
    Init,
    #[command(subcommand)]
    Customer(CustomerCmd),
    #[command(subcommand)]
    Supplier(SupplierCmd),
    #[command(subcommand)]
    Product(ProductCmd),
    #[command(subcommand)]
    Sale(SaleCmd),
    #[command(subcommand)]
    Purchase(PurchaseCmd),
    /// Record an expense against the main account.
    Expense {
        #[arg(long)]
        amount: String,
        /// Record a refund-like expense adjustment instead.
        #[arg(long)]
        adjustment: bool,
        #[arg(long)]
        description: Option<String>,
    },
    /// Record a direct stock movement.
    Stock {
        #[arg(long)]
        product: String,
        #[arg(long)]
        kind: String,
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        unit_price: String,
        /// Adjustment/miscellaneous moves stock out instead of in.
        #[arg(long)]
        outbound: bool,
        #[arg(long)]
        description: Option<String>,
    },
    /// Main-account listing; defaults to the current calendar month.
    Report {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        ascending: bool,
    },
    /// Export the main-account listing as CSV.
    Export {
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum CustomerCmd {
    /// Register a customer.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        opening_balance: Option<String>,
    },
    /// Show the aggregate row.
    Show {
        #[arg(long)]
        id: String,
    },
    /// Post a transaction against the customer ledger.
    Txn {
        #[arg(long)]
        id: String,
        #[arg(long)]
        kind: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List the customer's ledger entries.
    Ledger {
        #[arg(long)]
        id: String,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum SupplierCmd {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: Option<String>,
    },
    Show {
        #[arg(long)]
        id: String,
    },
    Txn {
        #[arg(long)]
        id: String,
        #[arg(long)]
        kind: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Ledger {
        #[arg(long)]
        id: String,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum ProductCmd {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        sku: String,
        #[arg(long)]
        cost: String,
        #[arg(long)]
        price: String,
    },
    Show {
        #[arg(long)]
        id: String,
    },
    /// List the product's stock movements.
    Movements {
        #[arg(long)]
        id: String,
    },
    /// Edit price/cost/quantity; requires --kind when a value changes.
    Revalue {
        #[arg(long)]
        id: String,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        cost: Option<String>,
        #[arg(long)]
        quantity: Option<String>,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a product without movement history.
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
pub enum SaleCmd {
    /// Create a sale header and its originating ledger entry.
    Create {
        #[arg(long)]
        customer: String,
        #[arg(long)]
        invoice: String,
        #[arg(long)]
        total: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show the header and its line items.
    Show {
        #[arg(long)]
        id: String,
    },
    AddItem {
        #[arg(long)]
        sale: String,
        #[arg(long)]
        product: String,
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        unit_price: Option<String>,
    },
    UpdateItem {
        #[arg(long)]
        item: String,
        #[arg(long)]
        product: Option<String>,
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        unit_price: Option<String>,
    },
    DeleteItem {
        #[arg(long)]
        item: String,
    },
}

#[derive(Subcommand)]
pub enum PurchaseCmd {
    Create {
        #[arg(long)]
        supplier: String,
        #[arg(long)]
        invoice: String,
        #[arg(long)]
        total: String,
        #[arg(long)]
        description: Option<String>,
    },
    AddItem {
        #[arg(long)]
        purchase: String,
        #[arg(long)]
        product: String,
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        unit_price: String,
    },
    UpdateItem {
        #[arg(long)]
        item: String,
        #[arg(long)]
        product: Option<String>,
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        unit_price: Option<String>,
    },
    DeleteItem {
        #[arg(long)]
        item: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = TallyConfig::load(cli.config.as_deref())?;
    let _guard = telemetry::init(&config.log.filter, config.log.directory.as_deref());

    let db_path = cli.db.unwrap_or_else(|| config.database.path.clone());
    let store = LedgerStore::open_with_timeout(
        &db_path,
        Duration::from_millis(config.database.busy_timeout_ms),
    )?;
    let engine = Engine::with_max_retries(store, config.engine.max_retries);
    tracing::debug!(db = %db_path.display(), "engine ready");

    let envelope = execute(&engine, cli.command);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    if envelope.error.is_some() {
        std::process::exit(1);
    }
    Ok(())
}

enum Outcome {
    Created(Value),
    Done(Value),
}

/// Run one command and fold the result into the response envelope.
pub fn execute(engine: &Engine, command: Command) -> ResponseEnvelope<Value> {
    match dispatch(engine, command) {
        Ok(Outcome::Created(value)) => ResponseEnvelope::created(value),
        Ok(Outcome::Done(value)) => ResponseEnvelope::ok(value),
        Err(err) => ResponseEnvelope::failure(err.code(), err.to_string(), err.status()),
    }
}

fn dispatch(engine: &Engine, command: Command) -> EngineResult<Outcome> {
    match command {
        Command::Init => Ok(Outcome::Done(serde_json::json!({"initialized": true}))),
        Command::Customer(cmd) => customer_cmd(engine, cmd),
        Command::Supplier(cmd) => supplier_cmd(engine, cmd),
        Command::Product(cmd) => product_cmd(engine, cmd),
        Command::Sale(cmd) => sale_cmd(engine, cmd),
        Command::Purchase(cmd) => purchase_cmd(engine, cmd),
        Command::Expense {
            amount,
            adjustment,
            description,
        } => {
            let kind = if adjustment {
                ExpenseKind::Adjustment
            } else {
                ExpenseKind::Expense
            };
            let entry = engine.record_expense(kind, parse_decimal(&amount)?, description)?;
            Ok(Outcome::Created(to_value(&entry)?))
        }
        Command::Stock {
            product,
            kind,
            quantity,
            unit_price,
            outbound,
            description,
        } => {
            let mut request = MovementRequest::new(
                parse_id::<ProductId>(&product)?,
                parse_kind::<MovementKind>(&kind)?,
                parse_decimal(&quantity)?,
                parse_decimal(&unit_price)?,
            );
            if outbound {
                request = request.outbound();
            }
            if let Some(description) = description {
                request = request.with_description(description);
            }
            let movement = engine.record_stock_movement(request)?;
            Ok(Outcome::Created(to_value(&movement)?))
        }
        Command::Report {
            start,
            end,
            limit,
            ascending,
        } => {
            let query = build_query(start, end, limit, ascending)?;
            let report = engine.main_account_report(query)?;
            Ok(Outcome::Done(to_value(&report)?))
        }
        Command::Export {
            out,
            start,
            end,
            limit,
        } => {
            let query = build_query(start, end, limit, false)?;
            let report = engine.main_account_report(query)?;
            let written = export::write_csv(&out, &report.transactions)?;
            Ok(Outcome::Done(serde_json::json!({
                "path": out,
                "rows": written,
                "total_balance": report.total_balance,
            })))
        }
    }
}

fn customer_cmd(engine: &Engine, cmd: CustomerCmd) -> EngineResult<Outcome> {
    match cmd {
        CustomerCmd::Add {
            name,
            phone,
            opening_balance,
        } => {
            let opening = opening_balance.as_deref().map(parse_decimal).transpose()?;
            let customer = engine.create_customer(name, phone, opening)?;
            Ok(Outcome::Created(to_value(&customer)?))
        }
        CustomerCmd::Show { id } => {
            let customer = engine.customer(parse_id(&id)?)?;
            Ok(Outcome::Done(to_value(&customer)?))
        }
        CustomerCmd::Txn {
            id,
            kind,
            amount,
            reference,
            description,
        } => {
            let customer_id: CustomerId = parse_id(&id)?;
            let entry = engine.record_counterparty_txn(
                customer_id.into(),
                parse_kind::<TxnKind>(&kind)?,
                parse_decimal(&amount)?,
                reference.as_deref().map(parse_uuid).transpose()?,
                description,
            )?;
            Ok(Outcome::Created(to_value(&entry)?))
        }
        CustomerCmd::Ledger { id, limit } => {
            let customer_id: CustomerId = parse_id(&id)?;
            let entries = engine.counterparty_ledger(customer_id.into(), limit)?;
            Ok(Outcome::Done(to_value(&entries)?))
        }
    }
}

fn supplier_cmd(engine: &Engine, cmd: SupplierCmd) -> EngineResult<Outcome> {
    match cmd {
        SupplierCmd::Add { name, phone } => {
            let supplier = engine.create_supplier(name, phone)?;
            Ok(Outcome::Created(to_value(&supplier)?))
        }
        SupplierCmd::Show { id } => {
            let supplier = engine.supplier(parse_id(&id)?)?;
            Ok(Outcome::Done(to_value(&supplier)?))
        }
        SupplierCmd::Txn {
            id,
            kind,
            amount,
            reference,
            description,
        } => {
            let supplier_id: tally_core::SupplierId = parse_id(&id)?;
            let entry = engine.record_counterparty_txn(
                supplier_id.into(),
                parse_kind::<TxnKind>(&kind)?,
                parse_decimal(&amount)?,
                reference.as_deref().map(parse_uuid).transpose()?,
                description,
            )?;
            Ok(Outcome::Created(to_value(&entry)?))
        }
        SupplierCmd::Ledger { id, limit } => {
            let supplier_id: tally_core::SupplierId = parse_id(&id)?;
            let entries = engine.counterparty_ledger(supplier_id.into(), limit)?;
            Ok(Outcome::Done(to_value(&entries)?))
        }
    }
}

fn product_cmd(engine: &Engine, cmd: ProductCmd) -> EngineResult<Outcome> {
    match cmd {
        ProductCmd::Add {
            name,
            sku,
            cost,
            price,
        } => {
            let product =
                engine.create_product(name, sku, parse_decimal(&cost)?, parse_decimal(&price)?)?;
            Ok(Outcome::Created(to_value(&product)?))
        }
        ProductCmd::Show { id } => {
            let product = engine.product(parse_id(&id)?)?;
            Ok(Outcome::Done(to_value(&product)?))
        }
        ProductCmd::Movements { id } => {
            let movements = engine.product_movements(parse_id(&id)?)?;
            Ok(Outcome::Done(to_value(&movements)?))
        }
        ProductCmd::Revalue {
            id,
            price,
            cost,
            quantity,
            kind,
            description,
        } => {
            let request = RevaluationRequest {
                new_price: price.as_deref().map(parse_decimal).transpose()?,
                new_cost: cost.as_deref().map(parse_decimal).transpose()?,
                new_quantity: quantity.as_deref().map(parse_decimal).transpose()?,
                kind: kind.as_deref().map(parse_kind::<MovementKind>).transpose()?,
                description,
            };
            let movement = engine.revalue_product(parse_id(&id)?, request)?;
            Ok(Outcome::Done(to_value(&movement)?))
        }
        ProductCmd::Delete { id } => {
            engine.delete_product(parse_id(&id)?)?;
            Ok(Outcome::Done(serde_json::json!({"deleted": id})))
        }
    }
}

fn sale_cmd(engine: &Engine, cmd: SaleCmd) -> EngineResult<Outcome> {
    match cmd {
        SaleCmd::Create {
            customer,
            invoice,
            total,
            description,
        } => {
            let (sale, entry) = engine.record_sale(
                parse_id(&customer)?,
                invoice,
                parse_decimal(&total)?,
                description,
            )?;
            Ok(Outcome::Created(serde_json::json!({
                "sale": to_value(&sale)?,
                "entry": to_value(&entry)?,
            })))
        }
        SaleCmd::Show { id } => {
            let sale_id: SaleId = parse_id(&id)?;
            let conn = engine
                .store()
                .reader()
                .map_err(|err| EngineError::Internal(err.to_string()))?;
            let sale = invoice::find_sale(&conn, sale_id)
                .map_err(|err| EngineError::Internal(err.to_string()))?
                .ok_or_else(|| EngineError::NotFound(format!("sale {sale_id}")))?;
            let items = invoice::list_sale_items(&conn, sale_id)
                .map_err(|err| EngineError::Internal(err.to_string()))?;
            Ok(Outcome::Done(serde_json::json!({
                "sale": to_value(&sale)?,
                "items": to_value(&items)?,
            })))
        }
        SaleCmd::AddItem {
            sale,
            product,
            quantity,
            unit_price,
        } => {
            let item = engine.add_sale_item(
                parse_id(&sale)?,
                parse_id(&product)?,
                parse_decimal(&quantity)?,
                unit_price.as_deref().map(parse_decimal).transpose()?,
            )?;
            Ok(Outcome::Created(to_value(&item)?))
        }
        SaleCmd::UpdateItem {
            item,
            product,
            quantity,
            unit_price,
        } => {
            let updated = engine.update_sale_item(
                parse_uuid(&item)?,
                product.as_deref().map(parse_id::<ProductId>).transpose()?,
                parse_decimal(&quantity)?,
                unit_price.as_deref().map(parse_decimal).transpose()?,
            )?;
            Ok(Outcome::Done(to_value(&updated)?))
        }
        SaleCmd::DeleteItem { item } => {
            engine.delete_sale_item(parse_uuid(&item)?)?;
            Ok(Outcome::Done(serde_json::json!({"deleted": item})))
        }
    }
}

fn purchase_cmd(engine: &Engine, cmd: PurchaseCmd) -> EngineResult<Outcome> {
    match cmd {
        PurchaseCmd::Create {
            supplier,
            invoice,
            total,
            description,
        } => {
            let (purchase, entry) = engine.record_purchase(
                parse_id(&supplier)?,
                invoice,
                parse_decimal(&total)?,
                description,
            )?;
            Ok(Outcome::Created(serde_json::json!({
                "purchase": to_value(&purchase)?,
                "entry": to_value(&entry)?,
            })))
        }
        PurchaseCmd::AddItem {
            purchase,
            product,
            quantity,
            unit_price,
        } => {
            let purchase_id: PurchaseId = parse_id(&purchase)?;
            let item = engine.add_purchase_item(
                purchase_id,
                parse_id(&product)?,
                parse_decimal(&quantity)?,
                parse_decimal(&unit_price)?,
            )?;
            Ok(Outcome::Created(to_value(&item)?))
        }
        PurchaseCmd::UpdateItem {
            item,
            product,
            quantity,
            unit_price,
        } => {
            let updated = engine.update_purchase_item(
                parse_uuid(&item)?,
                product.as_deref().map(parse_id::<ProductId>).transpose()?,
                parse_decimal(&quantity)?,
                unit_price.as_deref().map(parse_decimal).transpose()?,
            )?;
            Ok(Outcome::Done(to_value(&updated)?))
        }
        PurchaseCmd::DeleteItem { item } => {
            engine.delete_purchase_item(parse_uuid(&item)?)?;
            Ok(Outcome::Done(serde_json::json!({"deleted": item})))
        }
    }
}

fn build_query(
    start: Option<String>,
    end: Option<String>,
    limit: Option<usize>,
    ascending: bool,
) -> EngineResult<Option<MainAccountQuery>> {
    if start.is_none() && end.is_none() && limit.is_none() && !ascending {
        return Ok(None);
    }
    let mut query = MainAccountQuery::default().with_time_range(
        start.as_deref().map(parse_datetime).transpose()?,
        end.as_deref().map(parse_datetime).transpose()?,
    );
    query = query.with_limit(limit.unwrap_or(tally_engine::DEFAULT_REPORT_LIMIT));
    if ascending {
        query = query.ascending();
    }
    Ok(Some(query))
}

fn parse_decimal(raw: &str) -> EngineResult<Decimal> {
    Decimal::from_str(raw)
        .map_err(|_| EngineError::InvalidArgument(format!("invalid decimal: {raw}")))
}

fn parse_uuid(raw: &str) -> EngineResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| EngineError::InvalidArgument(format!("invalid id: {raw}")))
}

fn parse_id<T: From<Uuid>>(raw: &str) -> EngineResult<T> {
    parse_uuid(raw).map(T::from)
}

fn parse_kind<T>(raw: &str) -> EngineResult<T>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>().map_err(EngineError::InvalidArgument)
}

fn parse_datetime(raw: &str) -> EngineResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| EngineError::InvalidArgument(format!("invalid timestamp: {raw}")))
}

fn to_value<T: serde::Serialize>(value: &T) -> EngineResult<Value> {
    serde_json::to_value(value).map_err(|err| EngineError::Internal(err.to_string()))
}
