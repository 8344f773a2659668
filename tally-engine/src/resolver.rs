//! Balance and stock resolvers.
//!
//! Every resolver takes the connection of the scope it runs in. Writers
//! resolve on a reader connection while holding the entity lock, then
//! re-validate the returned `head` inside the write transaction; reading
//! a position outside that discipline and writing against it is the
//! staleness bug this module exists to prevent.

use rusqlite::Connection;
use rust_decimal::Decimal;
use tally_core::{CounterpartyId, PartyKind, Product, ProductId};
use tally_ledger::{counterparty, main_account, party, product, stock};

use crate::{EngineError, EngineResult};

/// Current position of one counterparty: balance, its receivable/debt
/// companion, and the ledger head the values were read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterpartyPosition {
    pub balance: Decimal,
    pub secondary: Decimal,
    pub head: Option<i64>,
}

/// Current global cash position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MainPosition {
    pub balance: Decimal,
    pub head: Option<i64>,
}

/// Current product position: the aggregate row plus the movement head.
#[derive(Clone, Debug)]
pub struct StockPosition {
    pub product: Product,
    pub head: Option<i64>,
}

/// Balance/receivable-or-debt for a counterparty, falling back to the
/// aggregate's stored values when no ledger entry exists yet.
pub fn resolve_counterparty(
    conn: &Connection,
    counterparty_id: CounterpartyId,
) -> EngineResult<CounterpartyPosition> {
    let (aggregate_balance, secondary) = match counterparty_id {
        CounterpartyId::Customer(id) => {
            let customer = party::find_customer(conn, id)?
                .ok_or_else(|| EngineError::NotFound(format!("customer {id}")))?;
            (customer.current_balance, customer.receivable)
        }
        CounterpartyId::Supplier(id) => {
            let supplier = party::find_supplier(conn, id)?
                .ok_or_else(|| EngineError::NotFound(format!("supplier {id}")))?;
            (supplier.current_balance, supplier.debt)
        }
    };
    let head_entry = counterparty::latest_for(conn, counterparty_id)?;
    let (balance, head) = match head_entry {
        Some(entry) => (entry.balance_after, Some(entry.sequence)),
        None => (aggregate_balance, None),
    };
    Ok(CounterpartyPosition {
        balance,
        secondary,
        head,
    })
}

/// Global balance from the head entry, or the singleton row before the
/// first entry exists.
pub fn resolve_main(conn: &Connection) -> EngineResult<MainPosition> {
    match main_account::latest(conn)? {
        Some(entry) => Ok(MainPosition {
            balance: entry.balance_after,
            head: Some(entry.sequence),
        }),
        None => Ok(MainPosition {
            balance: main_account::read_balance(conn)?,
            head: None,
        }),
    }
}

/// Live quantity and price snapshot for a product.
pub fn resolve_stock(conn: &Connection, product_id: ProductId) -> EngineResult<StockPosition> {
    let row = product::find(conn, product_id)?
        .ok_or_else(|| EngineError::InvalidArgument(format!("unknown product {product_id}")))?;
    let head = stock::latest_for(conn, product_id)?.map(|movement| movement.sequence);
    Ok(StockPosition { product: row, head })
}

/// Confirm the counterparty ledger head has not moved since `expected`.
pub fn check_counterparty_head(
    conn: &Connection,
    counterparty_id: CounterpartyId,
    expected: Option<i64>,
) -> EngineResult<()> {
    let head = counterparty::latest_for(conn, counterparty_id)?.map(|entry| entry.sequence);
    if head != expected {
        return Err(EngineError::Conflict(format!(
            "{} ledger advanced during write",
            match counterparty_id.party_kind() {
                PartyKind::Customer => "customer",
                PartyKind::Supplier => "supplier",
            }
        )));
    }
    Ok(())
}

/// Confirm the main-account head has not moved since `expected`.
pub fn check_main_head(conn: &Connection, expected: Option<i64>) -> EngineResult<()> {
    let head = main_account::latest(conn)?.map(|entry| entry.sequence);
    if head != expected {
        return Err(EngineError::Conflict(
            "main account ledger advanced during write".into(),
        ));
    }
    Ok(())
}

/// Confirm the product movement head has not moved since `expected`.
pub fn check_stock_head(
    conn: &Connection,
    product_id: ProductId,
    expected: Option<i64>,
) -> EngineResult<()> {
    let head = stock::latest_for(conn, product_id)?.map(|movement| movement.sequence);
    if head != expected {
        return Err(EngineError::Conflict(format!(
            "stock ledger for product {product_id} advanced during write"
        )));
    }
    Ok(())
}
