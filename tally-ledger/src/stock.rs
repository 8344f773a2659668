//! Append-only repository for the stock-movement ledger.

use rusqlite::{params, Connection, OptionalExtension};
use tally_core::{ProductId, StockMovement};

use crate::codec::{parse_datetime, parse_decimal, parse_enum, parse_uuid};
use crate::StoreResult;

const COLUMNS: &str = "sequence, entry_id, product_id, kind, quantity, stock_after, \
                       unit_price, cost_price, sell_price, avg_price, previous_cost, \
                       previous_price, previous_avg_price, counterparty_id, invoice_ref, \
                       total_amount, description, created_at";

/// Persist a movement and assign its store sequence.
pub fn append(conn: &Connection, movement: &mut StockMovement) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO stock_movements (
            entry_id, product_id, kind, quantity, stock_after, unit_price,
            cost_price, sell_price, avg_price, previous_cost, previous_price,
            previous_avg_price, counterparty_id, invoice_ref, total_amount,
            description, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            movement.id.to_string(),
            movement.product_id.to_string(),
            movement.kind.as_str(),
            movement.quantity.to_string(),
            movement.stock_after.to_string(),
            movement.unit_price.to_string(),
            movement.cost_price.to_string(),
            movement.sell_price.to_string(),
            movement.avg_price.to_string(),
            movement.previous_cost.to_string(),
            movement.previous_price.to_string(),
            movement.previous_avg_price.to_string(),
            movement.counterparty_id.map(|id| id.to_string()),
            movement.invoice_ref,
            movement.total_amount.to_string(),
            movement.description,
            movement.created_at.to_rfc3339(),
        ],
    )?;
    movement.sequence = conn.last_insert_rowid();
    Ok(())
}

/// Head of the movement ledger for one product.
pub fn latest_for(conn: &Connection, product_id: ProductId) -> StoreResult<Option<StockMovement>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM stock_movements
                 WHERE product_id = ?1 ORDER BY sequence DESC LIMIT 1"
            ),
            params![product_id.to_string()],
            row_to_raw,
        )
        .optional()?;
    row.map(raw_to_movement).transpose()
}

/// Full movement history for one product, oldest first.
pub fn list_for(conn: &Connection, product_id: ProductId) -> StoreResult<Vec<StockMovement>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM stock_movements
         WHERE product_id = ?1 ORDER BY sequence ASC"
    ))?;
    let mut rows = stmt.query(params![product_id.to_string()])?;
    let mut movements = Vec::new();
    while let Some(row) = rows.next()? {
        movements.push(raw_to_movement(row_to_raw(row)?)?);
    }
    Ok(movements)
}

/// How many movements reference the product; guards aggregate deletion.
pub fn count_for(conn: &Connection, product_id: ProductId) -> StoreResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM stock_movements WHERE product_id = ?1",
        params![product_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

struct RawRow {
    sequence: i64,
    entry_id: String,
    product_id: String,
    kind: String,
    quantity: String,
    stock_after: String,
    unit_price: String,
    cost_price: String,
    sell_price: String,
    avg_price: String,
    previous_cost: String,
    previous_price: String,
    previous_avg_price: String,
    counterparty_id: Option<String>,
    invoice_ref: Option<String>,
    total_amount: String,
    description: Option<String>,
    created_at: String,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        sequence: row.get(0)?,
        entry_id: row.get(1)?,
        product_id: row.get(2)?,
        kind: row.get(3)?,
        quantity: row.get(4)?,
        stock_after: row.get(5)?,
        unit_price: row.get(6)?,
        cost_price: row.get(7)?,
        sell_price: row.get(8)?,
        avg_price: row.get(9)?,
        previous_cost: row.get(10)?,
        previous_price: row.get(11)?,
        previous_avg_price: row.get(12)?,
        counterparty_id: row.get(13)?,
        invoice_ref: row.get(14)?,
        total_amount: row.get(15)?,
        description: row.get(16)?,
        created_at: row.get(17)?,
    })
}

fn raw_to_movement(raw: RawRow) -> StoreResult<StockMovement> {
    Ok(StockMovement {
        id: parse_uuid(&raw.entry_id)?.into(),
        sequence: raw.sequence,
        product_id: parse_uuid(&raw.product_id)?.into(),
        kind: parse_enum(&raw.kind)?,
        quantity: parse_decimal(&raw.quantity)?,
        stock_after: parse_decimal(&raw.stock_after)?,
        unit_price: parse_decimal(&raw.unit_price)?,
        cost_price: parse_decimal(&raw.cost_price)?,
        sell_price: parse_decimal(&raw.sell_price)?,
        avg_price: parse_decimal(&raw.avg_price)?,
        previous_cost: parse_decimal(&raw.previous_cost)?,
        previous_price: parse_decimal(&raw.previous_price)?,
        previous_avg_price: parse_decimal(&raw.previous_avg_price)?,
        counterparty_id: raw.counterparty_id.as_deref().map(parse_uuid).transpose()?,
        invoice_ref: raw.invoice_ref,
        total_amount: parse_decimal(&raw.total_amount)?,
        description: raw.description,
        created_at: parse_datetime(&raw.created_at)?,
    })
}
