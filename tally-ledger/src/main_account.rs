//! Repository for the global cash-position ledger and its singleton
//! balance row.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tally_core::MainAccountTxn;

use crate::codec::{optional_text, parse_datetime, parse_decimal, parse_enum, parse_uuid};
use crate::{MainAccountQuery, StoreResult};

const COLUMNS: &str = "sequence, entry_id, direction, source, source_id, reference_id, \
                       amount, balance_after, description, created_at";

/// Persist an entry and assign its store sequence.
pub fn append(conn: &Connection, entry: &mut MainAccountTxn) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO main_account_txns (
            entry_id, direction, source, source_id, reference_id,
            amount, balance_after, description, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.id.to_string(),
            entry.direction.as_str(),
            entry.source.as_str(),
            entry.source_id.map(|id| id.to_string()),
            entry.reference_id.map(|id| id.to_string()),
            entry.amount.to_string(),
            entry.balance_after.to_string(),
            entry.description,
            entry.created_at.to_rfc3339(),
        ],
    )?;
    entry.sequence = conn.last_insert_rowid();
    Ok(())
}

/// Head of the global ledger.
pub fn latest(conn: &Connection) -> StoreResult<Option<MainAccountTxn>> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM main_account_txns ORDER BY sequence DESC LIMIT 1"),
            [],
            row_to_raw,
        )
        .optional()?;
    row.map(raw_to_txn).transpose()
}

/// Stored balance on the singleton main-account row.
pub fn read_balance(conn: &Connection) -> StoreResult<Decimal> {
    let raw: String = conn.query_row(
        "SELECT balance FROM main_account WHERE id = 1",
        [],
        |row| row.get(0),
    )?;
    parse_decimal(&raw)
}

/// Overwrite the singleton balance; caller is inside the atomic unit.
pub fn write_balance(conn: &Connection, balance: Decimal) -> StoreResult<()> {
    conn.execute(
        "UPDATE main_account SET balance = ?1 WHERE id = 1",
        params![balance.to_string()],
    )?;
    Ok(())
}

/// Entries matching the supplied filter.
pub fn query(conn: &Connection, query: &MainAccountQuery) -> StoreResult<Vec<MainAccountTxn>> {
    let mut sql = format!(
        "SELECT {COLUMNS} FROM main_account_txns
         WHERE (?1 IS NULL OR direction = ?1)
           AND (?2 IS NULL OR source = ?2)
           AND (?3 IS NULL OR created_at >= ?3)
           AND (?4 IS NULL OR created_at <= ?4)"
    );
    sql.push_str(if query.ascending {
        " ORDER BY sequence ASC"
    } else {
        " ORDER BY sequence DESC"
    });
    if query.limit.is_some() {
        sql.push_str(" LIMIT ?5");
    }

    let mut params: Vec<Value> = Vec::with_capacity(5);
    params.push(optional_text(
        query.direction.map(|d| d.as_str().to_string()),
    ));
    params.push(optional_text(query.source.map(|s| s.as_str().to_string())));
    params.push(optional_text(query.start_time.map(|ts| ts.to_rfc3339())));
    params.push(optional_text(query.end_time.map(|ts| ts.to_rfc3339())));
    if let Some(limit) = query.limit {
        params.push(Value::Integer(limit as i64));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        entries.push(raw_to_txn(row_to_raw(row)?)?);
    }
    Ok(entries)
}

type RawRow = (
    i64,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    Option<String>,
    String,
);

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn raw_to_txn(raw: RawRow) -> StoreResult<MainAccountTxn> {
    let (
        sequence,
        entry_id,
        direction,
        source,
        source_id,
        reference_id,
        amount,
        balance_after,
        description,
        created_at,
    ) = raw;
    Ok(MainAccountTxn {
        id: parse_uuid(&entry_id)?.into(),
        sequence,
        direction: parse_enum(&direction)?,
        source: parse_enum(&source)?,
        source_id: source_id.as_deref().map(parse_uuid).transpose()?,
        reference_id: reference_id.as_deref().map(parse_uuid).transpose()?,
        amount: parse_decimal(&amount)?,
        balance_after: parse_decimal(&balance_after)?,
        description,
        created_at: parse_datetime(&created_at)?,
    })
}
