//! Append-only repository for the counterparty transaction ledger.
//!
//! Customer and supplier entries are structurally identical and share one
//! table; balance chaining keys on (party_kind, counterparty_id).

use rusqlite::{params, Connection, OptionalExtension};
use tally_core::{CounterpartyId, CounterpartyTxn, CustomerId, PartyKind, SupplierId};

use crate::codec::{parse_datetime, parse_decimal, parse_enum, parse_uuid};
use crate::StoreResult;

const COLUMNS: &str = "sequence, entry_id, party_kind, counterparty_id, kind, amount, \
                       balance_after, reference_id, description, created_at";

/// Persist an entry and assign its store sequence.
pub fn append(conn: &Connection, entry: &mut CounterpartyTxn) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO counterparty_txns (
            entry_id, party_kind, counterparty_id, kind, amount,
            balance_after, reference_id, description, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.id.to_string(),
            entry.counterparty.party_kind().as_str(),
            entry.counterparty.uuid().to_string(),
            entry.kind.as_str(),
            entry.amount.to_string(),
            entry.balance_after.to_string(),
            entry.reference_id.map(|id| id.to_string()),
            entry.description,
            entry.created_at.to_rfc3339(),
        ],
    )?;
    entry.sequence = conn.last_insert_rowid();
    Ok(())
}

/// Head of the ledger for one counterparty, if any entry exists.
pub fn latest_for(
    conn: &Connection,
    counterparty: CounterpartyId,
) -> StoreResult<Option<CounterpartyTxn>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM counterparty_txns
                 WHERE party_kind = ?1 AND counterparty_id = ?2
                 ORDER BY sequence DESC LIMIT 1"
            ),
            params![
                counterparty.party_kind().as_str(),
                counterparty.uuid().to_string()
            ],
            row_to_raw,
        )
        .optional()?;
    row.map(raw_to_txn).transpose()
}

/// Full history for one counterparty, oldest first.
pub fn list_for(
    conn: &Connection,
    counterparty: CounterpartyId,
    limit: Option<usize>,
) -> StoreResult<Vec<CounterpartyTxn>> {
    let mut sql = format!(
        "SELECT {COLUMNS} FROM counterparty_txns
         WHERE party_kind = ?1 AND counterparty_id = ?2
         ORDER BY sequence ASC"
    );
    if limit.is_some() {
        sql.push_str(" LIMIT ?3");
    }
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = if let Some(limit) = limit {
        stmt.query(params![
            counterparty.party_kind().as_str(),
            counterparty.uuid().to_string(),
            limit as i64
        ])?
    } else {
        stmt.query(params![
            counterparty.party_kind().as_str(),
            counterparty.uuid().to_string()
        ])?
    };
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
    String,
    String,
    String,
    Option<String>,
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

fn raw_to_txn(raw: RawRow) -> StoreResult<CounterpartyTxn> {
    let (
        sequence,
        entry_id,
        party_kind,
        counterparty_id,
        kind,
        amount,
        balance_after,
        reference_id,
        description,
        created_at,
    ) = raw;
    let party: PartyKind = parse_enum(&party_kind)?;
    let counterparty_uuid = parse_uuid(&counterparty_id)?;
    let counterparty = match party {
        PartyKind::Customer => CounterpartyId::Customer(CustomerId::from(counterparty_uuid)),
        PartyKind::Supplier => CounterpartyId::Supplier(SupplierId::from(counterparty_uuid)),
    };
    Ok(CounterpartyTxn {
        id: parse_uuid(&entry_id)?.into(),
        sequence,
        counterparty,
        kind: parse_enum(&kind)?,
        amount: parse_decimal(&amount)?,
        balance_after: parse_decimal(&balance_after)?,
        reference_id: reference_id.as_deref().map(parse_uuid).transpose()?,
        description,
        created_at: parse_datetime(&created_at)?,
    })
}
