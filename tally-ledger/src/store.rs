use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{StoreError, StoreResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    phone TEXT,
    opening_balance TEXT NOT NULL,
    current_balance TEXT NOT NULL,
    receivable TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS suppliers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    phone TEXT,
    opening_balance TEXT NOT NULL,
    current_balance TEXT NOT NULL,
    debt TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    sku TEXT NOT NULL UNIQUE,
    quantity TEXT NOT NULL,
    cost TEXT NOT NULL,
    price TEXT NOT NULL,
    avg_price TEXT NOT NULL,
    previous_cost TEXT NOT NULL,
    previous_price TEXT NOT NULL,
    previous_avg_price TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS sales (
    id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL REFERENCES customers(id),
    invoice_no TEXT NOT NULL UNIQUE,
    total TEXT NOT NULL,
    paid TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS purchases (
    id TEXT PRIMARY KEY,
    supplier_id TEXT NOT NULL REFERENCES suppliers(id),
    invoice_no TEXT NOT NULL UNIQUE,
    total TEXT NOT NULL,
    paid TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS sale_items (
    id TEXT PRIMARY KEY,
    sale_id TEXT NOT NULL REFERENCES sales(id),
    product_id TEXT NOT NULL REFERENCES products(id),
    quantity TEXT NOT NULL,
    unit_price TEXT NOT NULL,
    total TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS purchase_items (
    id TEXT PRIMARY KEY,
    purchase_id TEXT NOT NULL REFERENCES purchases(id),
    product_id TEXT NOT NULL REFERENCES products(id),
    quantity TEXT NOT NULL,
    unit_price TEXT NOT NULL,
    total TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS counterparty_txns (
    sequence INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id TEXT NOT NULL UNIQUE,
    party_kind TEXT NOT NULL,
    counterparty_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    amount TEXT NOT NULL,
    balance_after TEXT NOT NULL,
    reference_id TEXT,
    description TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS counterparty_txns_idx_party
    ON counterparty_txns(party_kind, counterparty_id, sequence);
CREATE TABLE IF NOT EXISTS main_account_txns (
    sequence INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id TEXT NOT NULL UNIQUE,
    direction TEXT NOT NULL,
    source TEXT NOT NULL,
    source_id TEXT,
    reference_id TEXT,
    amount TEXT NOT NULL,
    balance_after TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS main_account_txns_idx_created
    ON main_account_txns(created_at);
CREATE TABLE IF NOT EXISTS stock_movements (
    sequence INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id TEXT NOT NULL UNIQUE,
    product_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    quantity TEXT NOT NULL,
    stock_after TEXT NOT NULL,
    unit_price TEXT NOT NULL,
    cost_price TEXT NOT NULL,
    sell_price TEXT NOT NULL,
    avg_price TEXT NOT NULL,
    previous_cost TEXT NOT NULL,
    previous_price TEXT NOT NULL,
    previous_avg_price TEXT NOT NULL,
    counterparty_id TEXT,
    invoice_ref TEXT,
    total_amount TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS stock_movements_idx_product
    ON stock_movements(product_id, sequence);
CREATE INDEX IF NOT EXISTS stock_movements_idx_invoice
    ON stock_movements(invoice_ref);
CREATE TABLE IF NOT EXISTS main_account (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    balance TEXT NOT NULL
);
INSERT OR IGNORE INTO main_account (id, balance) VALUES (1, '0');
"#;

/// SQLite-backed store holding the three ledgers and the aggregate rows.
///
/// Connections are opened per call; writers funnel through
/// [`LedgerStore::with_write_tx`] so that one business event maps onto one
/// SQL transaction.
#[derive(Clone, Debug)]
pub struct LedgerStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl LedgerStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open_with_timeout(path, Duration::from_secs(5))
    }

    pub fn open_with_timeout(path: impl Into<PathBuf>, busy_timeout: Duration) -> StoreResult<Self> {
        let store = Self {
            path: path.into(),
            busy_timeout,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn connect(&self) -> StoreResult<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Open a read-only-by-convention connection for queries outside any
    /// atomic unit.
    pub fn reader(&self) -> StoreResult<Connection> {
        self.connect()
    }

    /// Run `f` inside one immediate transaction; commit on `Ok`, roll back
    /// on any error. Every write of one business event goes through here.
    pub fn with_write_tx<T, E>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.connect().map_err(E::from)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| E::from(StoreError::from(err)))?;
        let value = f(&tx)?;
        tx.commit().map_err(|err| E::from(StoreError::from(err)))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn schema_is_idempotent_and_seeds_main_account() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tally.db");
        LedgerStore::open(&path).unwrap();
        // Re-opening must not fail or reset the singleton row.
        let store = LedgerStore::open(&path).unwrap();
        let conn = store.reader().unwrap();
        let balance: String = conn
            .query_row("SELECT balance FROM main_account WHERE id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(balance, "0");
    }

    #[test]
    fn write_tx_rolls_back_on_error() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::open(dir.path().join("tally.db")).unwrap();
        let result: Result<(), StoreError> = store.with_write_tx(|tx| {
            tx.execute(
                "UPDATE main_account SET balance = '42' WHERE id = 1",
                [],
            )?;
            Err(StoreError::Storage("injected".into()))
        });
        assert!(result.is_err());
        let conn = store.reader().unwrap();
        let balance: String = conn
            .query_row("SELECT balance FROM main_account WHERE id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(balance, "0");
    }
}
