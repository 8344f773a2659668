//! SQLite persistence for the Tally ledgers and aggregate rows.

mod codec;
pub mod counterparty;
mod error;
pub mod invoice;
pub mod main_account;
pub mod party;
pub mod product;
mod query;
pub mod stock;
mod store;

pub use error::{StoreError, StoreResult};
pub use query::MainAccountQuery;
pub use store::LedgerStore;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tally_core::{
        CounterpartyTxn, Customer, Direction, MainAccountTxn, MovementKind, Product, SourceKind,
        StockMovement, TxnKind,
    };
    use tempfile::tempdir;

    #[test]
    fn counterparty_appends_assign_monotonic_sequences() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::open(dir.path().join("tally.db")).unwrap();
        let customer = Customer::new("Acme Retail");
        let result: StoreResult<Vec<i64>> = store.with_write_tx(|tx| {
            party::insert_customer(tx, &customer)?;
            let mut sequences = Vec::new();
            for amount in [dec!(100), dec!(40)] {
                let mut entry =
                    CounterpartyTxn::new(customer.id.into(), TxnKind::Sale, amount);
                counterparty::append(tx, &mut entry)?;
                sequences.push(entry.sequence);
            }
            Ok(sequences)
        });
        let sequences = result.unwrap();
        assert!(sequences[0] < sequences[1]);

        let conn = store.reader().unwrap();
        let head = counterparty::latest_for(&conn, customer.id.into())
            .unwrap()
            .expect("head entry");
        assert_eq!(head.sequence, sequences[1]);
        assert_eq!(head.amount, dec!(40));
        let all = counterparty::list_for(&conn, customer.id.into(), None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn main_account_balance_row_round_trips() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::open(dir.path().join("tally.db")).unwrap();
        let result: StoreResult<()> = store.with_write_tx(|tx| {
            let mut entry = MainAccountTxn::new(Direction::Credit, SourceKind::Customer, dec!(60));
            entry.balance_after = dec!(60);
            main_account::append(tx, &mut entry)?;
            main_account::write_balance(tx, dec!(60))?;
            Ok(())
        });
        result.unwrap();

        let conn = store.reader().unwrap();
        assert_eq!(main_account::read_balance(&conn).unwrap(), dec!(60));
        let head = main_account::latest(&conn).unwrap().expect("head entry");
        assert_eq!(head.balance_after, dec!(60));
        assert_eq!(head.direction, Direction::Credit);
        assert_eq!(head.source, SourceKind::Customer);
    }

    #[test]
    fn main_account_query_filters_and_orders() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::open(dir.path().join("tally.db")).unwrap();
        let result: StoreResult<()> = store.with_write_tx(|tx| {
            for (direction, source, amount) in [
                (Direction::Credit, SourceKind::Customer, dec!(10)),
                (Direction::Debit, SourceKind::Expense, dec!(3)),
                (Direction::Credit, SourceKind::Customer, dec!(7)),
            ] {
                let mut entry = MainAccountTxn::new(direction, source, amount);
                main_account::append(tx, &mut entry)?;
            }
            Ok(())
        });
        result.unwrap();

        let conn = store.reader().unwrap();
        let credits = main_account::query(
            &conn,
            &MainAccountQuery::default().with_direction(Direction::Credit),
        )
        .unwrap();
        assert_eq!(credits.len(), 2);
        // Default ordering is newest first.
        assert_eq!(credits[0].amount, dec!(7));
        let limited = main_account::query(
            &conn,
            &MainAccountQuery::default().ascending().with_limit(1),
        )
        .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].amount, dec!(10));
    }

    #[test]
    fn stock_movements_chain_per_product() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::open(dir.path().join("tally.db")).unwrap();
        let item = Product::new("Beans", "SKU-1");
        let result: StoreResult<()> = store.with_write_tx(|tx| {
            product::insert(tx, &item)?;
            let mut movement = StockMovement::new(item.id, MovementKind::Purchase, dec!(10));
            movement.stock_after = dec!(10);
            stock::append(tx, &mut movement)?;
            Ok(())
        });
        result.unwrap();

        let conn = store.reader().unwrap();
        let head = stock::latest_for(&conn, item.id).unwrap().expect("movement");
        assert_eq!(head.stock_after, dec!(10));
        assert_eq!(stock::count_for(&conn, item.id).unwrap(), 1);
        assert_eq!(stock::list_for(&conn, item.id).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_sku_is_a_constraint_violation() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::open(dir.path().join("tally.db")).unwrap();
        let first = Product::new("Beans", "SKU-1");
        let second = Product::new("Grounds", "SKU-1");
        let result: StoreResult<()> = store.with_write_tx(|tx| {
            product::insert(tx, &first)?;
            product::insert(tx, &second)?;
            Ok(())
        });
        assert!(matches!(result, Err(StoreError::Constraint(_))));
    }
}
