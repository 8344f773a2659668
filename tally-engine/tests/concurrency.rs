use std::thread;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_core::{ExpenseKind, TxnKind};
use tally_engine::MovementRequest;
use tally_ledger::MainAccountQuery;
use tally_test_utils::TestEngine;

#[test]
fn concurrent_payments_chain_without_losing_entries() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    fx.engine
        .record_sale(customer.id, "INV-1", dec!(1000), None)
        .unwrap();

    let n = 8;
    let handles: Vec<_> = (0..n)
        .map(|_| {
            let engine = fx.engine.clone();
            let customer_id = customer.id;
            thread::spawn(move || {
                engine
                    .record_counterparty_txn(
                        customer_id.into(),
                        TxnKind::Payment,
                        dec!(10),
                        None,
                        None,
                    )
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let after = fx.engine.customer(customer.id).unwrap();
    assert_eq!(after.current_balance, dec!(920));
    assert_eq!(after.receivable, dec!(920));

    // All N entries are present and each chains off its predecessor.
    let ledger = fx
        .engine
        .counterparty_ledger(customer.id.into(), None)
        .unwrap();
    assert_eq!(ledger.len(), n + 1);
    let mut expected = Decimal::ZERO;
    for entry in &ledger {
        expected += match entry.kind {
            TxnKind::Sale => entry.amount,
            TxnKind::Payment => -entry.amount,
            other => panic!("unexpected kind {other}"),
        };
        assert_eq!(entry.balance_after, expected);
    }

    // Every payment also landed in the main account, chained.
    assert_eq!(fx.engine.main_balance().unwrap(), dec!(80));
    let report = fx
        .engine
        .main_account_report(Some(MainAccountQuery::default().ascending()))
        .unwrap();
    assert_eq!(report.transactions.len(), n);
    let mut running = Decimal::ZERO;
    for txn in &report.transactions {
        running += txn.direction.signed(txn.amount);
        assert_eq!(txn.balance_after, running);
    }
}

#[test]
fn mixed_writers_serialize_on_the_main_account() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    fx.engine
        .record_sale(customer.id, "INV-1", dec!(500), None)
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = fx.engine.clone();
        let customer_id = customer.id;
        handles.push(thread::spawn(move || {
            engine
                .record_counterparty_txn(customer_id.into(), TxnKind::Payment, dec!(20), None, None)
                .map(|_| ())
                .unwrap()
        }));
    }
    for _ in 0..4 {
        let engine = fx.engine.clone();
        handles.push(thread::spawn(move || {
            engine
                .record_expense(ExpenseKind::Expense, dec!(5), None)
                .map(|_| ())
                .unwrap()
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // 4 credits of 20 minus 4 debits of 5.
    assert_eq!(fx.engine.main_balance().unwrap(), dec!(60));
    let report = fx
        .engine
        .main_account_report(Some(MainAccountQuery::default().ascending()))
        .unwrap();
    assert_eq!(report.transactions.len(), 8);
    let mut running = Decimal::ZERO;
    for txn in &report.transactions {
        running += txn.direction.signed(txn.amount);
        assert_eq!(txn.balance_after, running);
    }
    assert_eq!(running, report.total_balance);
}

#[test]
fn concurrent_movements_keep_the_stock_invariant() {
    let fx = TestEngine::new();
    let product = fx.product("Beans", "SKU-1", dec!(5), dec!(9));

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let engine = fx.engine.clone();
            let product_id = product.id;
            thread::spawn(move || {
                engine
                    .record_stock_movement(MovementRequest::new(
                        product_id,
                        tally_core::MovementKind::Purchase,
                        dec!(5),
                        Decimal::from(4 + i),
                    ))
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let after = fx.engine.product(product.id).unwrap();
    assert_eq!(after.quantity, dec!(30));
    let movements = fx.engine.product_movements(product.id).unwrap();
    assert_eq!(movements.len(), 6);
    let mut running = Decimal::ZERO;
    for movement in &movements {
        running += movement.quantity;
        assert_eq!(movement.stock_after, running);
    }
    assert_eq!(running, after.quantity);
}
