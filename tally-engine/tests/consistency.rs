use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_core::{InvoiceStatus, MovementKind, TxnKind};
use tally_engine::{
    resolver, EngineError, MainAccountReport, MovementRequest, RevaluationRequest,
};
use tally_ledger::MainAccountQuery;
use tally_test_utils::TestEngine;

fn full_main_ledger(fx: &TestEngine) -> MainAccountReport {
    fx.engine
        .main_account_report(Some(MainAccountQuery::default().ascending()))
        .unwrap()
}

#[test]
fn sale_then_payment_keeps_every_ledger_consistent() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");

    let (sale, entry) = fx
        .engine
        .record_sale(customer.id, "INV-1", dec!(100), None)
        .unwrap();
    assert_eq!(entry.balance_after, dec!(100));
    let after_sale = fx.engine.customer(customer.id).unwrap();
    assert_eq!(after_sale.current_balance, dec!(100));
    assert_eq!(after_sale.receivable, dec!(100));
    // Cash has not moved at sale creation.
    assert_eq!(fx.engine.main_balance().unwrap(), Decimal::ZERO);

    let payment = fx
        .engine
        .record_counterparty_txn(
            customer.id.into(),
            TxnKind::Payment,
            dec!(60),
            Some(sale.id.into()),
            None,
        )
        .unwrap();
    assert_eq!(payment.balance_after, dec!(40));

    let after_payment = fx.engine.customer(customer.id).unwrap();
    assert_eq!(after_payment.current_balance, dec!(40));
    assert_eq!(after_payment.receivable, dec!(40));
    assert_eq!(fx.engine.main_balance().unwrap(), dec!(60));

    // The payment settles into the referenced header.
    let conn = fx.engine.store().reader().unwrap();
    let header = tally_ledger::invoice::find_sale(&conn, sale.id)
        .unwrap()
        .unwrap();
    assert_eq!(header.paid, dec!(60));
    assert_eq!(header.status, InvoiceStatus::Open);

    // Aggregate balance equals the ledger head.
    let ledger = fx
        .engine
        .counterparty_ledger(customer.id.into(), None)
        .unwrap();
    assert_eq!(
        ledger.last().unwrap().balance_after,
        after_payment.current_balance
    );

    // Main-account balance equals both the head entry and the signed sum.
    let report = full_main_ledger(&fx);
    let head = report.transactions.last().unwrap();
    assert_eq!(head.balance_after, report.total_balance);
    let signed_sum: Decimal = report
        .transactions
        .iter()
        .map(|txn| txn.direction.signed(txn.amount))
        .sum();
    assert_eq!(signed_sum, report.total_balance);
}

#[test]
fn payment_covering_the_total_marks_the_header_paid() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    let (sale, _) = fx
        .engine
        .record_sale(customer.id, "INV-1", dec!(100), None)
        .unwrap();
    fx.engine
        .record_counterparty_txn(
            customer.id.into(),
            TxnKind::Payment,
            dec!(100),
            Some(sale.id.into()),
            None,
        )
        .unwrap();
    let conn = fx.engine.store().reader().unwrap();
    let header = tally_ledger::invoice::find_sale(&conn, sale.id)
        .unwrap()
        .unwrap();
    assert_eq!(header.status, InvoiceStatus::Paid);
}

#[test]
fn customer_refund_and_adjustment_mirror_into_main_account() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    fx.engine
        .record_sale(customer.id, "INV-1", dec!(100), None)
        .unwrap();
    fx.engine
        .record_counterparty_txn(customer.id.into(), TxnKind::Payment, dec!(100), None, None)
        .unwrap();
    fx.engine
        .record_counterparty_txn(customer.id.into(), TxnKind::Refund, dec!(30), None, None)
        .unwrap();

    let after = fx.engine.customer(customer.id).unwrap();
    assert_eq!(after.current_balance, dec!(-30));
    assert_eq!(after.receivable, dec!(-30));
    // +100 payment credit, -30 refund debit.
    assert_eq!(fx.engine.main_balance().unwrap(), dec!(70));

    let report = full_main_ledger(&fx);
    let refund = report.transactions.last().unwrap();
    assert_eq!(refund.source, tally_core::SourceKind::CustomerRefund);
    assert_eq!(refund.direction, tally_core::Direction::Debit);
}

#[test]
fn supplier_debt_floors_at_zero() {
    let fx = TestEngine::new();
    let supplier = fx.supplier("Bean Co");
    fx.engine
        .record_purchase(supplier.id, "PO-1", dec!(200), None)
        .unwrap();
    let after_purchase = fx.engine.supplier(supplier.id).unwrap();
    assert_eq!(after_purchase.current_balance, dec!(-200));
    assert_eq!(after_purchase.debt, dec!(200));

    fx.engine
        .record_counterparty_txn(supplier.id.into(), TxnKind::Payment, dec!(50), None, None)
        .unwrap();
    let after_first = fx.engine.supplier(supplier.id).unwrap();
    assert_eq!(after_first.current_balance, dec!(-150));
    assert_eq!(after_first.debt, dec!(150));

    fx.engine
        .record_counterparty_txn(supplier.id.into(), TxnKind::Payment, dec!(300), None, None)
        .unwrap();
    let after_second = fx.engine.supplier(supplier.id).unwrap();
    assert_eq!(after_second.current_balance, dec!(150));
    assert_eq!(after_second.debt, Decimal::ZERO);

    // Two supplier payments spent cash.
    assert_eq!(fx.engine.main_balance().unwrap(), dec!(-350));
}

#[test]
fn weighted_average_cost_blends_across_purchases() {
    let fx = TestEngine::new();
    let product = fx.product("Beans", "SKU-1", dec!(0), dec!(0));

    fx.engine
        .record_stock_movement(MovementRequest::new(
            product.id,
            MovementKind::Purchase,
            dec!(10),
            dec!(5),
        ))
        .unwrap();
    let after_first = fx.engine.product(product.id).unwrap();
    assert_eq!(after_first.quantity, dec!(10));
    assert_eq!(after_first.avg_price, dec!(5));
    assert_eq!(after_first.cost, dec!(5));

    fx.engine
        .record_stock_movement(MovementRequest::new(
            product.id,
            MovementKind::Purchase,
            dec!(10),
            dec!(7),
        ))
        .unwrap();
    let after_second = fx.engine.product(product.id).unwrap();
    assert_eq!(after_second.quantity, dec!(20));
    assert_eq!(after_second.avg_price, dec!(6));
    assert_eq!(after_second.cost, dec!(7));
    assert_eq!(after_second.previous_cost, dec!(5));
    assert_eq!(after_second.previous_avg_price, dec!(5));
}

#[test]
fn sale_item_moves_stock_and_delete_restores_it() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    let product = fx.product("Beans", "SKU-1", dec!(5), dec!(9));
    fx.engine
        .record_stock_movement(MovementRequest::new(
            product.id,
            MovementKind::Purchase,
            dec!(10),
            dec!(5),
        ))
        .unwrap();
    let (sale, _) = fx
        .engine
        .record_sale(customer.id, "INV-1", dec!(27), None)
        .unwrap();

    let item = fx
        .engine
        .add_sale_item(sale.id, product.id, dec!(3), None)
        .unwrap();
    assert_eq!(item.total, dec!(27));
    assert_eq!(fx.engine.product(product.id).unwrap().quantity, dec!(7));

    fx.engine.delete_sale_item(item.id).unwrap();
    let restored = fx.engine.product(product.id).unwrap();
    assert_eq!(restored.quantity, dec!(10));

    // Stock invariant: quantity equals the movement head and the signed sum.
    let movements = fx.engine.product_movements(product.id).unwrap();
    assert_eq!(movements.last().unwrap().stock_after, restored.quantity);
    let signed_sum: Decimal = movements.iter().map(|movement| movement.quantity).sum();
    assert_eq!(signed_sum, restored.quantity);
}

#[test]
fn sale_item_update_applies_the_delta_in_one_step() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    let product = fx.product("Beans", "SKU-1", dec!(5), dec!(9));
    fx.engine
        .record_stock_movement(MovementRequest::new(
            product.id,
            MovementKind::Purchase,
            dec!(10),
            dec!(5),
        ))
        .unwrap();
    let (sale, _) = fx
        .engine
        .record_sale(customer.id, "INV-1", dec!(27), None)
        .unwrap();
    let item = fx
        .engine
        .add_sale_item(sale.id, product.id, dec!(3), None)
        .unwrap();

    fx.engine
        .update_sale_item(item.id, None, dec!(5), None)
        .unwrap();
    assert_eq!(fx.engine.product(product.id).unwrap().quantity, dec!(5));

    // One compensating adjustment documents the correction.
    let movements = fx.engine.product_movements(product.id).unwrap();
    let correction = movements.last().unwrap();
    assert_eq!(correction.kind, MovementKind::Adjustment);
    assert_eq!(correction.quantity, dec!(-2));
}

#[test]
fn sale_item_update_across_products_undoes_and_reapplies() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    let beans = fx.product("Beans", "SKU-1", dec!(5), dec!(9));
    let grounds = fx.product("Grounds", "SKU-2", dec!(4), dec!(8));
    for product in [&beans, &grounds] {
        fx.engine
            .record_stock_movement(MovementRequest::new(
                product.id,
                MovementKind::Purchase,
                dec!(10),
                dec!(5),
            ))
            .unwrap();
    }
    let (sale, _) = fx
        .engine
        .record_sale(customer.id, "INV-1", dec!(27), None)
        .unwrap();
    let item = fx
        .engine
        .add_sale_item(sale.id, beans.id, dec!(3), None)
        .unwrap();

    fx.engine
        .update_sale_item(item.id, Some(grounds.id), dec!(4), None)
        .unwrap();
    assert_eq!(fx.engine.product(beans.id).unwrap().quantity, dec!(10));
    assert_eq!(fx.engine.product(grounds.id).unwrap().quantity, dec!(6));
}

#[test]
fn purchase_item_add_and_delete_round_trip_stock() {
    let fx = TestEngine::new();
    let supplier = fx.supplier("Bean Co");
    let product = fx.product("Beans", "SKU-1", dec!(0), dec!(0));
    let (purchase, _) = fx
        .engine
        .record_purchase(supplier.id, "PO-1", dec!(50), None)
        .unwrap();

    let item = fx
        .engine
        .add_purchase_item(purchase.id, product.id, dec!(10), dec!(5))
        .unwrap();
    let stocked = fx.engine.product(product.id).unwrap();
    assert_eq!(stocked.quantity, dec!(10));
    assert_eq!(stocked.avg_price, dec!(5));

    fx.engine.delete_purchase_item(item.id).unwrap();
    assert_eq!(fx.engine.product(product.id).unwrap().quantity, Decimal::ZERO);
}

#[test]
fn selling_more_than_stock_is_rejected() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    let product = fx.product("Beans", "SKU-1", dec!(5), dec!(9));
    fx.engine
        .record_stock_movement(MovementRequest::new(
            product.id,
            MovementKind::Purchase,
            dec!(2),
            dec!(5),
        ))
        .unwrap();
    let (sale, _) = fx
        .engine
        .record_sale(customer.id, "INV-1", dec!(27), None)
        .unwrap();
    let err = fx
        .engine
        .add_sale_item(sale.id, product.id, dec!(3), None)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));
    // Nothing was applied.
    assert_eq!(fx.engine.product(product.id).unwrap().quantity, dec!(2));
}

#[test]
fn expense_entries_move_only_the_main_account() {
    let fx = TestEngine::new();
    fx.engine
        .record_expense(tally_core::ExpenseKind::Expense, dec!(25), Some("rent".into()))
        .unwrap();
    fx.engine
        .record_expense(tally_core::ExpenseKind::Adjustment, dec!(5), None)
        .unwrap();
    assert_eq!(fx.engine.main_balance().unwrap(), dec!(-20));

    let report = full_main_ledger(&fx);
    assert_eq!(report.transactions.len(), 2);
    assert!(report
        .transactions
        .iter()
        .all(|txn| txn.source == tally_core::SourceKind::Expense));
}

#[test]
fn revaluation_requires_a_kind_only_when_values_change() {
    let fx = TestEngine::new();
    let product = fx.product("Beans", "SKU-1", dec!(5), dec!(9));

    // No-op edit: nothing written, no kind needed.
    let unchanged = fx
        .engine
        .revalue_product(
            product.id,
            RevaluationRequest {
                new_price: Some(dec!(9)),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(unchanged.is_none());

    // Value change without a kind is rejected.
    let err = fx
        .engine
        .revalue_product(
            product.id,
            RevaluationRequest {
                new_price: Some(dec!(11)),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));

    // With a kind the edit is ledgered and snapshots shift.
    let movement = fx
        .engine
        .revalue_product(
            product.id,
            RevaluationRequest {
                new_price: Some(dec!(11)),
                new_quantity: Some(dec!(4)),
                kind: Some(MovementKind::Adjustment),
                ..Default::default()
            },
        )
        .unwrap()
        .expect("movement recorded");
    assert_eq!(movement.quantity, dec!(4));
    assert_eq!(movement.stock_after, dec!(4));
    let after = fx.engine.product(product.id).unwrap();
    assert_eq!(after.price, dec!(11));
    assert_eq!(after.previous_price, dec!(9));
    assert_eq!(after.quantity, dec!(4));
}

#[test]
fn resolver_reads_are_idempotent() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    fx.engine
        .record_sale(customer.id, "INV-1", dec!(100), None)
        .unwrap();

    let conn = fx.engine.store().reader().unwrap();
    let first = resolver::resolve_counterparty(&conn, customer.id.into()).unwrap();
    let second = resolver::resolve_counterparty(&conn, customer.id.into()).unwrap();
    assert_eq!(first, second);

    let main_first = resolver::resolve_main(&conn).unwrap();
    let main_second = resolver::resolve_main(&conn).unwrap();
    assert_eq!(main_first, main_second);
}

#[test]
fn validation_errors_precede_any_write() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    let supplier = fx.supplier("Bean Co");

    // Wrong side.
    let err = fx
        .engine
        .record_counterparty_txn(supplier.id.into(), TxnKind::Sale, dec!(10), None, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));

    // Too many decimal places.
    let err = fx
        .engine
        .record_counterparty_txn(customer.id.into(), TxnKind::Payment, dec!(10.005), None, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));

    // Dangling reference.
    let err = fx
        .engine
        .record_counterparty_txn(
            customer.id.into(),
            TxnKind::Payment,
            dec!(10),
            Some(uuid::Uuid::new_v4()),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    // No entry was written by any of the rejected calls.
    let ledger = fx
        .engine
        .counterparty_ledger(customer.id.into(), None)
        .unwrap();
    assert!(ledger.is_empty());
    assert_eq!(fx.engine.main_balance().unwrap(), Decimal::ZERO);
}

#[test]
fn duplicate_invoice_aborts_the_whole_unit() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    fx.engine
        .record_sale(customer.id, "INV-1", dec!(100), None)
        .unwrap();

    let err = fx
        .engine
        .record_sale(customer.id, "INV-1", dec!(40), None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // Neither the header nor the ledger entry of the failed sale survives.
    let after = fx.engine.customer(customer.id).unwrap();
    assert_eq!(after.current_balance, dec!(100));
    let ledger = fx
        .engine
        .counterparty_ledger(customer.id.into(), None)
        .unwrap();
    assert_eq!(ledger.len(), 1);
}

#[test]
fn failure_after_the_ledger_write_leaves_nothing_applied() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    fx.engine
        .record_sale(customer.id, "INV-1", dec!(100), None)
        .unwrap();

    // Replay the orchestrator's write steps and fail after both the entry
    // append and the aggregate update, before the unit commits.
    let result: Result<(), EngineError> = fx.engine.store().with_write_tx(|tx| {
        let mut entry = tally_core::CounterpartyTxn::new(
            customer.id.into(),
            TxnKind::Payment,
            dec!(60),
        );
        entry.balance_after = dec!(40);
        tally_ledger::counterparty::append(tx, &mut entry)?;
        tally_ledger::party::update_customer_position(tx, customer.id, dec!(40), dec!(40))?;
        Err(EngineError::Internal("injected failure".into()))
    });
    assert!(result.is_err());

    // Neither the entry nor the aggregate mutation is visible.
    let ledger = fx
        .engine
        .counterparty_ledger(customer.id.into(), None)
        .unwrap();
    assert_eq!(ledger.len(), 1);
    let after = fx.engine.customer(customer.id).unwrap();
    assert_eq!(after.current_balance, dec!(100));
    assert_eq!(after.receivable, dec!(100));
}

#[test]
fn a_stale_head_surfaces_as_conflict() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    fx.engine
        .record_sale(customer.id, "INV-1", dec!(100), None)
        .unwrap();

    let conn = fx.engine.store().reader().unwrap();
    // A writer that resolved before the sale existed must not chain off it.
    let err = resolver::check_counterparty_head(&conn, customer.id.into(), None).unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[test]
fn product_with_history_cannot_be_deleted() {
    let fx = TestEngine::new();
    let product = fx.product("Beans", "SKU-1", dec!(5), dec!(9));
    fx.engine
        .record_stock_movement(MovementRequest::new(
            product.id,
            MovementKind::Purchase,
            dec!(1),
            dec!(5),
        ))
        .unwrap();
    let err = fx.engine.delete_product(product.id).unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let fresh = fx.product("Grounds", "SKU-2", dec!(4), dec!(8));
    fx.engine.delete_product(fresh.id).unwrap();
    assert!(matches!(
        fx.engine.product(fresh.id),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn duplicate_sku_is_a_conflict() {
    let fx = TestEngine::new();
    fx.product("Beans", "SKU-1", dec!(5), dec!(9));
    let err = fx
        .engine
        .create_product("Other Beans", "SKU-1", dec!(5), dec!(9))
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}
