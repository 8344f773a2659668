use rust_decimal_macros::dec;
use serde_json::Value;
use tally_cli::app::{execute, Command, CustomerCmd, ProductCmd};
use tally_core::TxnKind;
use tally_test_utils::TestEngine;

fn data(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

#[test]
fn customer_transaction_round_trips_through_the_envelope() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    fx.engine
        .record_sale(customer.id, "INV-1", dec!(100), None)
        .unwrap();

    let envelope = execute(
        &fx.engine,
        Command::Customer(CustomerCmd::Txn {
            id: customer.id.to_string(),
            kind: "payment".into(),
            amount: "60".into(),
            reference: None,
            description: None,
        }),
    );
    assert_eq!(envelope.status, 201);
    assert!(envelope.error.is_none());
    let body = envelope.data.expect("created entry");
    assert_eq!(data(&body, "kind"), "payment");
    assert_eq!(data(&body, "balance_after"), "40");
}

#[test]
fn invalid_kind_maps_to_a_400_envelope() {
    let fx = TestEngine::new();
    let supplier = fx.supplier("Bean Co");

    let envelope = execute(
        &fx.engine,
        Command::Supplier(tally_cli::app::SupplierCmd::Txn {
            id: supplier.id.to_string(),
            kind: TxnKind::Sale.as_str().into(),
            amount: "10".into(),
            reference: None,
            description: None,
        }),
    );
    assert_eq!(envelope.status, 400);
    let error = envelope.error.expect("error body");
    assert_eq!(error.code, "invalid_argument");
    assert!(envelope.data.is_none());
}

#[test]
fn unknown_customer_maps_to_a_404_envelope() {
    let fx = TestEngine::new();
    let envelope = execute(
        &fx.engine,
        Command::Customer(CustomerCmd::Show {
            id: uuid::Uuid::new_v4().to_string(),
        }),
    );
    assert_eq!(envelope.status, 404);
    assert_eq!(envelope.error.expect("error body").code, "not_found");
}

#[test]
fn report_defaults_to_the_current_month() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    fx.engine
        .record_sale(customer.id, "INV-1", dec!(100), None)
        .unwrap();
    fx.engine
        .record_counterparty_txn(customer.id.into(), TxnKind::Payment, dec!(60), None, None)
        .unwrap();

    let envelope = execute(
        &fx.engine,
        Command::Report {
            start: None,
            end: None,
            limit: None,
            ascending: false,
        },
    );
    assert_eq!(envelope.status, 200);
    let body = envelope.data.expect("report");
    assert_eq!(data(&body, "total_balance"), "60");
    let transactions = body
        .get("transactions")
        .and_then(Value::as_array)
        .expect("transactions array");
    assert_eq!(transactions.len(), 1);
}

#[test]
fn export_writes_a_csv_file() {
    let fx = TestEngine::new();
    let customer = fx.customer("Acme Retail");
    fx.engine
        .record_sale(customer.id, "INV-1", dec!(100), None)
        .unwrap();
    fx.engine
        .record_counterparty_txn(customer.id.into(), TxnKind::Payment, dec!(60), None, None)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("main-account.csv");
    let envelope = execute(
        &fx.engine,
        Command::Export {
            out: out.clone(),
            start: None,
            end: None,
            limit: None,
        },
    );
    assert_eq!(envelope.status, 200);
    let raw = std::fs::read_to_string(&out).unwrap();
    assert!(raw.lines().count() >= 2);
    assert!(raw.contains("credit"));
}

#[test]
fn product_lifecycle_through_commands() {
    let fx = TestEngine::new();
    let envelope = execute(
        &fx.engine,
        Command::Product(ProductCmd::Add {
            name: "Beans".into(),
            sku: "SKU-1".into(),
            cost: "5".into(),
            price: "9".into(),
        }),
    );
    assert_eq!(envelope.status, 201);
    let id = data(&envelope.data.expect("product"), "id");

    let envelope = execute(
        &fx.engine,
        Command::Stock {
            product: id.clone(),
            kind: "purchase".into(),
            quantity: "10".into(),
            unit_price: "5".into(),
            outbound: false,
            description: None,
        },
    );
    assert_eq!(envelope.status, 201);

    // History now blocks deletion.
    let envelope = execute(&fx.engine, Command::Product(ProductCmd::Delete { id }));
    assert_eq!(envelope.status, 409);
    assert_eq!(envelope.error.expect("error body").code, "conflict");
}
