//! Shared fixtures for Tally integration tests.

use rust_decimal::Decimal;
use tally_core::{Customer, Product, Supplier};
use tally_engine::Engine;
use tally_ledger::LedgerStore;
use tempfile::TempDir;

/// An engine backed by a throwaway on-disk store. The temp directory lives
/// as long as the fixture.
pub struct TestEngine {
    pub engine: Engine,
    _dir: TempDir,
}

impl TestEngine {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = LedgerStore::open(dir.path().join("tally.db")).expect("open store");
        Self {
            engine: Engine::new(store),
            _dir: dir,
        }
    }

    /// Seed a customer with zero opening balance.
    pub fn customer(&self, name: &str) -> Customer {
        self.engine
            .create_customer(name, None, None)
            .expect("create customer")
    }

    /// Seed a supplier.
    pub fn supplier(&self, name: &str) -> Supplier {
        self.engine
            .create_supplier(name, None)
            .expect("create supplier")
    }

    /// Seed a product with the given cost/price and zero stock.
    pub fn product(&self, name: &str, sku: &str, cost: Decimal, price: Decimal) -> Product {
        self.engine
            .create_product(name, sku, cost, price)
            .expect("create product")
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}
