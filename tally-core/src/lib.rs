//! Core records and primitives shared by the Tally ledger engine.

mod entity;
mod envelope;
mod ids;
mod main_account;
mod money;
mod stock;
mod txn;

pub use entity::{
    Customer, InvoiceStatus, Product, Purchase, PurchaseItem, Sale, SaleItem, Supplier,
};
pub use envelope::{ErrorBody, ResponseEnvelope};
pub use ids::{CustomerId, EntryId, ProductId, PurchaseId, SaleId, SupplierId};
pub use main_account::{Direction, ExpenseKind, MainAccountTxn, SourceKind};
pub use money::{validate_amount, validate_quantity, AmountError, MONEY_SCALE};
pub use stock::{MovementKind, StockMovement};
pub use txn::{CounterpartyId, CounterpartyTxn, PartyKind, TxnKind};
