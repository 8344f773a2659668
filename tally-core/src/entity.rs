use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{CustomerId, ProductId, PurchaseId, SaleId, SupplierId};

/// Customer aggregate row. `current_balance` and `receivable` always mirror
/// the latest ledger entry for this customer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone: Option<String>,
    pub opening_balance: Decimal,
    pub current_balance: Decimal,
    pub receivable: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CustomerId::new(),
            name: name.into(),
            phone: None,
            opening_balance: Decimal::ZERO,
            current_balance: Decimal::ZERO,
            receivable: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }

    pub fn with_opening_balance(mut self, balance: Decimal) -> Self {
        self.opening_balance = balance;
        self.current_balance = balance;
        self
    }
}

/// Supplier aggregate row. `debt` tracks purchase-only liability, floored at
/// zero; it moves with the balance but is not identical to it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub phone: Option<String>,
    pub opening_balance: Decimal,
    pub current_balance: Decimal,
    pub debt: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Supplier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SupplierId::new(),
            name: name.into(),
            phone: None,
            opening_balance: Decimal::ZERO,
            current_balance: Decimal::ZERO,
            debt: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }
}

/// Product aggregate row. `quantity` always equals the latest
/// `StockMovement::stock_after` for this product.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub quantity: Decimal,
    pub cost: Decimal,
    pub price: Decimal,
    pub avg_price: Decimal,
    pub previous_cost: Decimal,
    pub previous_price: Decimal,
    pub previous_avg_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, sku: impl Into<String>) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            sku: sku.into(),
            quantity: Decimal::ZERO,
            cost: Decimal::ZERO,
            price: Decimal::ZERO,
            avg_price: Decimal::ZERO,
            previous_cost: Decimal::ZERO,
            previous_price: Decimal::ZERO,
            previous_avg_price: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }

    pub fn with_prices(mut self, cost: Decimal, price: Decimal) -> Self {
        self.cost = cost;
        self.price = price;
        self.avg_price = cost;
        self
    }
}

/// Lifecycle of a sale/purchase header.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Open,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Open => "open",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(InvoiceStatus::Open),
            "paid" => Ok(InvoiceStatus::Paid),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(format!("unknown invoice status: {other}")),
        }
    }
}

/// Sale header; the originating ledger entry references it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub customer_id: CustomerId,
    pub invoice_no: String,
    pub total: Decimal,
    pub paid: Decimal,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    pub fn new(customer_id: CustomerId, invoice_no: impl Into<String>, total: Decimal) -> Self {
        Self {
            id: SaleId::new(),
            customer_id,
            invoice_no: invoice_no.into(),
            total,
            paid: Decimal::ZERO,
            status: InvoiceStatus::Open,
            created_at: Utc::now(),
        }
    }
}

/// Purchase header; mirror of [`Sale`] on the supplier side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub supplier_id: SupplierId,
    pub invoice_no: String,
    pub total: Decimal,
    pub paid: Decimal,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    pub fn new(supplier_id: SupplierId, invoice_no: impl Into<String>, total: Decimal) -> Self {
        Self {
            id: PurchaseId::new(),
            supplier_id,
            invoice_no: invoice_no.into(),
            total,
            paid: Decimal::ZERO,
            status: InvoiceStatus::Open,
            created_at: Utc::now(),
        }
    }
}

/// Line item on a sale header.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    pub fn new(
        sale_id: SaleId,
        product_id: ProductId,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sale_id,
            product_id,
            quantity,
            unit_price,
            total: quantity * unit_price,
            created_at: Utc::now(),
        }
    }
}

/// Line item on a purchase header.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub id: Uuid,
    pub purchase_id: PurchaseId,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl PurchaseItem {
    pub fn new(
        purchase_id: PurchaseId,
        product_id: ProductId,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            purchase_id,
            product_id,
            quantity,
            unit_price,
            total: quantity * unit_price,
            created_at: Utc::now(),
        }
    }
}
