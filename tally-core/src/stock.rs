use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{EntryId, ProductId};

/// Enumerates the stock movement categories.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Sale,
    Purchase,
    Refund,
    Adjustment,
    Miscellaneous,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Sale => "sale",
            MovementKind::Purchase => "purchase",
            MovementKind::Refund => "refund",
            MovementKind::Adjustment => "adjustment",
            MovementKind::Miscellaneous => "miscellaneous",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(MovementKind::Sale),
            "purchase" => Ok(MovementKind::Purchase),
            "refund" => Ok(MovementKind::Refund),
            "adjustment" => Ok(MovementKind::Adjustment),
            "miscellaneous" => Ok(MovementKind::Miscellaneous),
            other => Err(format!("unknown movement kind: {other}")),
        }
    }
}

/// Immutable record of one product quantity change and the price snapshot
/// taken alongside it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: EntryId,
    pub sequence: i64,
    pub product_id: ProductId,
    pub kind: MovementKind,
    /// Signed delta applied to the product quantity.
    pub quantity: Decimal,
    pub stock_after: Decimal,
    pub unit_price: Decimal,
    pub cost_price: Decimal,
    pub sell_price: Decimal,
    pub avg_price: Decimal,
    pub previous_cost: Decimal,
    pub previous_price: Decimal,
    pub previous_avg_price: Decimal,
    /// Denormalized for reporting.
    pub counterparty_id: Option<Uuid>,
    pub invoice_ref: Option<String>,
    pub total_amount: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn new(product_id: ProductId, kind: MovementKind, quantity: Decimal) -> Self {
        Self {
            id: EntryId::new(),
            sequence: 0,
            product_id,
            kind,
            quantity,
            stock_after: Decimal::ZERO,
            unit_price: Decimal::ZERO,
            cost_price: Decimal::ZERO,
            sell_price: Decimal::ZERO,
            avg_price: Decimal::ZERO,
            previous_cost: Decimal::ZERO,
            previous_price: Decimal::ZERO,
            previous_avg_price: Decimal::ZERO,
            counterparty_id: None,
            invoice_ref: None,
            total_amount: Decimal::ZERO,
            description: None,
            created_at: Utc::now(),
        }
    }
}
