use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::EntryId;

/// Whether an entry moves cash out of or into the main account.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Debit => "debit",
            Direction::Credit => "credit",
        }
    }

    /// Signed effect on the global balance: credit increases, debit decreases.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Direction::Debit => -amount,
            Direction::Credit => amount,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(Direction::Debit),
            "credit" => Ok(Direction::Credit),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

/// Where a main-account entry originated.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Supplier,
    Customer,
    Expense,
    SupplierRefund,
    CustomerRefund,
    Adjustment,
    Other,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Supplier => "supplier",
            SourceKind::Customer => "customer",
            SourceKind::Expense => "expense",
            SourceKind::SupplierRefund => "supplier_refund",
            SourceKind::CustomerRefund => "customer_refund",
            SourceKind::Adjustment => "adjustment",
            SourceKind::Other => "other",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "supplier" => Ok(SourceKind::Supplier),
            "customer" => Ok(SourceKind::Customer),
            "expense" => Ok(SourceKind::Expense),
            "supplier_refund" => Ok(SourceKind::SupplierRefund),
            "customer_refund" => Ok(SourceKind::CustomerRefund),
            "adjustment" => Ok(SourceKind::Adjustment),
            "other" => Ok(SourceKind::Other),
            other => Err(format!("unknown source kind: {other}")),
        }
    }
}

/// Expense posting flavor: an ordinary expense spends cash, an expense
/// adjustment is a refund-like inflow.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseKind {
    Expense,
    Adjustment,
}

impl ExpenseKind {
    pub fn direction(self) -> Direction {
        match self {
            ExpenseKind::Expense => Direction::Debit,
            ExpenseKind::Adjustment => Direction::Credit,
        }
    }
}

/// Immutable entry in the global cash-position ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MainAccountTxn {
    pub id: EntryId,
    pub sequence: i64,
    pub direction: Direction,
    pub source: SourceKind,
    pub source_id: Option<Uuid>,
    pub reference_id: Option<Uuid>,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MainAccountTxn {
    pub fn new(direction: Direction, source: SourceKind, amount: Decimal) -> Self {
        Self {
            id: EntryId::new(),
            sequence: 0,
            direction,
            source,
            source_id: None,
            reference_id: None,
            amount,
            balance_after: Decimal::ZERO,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_source_id(mut self, source_id: Uuid) -> Self {
        self.source_id = Some(source_id);
        self
    }

    pub fn with_reference(mut self, reference_id: Uuid) -> Self {
        self.reference_id = Some(reference_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
