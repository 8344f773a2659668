use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{CustomerId, EntryId, SupplierId};

/// Which side of the business a counterparty sits on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }

    /// The transaction kind that opens an invoice on this side.
    pub fn originating_kind(self) -> TxnKind {
        match self {
            PartyKind::Customer => TxnKind::Sale,
            PartyKind::Supplier => TxnKind::Purchase,
        }
    }
}

impl fmt::Display for PartyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(PartyKind::Customer),
            "supplier" => Ok(PartyKind::Supplier),
            other => Err(format!("unknown party kind: {other}")),
        }
    }
}

/// Typed reference to one counterparty, carrying its side.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum CounterpartyId {
    Customer(CustomerId),
    Supplier(SupplierId),
}

impl CounterpartyId {
    pub fn party_kind(self) -> PartyKind {
        match self {
            CounterpartyId::Customer(_) => PartyKind::Customer,
            CounterpartyId::Supplier(_) => PartyKind::Supplier,
        }
    }

    pub fn uuid(self) -> Uuid {
        match self {
            CounterpartyId::Customer(id) => id.into(),
            CounterpartyId::Supplier(id) => id.into(),
        }
    }
}

impl From<CustomerId> for CounterpartyId {
    fn from(value: CustomerId) -> Self {
        CounterpartyId::Customer(value)
    }
}

impl From<SupplierId> for CounterpartyId {
    fn from(value: SupplierId) -> Self {
        CounterpartyId::Supplier(value)
    }
}

impl fmt::Display for CounterpartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.party_kind(), self.uuid())
    }
}

/// Enumerates the counterparty ledger line item categories.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnKind {
    Sale,
    Purchase,
    Payment,
    Refund,
    Adjustment,
}

impl TxnKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TxnKind::Sale => "sale",
            TxnKind::Purchase => "purchase",
            TxnKind::Payment => "payment",
            TxnKind::Refund => "refund",
            TxnKind::Adjustment => "adjustment",
        }
    }

    /// Whether this kind may be posted against the given party side.
    pub fn legal_for(self, party: PartyKind) -> bool {
        match self {
            TxnKind::Sale => party == PartyKind::Customer,
            TxnKind::Purchase => party == PartyKind::Supplier,
            TxnKind::Payment | TxnKind::Refund | TxnKind::Adjustment => true,
        }
    }
}

impl fmt::Display for TxnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxnKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(TxnKind::Sale),
            "purchase" => Ok(TxnKind::Purchase),
            "payment" => Ok(TxnKind::Payment),
            "refund" => Ok(TxnKind::Refund),
            "adjustment" => Ok(TxnKind::Adjustment),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

/// Immutable counterparty ledger record carrying the running balance
/// immediately after it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CounterpartyTxn {
    pub id: EntryId,
    /// Store-assigned monotonic sequence used for balance chaining.
    pub sequence: i64,
    pub counterparty: CounterpartyId,
    pub kind: TxnKind,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub reference_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CounterpartyTxn {
    /// Creates an entry with a zero sequence; the store assigns the real one.
    pub fn new(counterparty: CounterpartyId, kind: TxnKind, amount: Decimal) -> Self {
        Self {
            id: EntryId::new(),
            sequence: 0,
            counterparty,
            kind,
            amount,
            balance_after: Decimal::ZERO,
            reference_id: None,
            description: None,
            created_at: Utc::now(),
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn originating_kinds_are_side_specific() {
        assert!(TxnKind::Sale.legal_for(PartyKind::Customer));
        assert!(!TxnKind::Sale.legal_for(PartyKind::Supplier));
        assert!(TxnKind::Purchase.legal_for(PartyKind::Supplier));
        assert!(!TxnKind::Purchase.legal_for(PartyKind::Customer));
        assert!(TxnKind::Payment.legal_for(PartyKind::Customer));
        assert!(TxnKind::Payment.legal_for(PartyKind::Supplier));
    }

    #[test]
    fn kind_labels_round_trip() {
        for kind in [
            TxnKind::Sale,
            TxnKind::Purchase,
            TxnKind::Payment,
            TxnKind::Refund,
            TxnKind::Adjustment,
        ] {
            assert_eq!(kind.as_str().parse::<TxnKind>(), Ok(kind));
        }
        assert!("settlement".parse::<TxnKind>().is_err());
    }
}
