//! Sign-convention tables for the three ledgers.
//!
//! These are the core business rules: how each transaction kind moves a
//! counterparty balance, its receivable/debt companion, the global cash
//! ledger, and product stock.

use rust_decimal::Decimal;
use tally_core::{Direction, MovementKind, PartyKind, SourceKind, TxnKind};

/// Signed consequences of one counterparty transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterpartyEffect {
    /// Delta applied to `current_balance`.
    pub balance_delta: Decimal,
    /// Delta applied to the receivable (customer) or debt (supplier).
    pub secondary_delta: Decimal,
    /// Mirrored main-account write, absent for originating kinds.
    pub main_account: Option<(Direction, SourceKind)>,
}

/// Resolve the signed effect of posting `kind` against the party side;
/// `None` when the kind is not legal for that side.
pub fn counterparty_effect(
    party: PartyKind,
    kind: TxnKind,
    amount: Decimal,
) -> Option<CounterpartyEffect> {
    let effect = match (party, kind) {
        (PartyKind::Customer, TxnKind::Sale) => CounterpartyEffect {
            balance_delta: amount,
            secondary_delta: amount,
            main_account: None,
        },
        (PartyKind::Customer, TxnKind::Payment) => CounterpartyEffect {
            balance_delta: -amount,
            secondary_delta: -amount,
            main_account: Some((Direction::Credit, SourceKind::Customer)),
        },
        (PartyKind::Customer, TxnKind::Refund) => CounterpartyEffect {
            balance_delta: -amount,
            secondary_delta: -amount,
            main_account: Some((Direction::Debit, SourceKind::CustomerRefund)),
        },
        (PartyKind::Customer, TxnKind::Adjustment) => CounterpartyEffect {
            balance_delta: amount,
            secondary_delta: amount,
            main_account: Some((Direction::Debit, SourceKind::Adjustment)),
        },
        (PartyKind::Supplier, TxnKind::Purchase) => CounterpartyEffect {
            balance_delta: -amount,
            secondary_delta: amount,
            main_account: None,
        },
        (PartyKind::Supplier, TxnKind::Payment) => CounterpartyEffect {
            balance_delta: amount,
            secondary_delta: -amount,
            main_account: Some((Direction::Debit, SourceKind::Supplier)),
        },
        (PartyKind::Supplier, TxnKind::Refund) => CounterpartyEffect {
            balance_delta: amount,
            secondary_delta: Decimal::ZERO,
            main_account: Some((Direction::Credit, SourceKind::SupplierRefund)),
        },
        (PartyKind::Supplier, TxnKind::Adjustment) => CounterpartyEffect {
            balance_delta: amount,
            secondary_delta: Decimal::ZERO,
            main_account: Some((Direction::Credit, SourceKind::Adjustment)),
        },
        (PartyKind::Supplier, TxnKind::Sale) | (PartyKind::Customer, TxnKind::Purchase) => {
            return None;
        }
    };
    Some(effect)
}

/// Direction of an adjustment/miscellaneous movement relative to stock.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StockDirection {
    Inbound,
    Outbound,
}

/// Signed stock delta for a movement of `quantity > 0`.
pub fn movement_delta(
    kind: MovementKind,
    quantity: Decimal,
    direction: Option<StockDirection>,
) -> Decimal {
    match kind {
        MovementKind::Purchase | MovementKind::Refund => quantity,
        MovementKind::Sale => -quantity,
        MovementKind::Adjustment | MovementKind::Miscellaneous => {
            match direction.unwrap_or(StockDirection::Inbound) {
                StockDirection::Inbound => quantity,
                StockDirection::Outbound => -quantity,
            }
        }
    }
}

/// Weighted-average cost after buying `quantity` units at `unit_price`.
pub fn weighted_avg_cost(
    prior_qty: Decimal,
    prior_avg: Decimal,
    quantity: Decimal,
    unit_price: Decimal,
) -> Decimal {
    let resulting_qty = prior_qty + quantity;
    if resulting_qty <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (prior_qty * prior_avg + quantity * unit_price) / resulting_qty
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn customer_table_matches_conventions() {
        let sale = counterparty_effect(PartyKind::Customer, TxnKind::Sale, dec!(100)).unwrap();
        assert_eq!(sale.balance_delta, dec!(100));
        assert_eq!(sale.secondary_delta, dec!(100));
        assert_eq!(sale.main_account, None);

        let payment = counterparty_effect(PartyKind::Customer, TxnKind::Payment, dec!(60)).unwrap();
        assert_eq!(payment.balance_delta, dec!(-60));
        assert_eq!(
            payment.main_account,
            Some((Direction::Credit, SourceKind::Customer))
        );

        let refund = counterparty_effect(PartyKind::Customer, TxnKind::Refund, dec!(10)).unwrap();
        assert_eq!(refund.balance_delta, dec!(-10));
        assert_eq!(
            refund.main_account,
            Some((Direction::Debit, SourceKind::CustomerRefund))
        );

        let adjustment = counterparty_effect(PartyKind::Customer, TxnKind::Adjustment, dec!(5)).unwrap();
        assert_eq!(adjustment.balance_delta, dec!(5));
        assert_eq!(
            adjustment.main_account,
            Some((Direction::Debit, SourceKind::Adjustment))
        );
    }

    #[test]
    fn supplier_table_matches_conventions() {
        let purchase = counterparty_effect(PartyKind::Supplier, TxnKind::Purchase, dec!(200)).unwrap();
        assert_eq!(purchase.balance_delta, dec!(-200));
        assert_eq!(purchase.secondary_delta, dec!(200));
        assert_eq!(purchase.main_account, None);

        let payment = counterparty_effect(PartyKind::Supplier, TxnKind::Payment, dec!(50)).unwrap();
        assert_eq!(payment.balance_delta, dec!(50));
        assert_eq!(payment.secondary_delta, dec!(-50));
        assert_eq!(
            payment.main_account,
            Some((Direction::Debit, SourceKind::Supplier))
        );

        let refund = counterparty_effect(PartyKind::Supplier, TxnKind::Refund, dec!(20)).unwrap();
        assert_eq!(refund.balance_delta, dec!(20));
        assert_eq!(refund.secondary_delta, dec!(0));
        assert_eq!(
            refund.main_account,
            Some((Direction::Credit, SourceKind::SupplierRefund))
        );
    }

    #[test]
    fn illegal_pairings_have_no_effect() {
        assert!(counterparty_effect(PartyKind::Supplier, TxnKind::Sale, dec!(1)).is_none());
        assert!(counterparty_effect(PartyKind::Customer, TxnKind::Purchase, dec!(1)).is_none());
    }

    #[test]
    fn movement_deltas_follow_kind() {
        assert_eq!(movement_delta(MovementKind::Purchase, dec!(10), None), dec!(10));
        assert_eq!(movement_delta(MovementKind::Sale, dec!(3), None), dec!(-3));
        assert_eq!(movement_delta(MovementKind::Refund, dec!(2), None), dec!(2));
        assert_eq!(
            movement_delta(MovementKind::Adjustment, dec!(4), Some(StockDirection::Outbound)),
            dec!(-4)
        );
        assert_eq!(
            movement_delta(MovementKind::Miscellaneous, dec!(4), None),
            dec!(4)
        );
    }

    #[test]
    fn weighted_avg_cost_blends_and_guards_zero() {
        assert_eq!(
            weighted_avg_cost(dec!(10), dec!(5), dec!(10), dec!(7)),
            dec!(6)
        );
        assert_eq!(weighted_avg_cost(dec!(0), dec!(0), dec!(10), dec!(5)), dec!(5));
        assert_eq!(weighted_avg_cost(dec!(5), dec!(4), dec!(-5), dec!(0)), dec!(0));
    }
}
