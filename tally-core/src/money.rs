use rust_decimal::Decimal;
use thiserror::Error;

/// Maximum number of decimal places accepted on a monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Validation error for monetary amounts and quantities.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AmountError {
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),
    #[error("amount carries more than {MONEY_SCALE} decimal places: {0}")]
    TooPrecise(Decimal),
    #[error("quantity must be greater than zero: {0}")]
    NonPositive(Decimal),
}

/// Ensure a monetary amount is non-negative and at most 2-scale.
pub fn validate_amount(amount: Decimal) -> Result<(), AmountError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative(amount));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(AmountError::TooPrecise(amount));
    }
    Ok(())
}

/// Ensure a movement quantity is strictly positive.
pub fn validate_quantity(quantity: Decimal) -> Result<(), AmountError> {
    if quantity <= Decimal::ZERO {
        return Err(AmountError::NonPositive(quantity));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn accepts_two_scale_amounts() {
        assert!(validate_amount(dec!(0)).is_ok());
        assert!(validate_amount(dec!(10.50)).is_ok());
        assert!(validate_amount(dec!(99999999.99)).is_ok());
    }

    #[test]
    fn rejects_negative_and_over_precise() {
        assert_eq!(
            validate_amount(dec!(-1)),
            Err(AmountError::Negative(dec!(-1)))
        );
        assert_eq!(
            validate_amount(dec!(1.005)),
            Err(AmountError::TooPrecise(dec!(1.005)))
        );
        // Trailing zeros beyond scale 2 are fine once normalized.
        assert!(validate_amount(dec!(1.2300)).is_ok());
    }

    #[test]
    fn quantity_must_be_positive() {
        assert!(validate_quantity(dec!(0.5)).is_ok());
        assert_eq!(
            validate_quantity(dec!(0)),
            Err(AmountError::NonPositive(dec!(0)))
        );
        assert_eq!(
            validate_quantity(dec!(-3)),
            Err(AmountError::NonPositive(dec!(-3)))
        );
    }
}
