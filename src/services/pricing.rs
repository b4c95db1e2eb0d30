//! Monetary math for sales.
//!
//! Pure functions: no I/O, no rounding of intermediate line totals. Rounding
//! is half-up to two decimal places and is applied exactly twice, once for
//! tax and once for the net amount.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

/// One cart line as priced. Owned by the caller for the duration of a
/// single sale orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
}

/// Computed totals for a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedSale {
    /// Per-line totals, same order as the input lines. Unrounded.
    pub line_totals: Vec<Decimal>,
    /// Sum of line totals. Unrounded.
    pub subtotal: Decimal,
    /// `round2(subtotal * tax_rate)`
    pub tax: Decimal,
    /// Overall discount as supplied by the caller.
    pub discount: Decimal,
    /// `round2(subtotal + tax - discount)`
    pub net: Decimal,
}

/// Rounds to two decimal places, half away from zero.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Computes a single line total: `unit_price * quantity - discount`.
/// The discount may not push a line negative.
pub fn line_total(line: &SaleLine) -> Result<Decimal, ServiceError> {
    if line.quantity <= 0 {
        return Err(ServiceError::InvalidInput(format!(
            "Quantity must be positive for product {}",
            line.product_id
        )));
    }
    if line.unit_price <= Decimal::ZERO {
        return Err(ServiceError::InvalidInput(format!(
            "Unit price must be positive for product {}",
            line.product_id
        )));
    }
    if line.discount_amount < Decimal::ZERO {
        return Err(ServiceError::InvalidInput(format!(
            "Discount may not be negative for product {}",
            line.product_id
        )));
    }
    let gross = line.unit_price * Decimal::from(line.quantity);
    if line.discount_amount > gross {
        return Err(ServiceError::InvalidInput(format!(
            "Discount {} exceeds line total {} for product {}",
            line.discount_amount, gross, line.product_id
        )));
    }
    Ok(gross - line.discount_amount)
}

/// Prices a whole sale with the given tax rate (decimal fraction) and
/// overall discount.
pub fn price_sale(
    lines: &[SaleLine],
    tax_rate: Decimal,
    overall_discount: Decimal,
) -> Result<PricedSale, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::InvalidInput(
            "Sale must contain at least one item".to_string(),
        ));
    }
    if overall_discount < Decimal::ZERO {
        return Err(ServiceError::InvalidInput(
            "Overall discount may not be negative".to_string(),
        ));
    }

    let mut line_totals = Vec::with_capacity(lines.len());
    let mut subtotal = Decimal::ZERO;
    for line in lines {
        let total = line_total(line)?;
        subtotal += total;
        line_totals.push(total);
    }

    let tax = round2(subtotal * tax_rate);
    if overall_discount > subtotal + tax {
        return Err(ServiceError::InvalidInput(format!(
            "Overall discount {} exceeds sale total {}",
            overall_discount,
            subtotal + tax
        )));
    }
    let net = round2(subtotal + tax - overall_discount);

    Ok(PricedSale {
        line_totals,
        subtotal,
        tax,
        discount: overall_discount,
        net,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn line(quantity: i32, unit_price: Decimal, discount: Decimal) -> SaleLine {
        SaleLine {
            product_id: Uuid::new_v4(),
            quantity,
            unit_price,
            discount_amount: discount,
        }
    }

    #[test]
    fn rounds_half_up_at_two_places() {
        assert_eq!(round2(dec!(1.255)), dec!(1.26));
        assert_eq!(round2(dec!(1.254)), dec!(1.25));
        assert_eq!(round2(dec!(24.0)), dec!(24.0));
    }

    #[test]
    fn single_line_with_tax() {
        // stock scenario: 3 x 100.00 at 8% tax
        let priced = price_sale(&[line(3, dec!(100.00), dec!(0))], dec!(0.08), dec!(0)).unwrap();
        assert_eq!(priced.subtotal, dec!(300.00));
        assert_eq!(priced.tax, dec!(24.00));
        assert_eq!(priced.net, dec!(324.00));
    }

    #[test]
    fn multi_line_with_five_percent_tax() {
        // 2 x 50.00 + 1 x 20.00 at 5%
        let lines = vec![line(2, dec!(50.00), dec!(0)), line(1, dec!(20.00), dec!(0))];
        let priced = price_sale(&lines, dec!(0.05), dec!(0)).unwrap();
        assert_eq!(priced.subtotal, dec!(120.00));
        assert_eq!(priced.tax, dec!(6.00));
        assert_eq!(priced.net, dec!(126.00));
    }

    #[test]
    fn line_discount_reduces_subtotal_before_tax() {
        let priced = price_sale(&[line(2, dec!(10.00), dec!(5.00))], dec!(0.10), dec!(0)).unwrap();
        assert_eq!(priced.subtotal, dec!(15.00));
        assert_eq!(priced.tax, dec!(1.50));
        assert_eq!(priced.net, dec!(16.50));
    }

    #[test]
    fn overall_discount_applies_after_tax() {
        let priced = price_sale(&[line(1, dec!(100.00), dec!(0))], dec!(0.08), dec!(8.00)).unwrap();
        assert_eq!(priced.net, dec!(100.00));
    }

    #[test]
    fn intermediate_totals_are_not_rounded() {
        // 3 x 0.333 = 0.999 stays unrounded in the subtotal; only tax and
        // net are rounded.
        let priced = price_sale(&[line(3, dec!(0.333), dec!(0))], dec!(0), dec!(0)).unwrap();
        assert_eq!(priced.subtotal, dec!(0.999));
        assert_eq!(priced.net, dec!(1.00));
    }

    #[test]
    fn rejects_non_positive_quantity_and_price() {
        assert_matches!(
            price_sale(&[line(0, dec!(10.00), dec!(0))], dec!(0), dec!(0)),
            Err(ServiceError::InvalidInput(_))
        );
        assert_matches!(
            price_sale(&[line(1, dec!(0), dec!(0))], dec!(0), dec!(0)),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[test]
    fn rejects_discount_exceeding_line() {
        assert_matches!(
            price_sale(&[line(1, dec!(10.00), dec!(10.01))], dec!(0), dec!(0)),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[test]
    fn rejects_overall_discount_exceeding_total() {
        assert_matches!(
            price_sale(&[line(1, dec!(10.00), dec!(0))], dec!(0), dec!(10.01)),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[test]
    fn rejects_empty_sale() {
        assert_matches!(
            price_sale(&[], dec!(0), dec!(0)),
            Err(ServiceError::InvalidInput(_))
        );
    }
}
