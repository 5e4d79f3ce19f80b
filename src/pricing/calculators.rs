//! Core pricing calculation functions.
//!
//! Pure functions for pricing math - no store access. All arithmetic stays in
//! `Decimal`; amounts become minor units exactly once, in [`line_price`].

use rust_decimal::Decimal;

use crate::error::{PricingError, Result};
use crate::money::{CurrencyCode, Money};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

fn overflow(what: &str) -> PricingError {
    PricingError::Validation(format!("{} overflowed", what))
}

/// `amount * (1 + percent / 100)`
fn apply_percent(amount: Decimal, percent: Decimal, what: &str) -> Result<Decimal> {
    let factor = percent
        .checked_div(HUNDRED)
        .and_then(|p| Decimal::ONE.checked_add(p))
        .ok_or_else(|| overflow(what))?;
    amount.checked_mul(factor).ok_or_else(|| overflow(what))
}

/// Apply a markup percentage to a base price.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use tourops_pricing::pricing::calculators::apply_markup;
///
/// assert_eq!(apply_markup(dec!(100), dec!(20)).unwrap(), dec!(120));
/// assert_eq!(apply_markup(dec!(100), dec!(0)).unwrap(), dec!(100));
/// ```
pub fn apply_markup(base: Decimal, markup_percent: Decimal) -> Result<Decimal> {
    apply_percent(base, markup_percent, "Markup")
}

/// Apply tax on an already marked-up amount.
pub fn apply_tax(amount: Decimal, tax_percent: Decimal) -> Result<Decimal> {
    apply_percent(amount, tax_percent, "Tax")
}

/// Unit price before rounding: markup first, then tax on the marked-up amount.
pub fn unit_price(base: Decimal, markup_percent: Decimal, tax_percent: Decimal) -> Result<Decimal> {
    apply_tax(apply_markup(base, markup_percent)?, tax_percent)
}

/// Extend a unit price to a line total.
///
/// Only per-person selectors multiply by quantity; night and day rates are
/// already the line total.
pub fn extend_by_quantity(unit: Decimal, quantity: u32, per_person: bool) -> Result<Decimal> {
    if !per_person {
        return Ok(unit);
    }
    unit.checked_mul(Decimal::from(quantity))
        .ok_or_else(|| overflow("Quantity extension"))
}

/// Rounded unit and total of one priced line.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePrice {
    pub unit_price: Money,
    pub total_price: Money,
}

/// Price one line in `currency`.
///
/// Unit and total are each rounded once (half-to-even) from the unrounded
/// decimal, so the total is never built from a rounded unit.
pub fn line_price(
    base: Decimal,
    markup_percent: Decimal,
    tax_percent: Decimal,
    quantity: u32,
    per_person: bool,
    currency: &CurrencyCode,
) -> Result<LinePrice> {
    let unit = unit_price(base, markup_percent, tax_percent)?;
    let total = extend_by_quantity(unit, quantity, per_person)?;

    Ok(LinePrice {
        unit_price: Money::from_decimal(unit, currency.clone())?,
        total_price: Money::from_decimal(total, currency.clone())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        CurrencyCode::parse("USD").unwrap()
    }

    // ==================== markup / tax tests ====================

    #[test]
    fn test_markup_then_tax() {
        // 100.00 + 20% = 120.00, + 18% = 141.60
        assert_eq!(unit_price(dec!(100.00), dec!(20), dec!(18)).unwrap(), dec!(141.6));
    }

    #[test]
    fn test_tax_applies_to_marked_up_amount() {
        let marked_up = apply_markup(dec!(50), dec!(10)).unwrap();
        assert_eq!(marked_up, dec!(55));
        assert_eq!(apply_tax(marked_up, dec!(20)).unwrap(), dec!(66));
    }

    #[test]
    fn test_negative_markup_discounts() {
        assert_eq!(apply_markup(dec!(80), dec!(-25)).unwrap(), dec!(60));
    }

    #[test]
    fn test_fractional_percentages() {
        assert_eq!(apply_tax(dec!(200), dec!(7.5)).unwrap(), dec!(215));
    }

    // ==================== quantity tests ====================

    #[test]
    fn test_extend_per_person_only() {
        assert_eq!(extend_by_quantity(dec!(12.5), 4, true).unwrap(), dec!(50));
        assert_eq!(extend_by_quantity(dec!(12.5), 4, false).unwrap(), dec!(12.5));
    }

    // ==================== line_price tests ====================

    #[test]
    fn test_line_price_markup_and_tax() {
        let line = line_price(dec!(100.00), dec!(20), dec!(18), 1, false, &usd()).unwrap();
        assert_eq!(line.unit_price, Money::new(14_160, usd()));
        assert_eq!(line.total_price, Money::new(14_160, usd()));
        assert_eq!(line.unit_price.to_string(), "$141.60");
    }

    #[test]
    fn test_line_total_rounds_from_unrounded_unit() {
        // 10.005 unit rounds to 10.00 (half to even), but 3 x 10.005 = 30.015
        // rounds to 30.02, not 3 x 10.00.
        let line = line_price(dec!(10.005), dec!(0), dec!(0), 3, true, &usd()).unwrap();
        assert_eq!(line.unit_price.amount_minor(), 1_000);
        assert_eq!(line.total_price.amount_minor(), 3_002);
    }

    #[test]
    fn test_line_price_bankers_rounding() {
        // 0.125 -> 0.12, 0.135 -> 0.14
        let low = line_price(dec!(0.125), dec!(0), dec!(0), 1, false, &usd()).unwrap();
        let high = line_price(dec!(0.135), dec!(0), dec!(0), 1, false, &usd()).unwrap();
        assert_eq!(low.unit_price.amount_minor(), 12);
        assert_eq!(high.unit_price.amount_minor(), 14);
    }

    #[test]
    fn test_line_price_zero_decimal_currency() {
        let jpy = CurrencyCode::parse("JPY").unwrap();
        let line = line_price(dec!(1250), dec!(10), dec!(0), 2, true, &jpy).unwrap();
        // 1375 per person, 2750 total
        assert_eq!(line.unit_price.amount_minor(), 1_375);
        assert_eq!(line.total_price.amount_minor(), 2_750);
    }

    #[test]
    fn test_overflow_is_validation_error() {
        let err = extend_by_quantity(Decimal::MAX, 2, true).unwrap_err();
        assert!(matches!(err, PricingError::Validation(_)));
    }
}
