//! Fixed-point money.
//!
//! Amounts are held as integer minor units next to their currency code. All
//! pricing math happens on `Decimal` values and is converted into minor units
//! exactly once, through [`to_minor_units`].

use std::fmt;

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};

/// Round to specified decimal places using banker's rounding (ROUND_HALF_EVEN).
///
/// Banker's rounding rounds to the nearest even number when the value is exactly
/// halfway between two possibilities. This reduces cumulative rounding bias
/// when many quotation lines are summed.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use tourops_pricing::money::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(2));   // rounds to even
/// assert_eq!(round_money(dec!(3.5), 0), dec!(4));   // rounds to even
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// ISO-4217 style currency code (three ASCII letters, upper-case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse and normalize a currency code.
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PricingError::Validation(format!(
                "Invalid currency code: '{}'",
                code
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of decimal places in the currency's minor unit.
    pub fn minor_exponent(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "VND" | "CLP" | "ISK" | "UGX" | "XAF" | "XOF" => 0,
            "BHD" | "IQD" | "JOD" | "KWD" | "LYD" | "OMR" | "TND" => 3,
            _ => 2,
        }
    }

    /// Display symbol, for the currencies that have a well-known one.
    pub fn symbol(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "USD" => Some("$"),
            "EUR" => Some("€"),
            "GBP" => Some("£"),
            "TRY" => Some("₺"),
            "JPY" => Some("¥"),
            "INR" => Some("₹"),
            _ => None,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = PricingError;

    fn try_from(value: String) -> Result<Self> {
        CurrencyCode::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        CurrencyCode::parse(s)
    }
}

/// Convert a decimal amount into integer minor units of `currency`.
///
/// Uses [`round_money`] (half-to-even) at the currency's minor exponent.
pub fn to_minor_units(amount: Decimal, currency: &CurrencyCode) -> Result<i64> {
    let exponent = currency.minor_exponent();
    round_money(amount, exponent)
        .checked_mul(Decimal::from(10_i64.pow(exponent)))
        .and_then(|scaled| scaled.to_i64())
        .ok_or_else(|| {
            PricingError::Validation(format!("Amount {} {} is out of range", amount, currency))
        })
}

/// Convert integer minor units back into a decimal amount of `currency`.
pub fn from_minor_units(amount_minor: i64, currency: &CurrencyCode) -> Decimal {
    Decimal::new(amount_minor, currency.minor_exponent())
}

/// Money value: integer minor units plus currency.
///
/// Serialized as `{ "amount_minor": 14160, "currency": "USD" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: CurrencyCode,
}

impl Money {
    pub fn new(amount_minor: i64, currency: CurrencyCode) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    pub fn zero(currency: CurrencyCode) -> Self {
        Self::new(0, currency)
    }

    /// Build from a decimal amount, rounding once into minor units.
    pub fn from_decimal(amount: Decimal, currency: CurrencyCode) -> Result<Self> {
        let amount_minor = to_minor_units(amount, &currency)?;
        Ok(Self::new(amount_minor, currency))
    }

    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn to_decimal(&self) -> Decimal {
        from_minor_units(self.amount_minor, &self.currency)
    }

    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    /// Checked addition - fails if currencies don't match.
    pub fn checked_add(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        let amount_minor = self
            .amount_minor
            .checked_add(other.amount_minor)
            .ok_or_else(|| PricingError::Validation("Money addition overflowed".to_string()))?;
        Ok(Money::new(amount_minor, self.currency.clone()))
    }

    /// Checked subtraction - fails if currencies don't match.
    pub fn checked_sub(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        let amount_minor = self
            .amount_minor
            .checked_sub(other.amount_minor)
            .ok_or_else(|| PricingError::Validation("Money subtraction overflowed".to_string()))?;
        Ok(Money::new(amount_minor, self.currency.clone()))
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<()> {
        if self.currency != other.currency {
            return Err(PricingError::CurrencyMismatch {
                expected: self.currency.clone(),
                found: other.currency.clone(),
            });
        }
        Ok(())
    }
}

/// Format for display: `$141.60`, `-€5.00`, or `1234.50 CHF` when the
/// currency has no known symbol.
pub fn format_money(money: &Money) -> String {
    let amount = money.to_decimal().abs();
    let sign = if money.amount_minor < 0 { "-" } else { "" };
    match money.currency.symbol() {
        Some(symbol) => format!("{}{}{}", sign, symbol, amount),
        None => format!("{}{} {}", sign, amount, money.currency),
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_money(self))
    }
}
