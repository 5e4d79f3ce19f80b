use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{PricingError, Result};
use crate::money::CurrencyCode;

/// One entry of a currency pair's rate history.
///
/// `rate` is how many units of `to_currency` one unit of `from_currency` buys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub id: Uuid,
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    #[serde(serialize_with = "serialize_rate")]
    pub rate: Decimal,
    pub effective_date: NaiveDate,
}

impl ExchangeRate {
    /// Reject rates that must never be applied.
    pub fn validate(&self) -> Result<()> {
        if self.rate <= Decimal::ZERO {
            return Err(PricingError::InvalidExchangeRate(format!(
                "{}->{} on {} has non-positive rate {}",
                self.from_currency, self.to_currency, self.effective_date, self.rate
            )));
        }
        if self.from_currency == self.to_currency {
            return Err(PricingError::InvalidExchangeRate(format!(
                "{} to itself is implicitly 1 and is not stored",
                self.from_currency
            )));
        }
        Ok(())
    }
}

/// Same scale as the `exchange_rates.rate` column.
const RATE_SCALE: u32 = 10;

fn serialize_rate<S>(decimal: &Decimal, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let rounded = decimal.round_dp(RATE_SCALE);
    serializer.serialize_str(&rounded.to_string())
}

/// Rate entry as submitted by the back office.
#[derive(Debug, Clone, Deserialize)]
pub struct NewExchangeRate {
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    #[serde(with = "rust_decimal::serde::str")]
    pub rate: Decimal,
    pub effective_date: NaiveDate,
}

impl NewExchangeRate {
    pub fn into_rate(self) -> Result<ExchangeRate> {
        let rate = ExchangeRate {
            id: Uuid::new_v4(),
            from_currency: self.from_currency,
            to_currency: self.to_currency,
            rate: self.rate,
            effective_date: self.effective_date,
        };
        rate.validate()?;
        Ok(rate)
    }
}

/// Row from exchange_rates
#[derive(Debug, Clone, FromRow)]
pub struct ExchangeRateRow {
    pub id: Uuid,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    pub effective_date: NaiveDate,
}

impl TryFrom<ExchangeRateRow> for ExchangeRate {
    type Error = PricingError;

    fn try_from(row: ExchangeRateRow) -> Result<Self> {
        Ok(ExchangeRate {
            id: row.id,
            from_currency: CurrencyCode::parse(&row.from_currency)?,
            to_currency: CurrencyCode::parse(&row.to_currency)?,
            rate: row.rate,
            effective_date: row.effective_date,
        })
    }
}
