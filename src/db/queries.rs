//! Database queries for exchange-rate history

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::error::{PricingError, Result};
use crate::fx::{ExchangeRate, ExchangeRateRow};
use crate::money::CurrencyCode;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Latest rate for a pair effective on or before `date`
pub async fn find_latest_rate_on_or_before(
    pool: &PgPool,
    from: &CurrencyCode,
    to: &CurrencyCode,
    date: NaiveDate,
) -> Result<Option<ExchangeRateRow>> {
    let row = sqlx::query_as::<_, ExchangeRateRow>(
        r#"
        SELECT id, from_currency, to_currency, rate, effective_date
        FROM exchange_rates
        WHERE from_currency = $1
          AND to_currency = $2
          AND effective_date <= $3
        ORDER BY effective_date DESC
        LIMIT 1
        "#,
    )
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(date)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Full history of a pair, oldest first
pub async fn get_rates_for_pair(
    pool: &PgPool,
    from: &CurrencyCode,
    to: &CurrencyCode,
) -> Result<Vec<ExchangeRateRow>> {
    let rows = sqlx::query_as::<_, ExchangeRateRow>(
        r#"
        SELECT id, from_currency, to_currency, rate, effective_date
        FROM exchange_rates
        WHERE from_currency = $1
          AND to_currency = $2
        ORDER BY effective_date
        "#,
    )
    .bind(from.as_str())
    .bind(to.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Append a rate to the history
pub async fn insert_exchange_rate(pool: &PgPool, rate: &ExchangeRate) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO exchange_rates (id, from_currency, to_currency, rate, effective_date)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(rate.id)
    .bind(rate.from_currency.as_str())
    .bind(rate.to_currency.as_str())
    .bind(rate.rate)
    .bind(rate.effective_date)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err))
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
        {
            Err(PricingError::Validation(format!(
                "A {}->{} rate effective {} is already recorded",
                rate.from_currency, rate.to_currency, rate.effective_date
            )))
        }
        Err(e) => Err(e.into()),
    }
}

/// Convert fetched rows into domain rates
pub fn rows_to_rates(rows: Vec<ExchangeRateRow>) -> Result<Vec<ExchangeRate>> {
    rows.into_iter().map(ExchangeRate::try_from).collect()
}
