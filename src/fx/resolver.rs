//! Date-effective exchange-rate resolution and conversion.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::cache::PricingCache;
use crate::error::{PricingError, Result};
use crate::money::{from_minor_units, to_minor_units, CurrencyCode};
use crate::store::RateHistoryStore;

use super::models::{ExchangeRate, NewExchangeRate};

/// Rate applied to a conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRate {
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    pub rate: Decimal,
    /// `None` for the implicit same-currency rate of 1.
    pub effective_date: Option<NaiveDate>,
}

impl ResolvedRate {
    fn identity(currency: &CurrencyCode) -> Self {
        Self {
            from_currency: currency.clone(),
            to_currency: currency.clone(),
            rate: Decimal::ONE,
            effective_date: None,
        }
    }
}

impl From<ExchangeRate> for ResolvedRate {
    fn from(rate: ExchangeRate) -> Self {
        Self {
            from_currency: rate.from_currency,
            to_currency: rate.to_currency,
            rate: rate.rate,
            effective_date: Some(rate.effective_date),
        }
    }
}

/// Converted minor amount together with the rate that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub amount_minor: i64,
    pub rate: ResolvedRate,
}

#[derive(Clone)]
pub struct ExchangeRateResolver {
    store: Arc<dyn RateHistoryStore>,
    cache: PricingCache,
}

impl ExchangeRateResolver {
    pub fn new(store: Arc<dyn RateHistoryStore>, cache: PricingCache) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &PricingCache {
        &self.cache
    }

    /// Rate effective on `date`: the latest one with `effective_date <= date`.
    ///
    /// Same-currency pairs resolve to 1 without touching the store. `Ok(None)`
    /// means no rate exists yet for that date; the caller decides whether that
    /// is fatal.
    #[instrument(skip(self, from, to), fields(from = %from, to = %to))]
    pub async fn resolve_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<ResolvedRate>> {
        if from == to {
            return Ok(Some(ResolvedRate::identity(from)));
        }

        let key = PricingCache::rate_key(from, to, date);
        if let Some(cached) = self.cache.rates.get(&key).await {
            debug!("Cache HIT for rate {}->{} on {}", from, to, date);
            return Ok(cached.map(ResolvedRate::from));
        }

        debug!("Cache MISS for rate {}->{} on {}", from, to, date);
        let generation = self.cache.generation();
        let found = self.store.latest_rate_on_or_before(from, to, date).await?;
        if let Some(rate) = &found {
            rate.validate()?;
        }
        if !self
            .cache
            .insert_rate_if_current(key, found.clone(), generation)
            .await
        {
            debug!("Rate {}->{} on {} changed during lookup, not cached", from, to, date);
        }

        Ok(found.map(ResolvedRate::from))
    }

    /// Convert minor units of `from` into minor units of `to` at the rate
    /// effective on `date`. Rounds once, half-to-even, after multiplying.
    pub async fn convert_with_rate(
        &self,
        amount_minor: i64,
        from: &CurrencyCode,
        to: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<Conversion>> {
        if from == to {
            return Ok(Some(Conversion {
                amount_minor,
                rate: ResolvedRate::identity(from),
            }));
        }

        let Some(rate) = self.resolve_rate(from, to, date).await? else {
            return Ok(None);
        };

        let converted = from_minor_units(amount_minor, from)
            .checked_mul(rate.rate)
            .ok_or_else(|| {
                PricingError::Validation(format!(
                    "Converting {} minor units {}->{} overflowed",
                    amount_minor, from, to
                ))
            })?;

        Ok(Some(Conversion {
            amount_minor: to_minor_units(converted, to)?,
            rate,
        }))
    }

    /// Convert minor units; `Ok(None)` when no rate is effective on `date`.
    pub async fn convert(
        &self,
        amount_minor: i64,
        from: &CurrencyCode,
        to: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<i64>> {
        Ok(self
            .convert_with_rate(amount_minor, from, to, date)
            .await?
            .map(|c| c.amount_minor))
    }

    /// Append a rate to the history.
    #[instrument(skip(self, new_rate), fields(from = %new_rate.from_currency, to = %new_rate.to_currency))]
    pub async fn record_rate(&self, new_rate: NewExchangeRate) -> Result<ExchangeRate> {
        let rate = new_rate.into_rate()?;
        let saved = self.store.insert_rate(rate).await?;
        self.cache.invalidate_all();
        info!(
            "Recorded {}->{} rate {} effective {}",
            saved.from_currency, saved.to_currency, saved.rate, saved.effective_date
        );
        Ok(saved)
    }

    /// Rate history of a pair, oldest first.
    pub async fn history(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Vec<ExchangeRate>> {
        self.store.list_rates_for_pair(from, to).await
    }
}
