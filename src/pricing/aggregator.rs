//! Fold priced lines into a single-currency quotation total.

use chrono::NaiveDate;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{PricingError, Result};
use crate::fx::ExchangeRateResolver;
use crate::money::{CurrencyCode, Money};

use super::resolver::{PriceResult, PricingContext, PricingResolver, QuotationLineItem};

/// How one line entered the total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineContribution {
    pub entity_id: Uuid,
    pub date: NaiveDate,
    pub original: Money,
    pub converted: Money,
    #[serde(with = "rust_decimal::serde::str")]
    pub rate: Decimal,
    /// Effective date of the applied rate; `None` when no conversion was needed.
    pub rate_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotationTotal {
    pub total: Money,
    pub quotation_date: NaiveDate,
    pub lines: Vec<LineContribution>,
}

/// Resolved lines together with their total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedQuotation {
    pub lines: Vec<PriceResult>,
    pub total: QuotationTotal,
}

#[derive(Clone)]
pub struct QuotationAggregator {
    pricing: PricingResolver,
    fx: ExchangeRateResolver,
}

impl QuotationAggregator {
    pub fn new(pricing: PricingResolver, fx: ExchangeRateResolver) -> Self {
        Self { pricing, fx }
    }

    /// Total of `lines` in `target`.
    ///
    /// Each line converts at the rate effective on its own date. A missing
    /// rate or an unpriced line fails the whole total.
    pub async fn aggregate(
        &self,
        lines: &[PriceResult],
        target: &CurrencyCode,
        quotation_date: NaiveDate,
    ) -> Result<Money> {
        Ok(self
            .aggregate_detailed(lines, target, quotation_date)
            .await?
            .total)
    }

    /// Like [`aggregate`](Self::aggregate), keeping each line's contribution.
    #[instrument(skip(self, lines, target), fields(lines = lines.len(), target = %target))]
    pub async fn aggregate_detailed(
        &self,
        lines: &[PriceResult],
        target: &CurrencyCode,
        quotation_date: NaiveDate,
    ) -> Result<QuotationTotal> {
        let mut total = Money::zero(target.clone());
        let mut contributions = Vec::with_capacity(lines.len());

        for line in lines {
            if !line.is_priced() {
                return Err(PricingError::NoPricingForDate {
                    supplier: line.supplier_type,
                    entity_id: line.entity_id,
                    date: line.date,
                });
            }

            let original = &line.total_price;
            let from = original.currency();
            let conversion = self
                .fx
                .convert_with_rate(original.amount_minor(), from, target, line.date)
                .await?
                .ok_or_else(|| PricingError::MissingExchangeRate {
                    from: from.clone(),
                    to: target.clone(),
                    date: line.date,
                })?;

            let converted = Money::new(conversion.amount_minor, target.clone());
            total = total.checked_add(&converted)?;
            contributions.push(LineContribution {
                entity_id: line.entity_id,
                date: line.date,
                original: original.clone(),
                converted,
                rate: conversion.rate.rate,
                rate_date: conversion.rate.effective_date,
            });
        }

        Ok(QuotationTotal {
            total,
            quotation_date,
            lines: contributions,
        })
    }

    /// Resolve every item concurrently, then total them in `target`.
    #[instrument(skip(self, items, context), fields(items = items.len()))]
    pub async fn price_quotation(
        &self,
        items: &[QuotationLineItem],
        context: &PricingContext,
        target: &CurrencyCode,
    ) -> Result<PricedQuotation> {
        let resolved = join_all(
            items
                .iter()
                .map(|item| self.pricing.resolve_line(item, context)),
        )
        .await;
        let lines = resolved.into_iter().collect::<Result<Vec<_>>>()?;

        let total = self
            .aggregate_detailed(&lines, target, context.date)
            .await?;
        info!("Quotation of {} line(s) totals {}", lines.len(), total.total);

        Ok(PricedQuotation { lines, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PricingCache;
    use crate::fx::NewExchangeRate;
    use crate::pricing::models::{PricingRecord, RecordStatus};
    use crate::pricing::resolver::{PricingIssue, PricingSource};
    use crate::pricing::selectors::{
        DayRate, GuideRates, Selector, SupplierRates, TicketClass, TourRates,
    };
    use crate::store::{InMemoryPricingStore, InMemoryRateStore, PricingRecordStore};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn code(c: &str) -> CurrencyCode {
        CurrencyCode::parse(c).unwrap()
    }

    fn record(entity_id: Uuid, currency: &str, rates: SupplierRates) -> PricingRecord {
        PricingRecord {
            id: Uuid::new_v4(),
            entity_id,
            season_name: "2025".to_string(),
            start_date: d(2025, 1, 1),
            end_date: d(2025, 12, 31),
            currency: code(currency),
            rates,
            status: RecordStatus::Active,
            effective_from: Utc::now(),
            created_by: "ops".to_string(),
        }
    }

    struct Fixture {
        aggregator: QuotationAggregator,
        fx: ExchangeRateResolver,
        tour_id: Uuid,
        guide_id: Uuid,
    }

    /// EUR tour at 50/adult, USD guide at 200/day.
    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryPricingStore::new());
        let tour_id = Uuid::new_v4();
        let guide_id = Uuid::new_v4();
        store
            .insert_record(record(
                tour_id,
                "EUR",
                SupplierRates::Tour(TourRates {
                    adult: dec!(50),
                    child: None,
                }),
            ))
            .await
            .unwrap();
        store
            .insert_record(record(
                guide_id,
                "USD",
                SupplierRates::Guide(GuideRates {
                    full_day: dec!(200),
                    half_day: None,
                    overtime_hour: None,
                }),
            ))
            .await
            .unwrap();

        let fx = ExchangeRateResolver::new(Arc::new(InMemoryRateStore::new()), PricingCache::default());
        let aggregator = QuotationAggregator::new(PricingResolver::new(store), fx.clone());
        Fixture {
            aggregator,
            fx,
            tour_id,
            guide_id,
        }
    }

    async fn add_rate(fx: &ExchangeRateResolver, from: &str, to: &str, rate: Decimal, date: NaiveDate) {
        fx.record_rate(NewExchangeRate {
            from_currency: code(from),
            to_currency: code(to),
            rate,
            effective_date: date,
        })
        .await
        .unwrap();
    }

    fn items(f: &Fixture, date: NaiveDate) -> Vec<QuotationLineItem> {
        vec![
            QuotationLineItem {
                entity_id: f.tour_id,
                date,
                quantity: 2,
                service: Selector::Tour(TicketClass::Adult),
            },
            QuotationLineItem {
                entity_id: f.guide_id,
                date,
                quantity: 2,
                service: Selector::Guide(DayRate::FullDay),
            },
        ]
    }

    #[tokio::test]
    async fn test_missing_rate_fails_whole_total() {
        let f = fixture().await;
        let ctx = PricingContext::new(d(2025, 5, 1), code("EUR"));
        let err = f
            .aggregator
            .price_quotation(&items(&f, d(2025, 5, 1)), &ctx, &code("EUR"))
            .await
            .unwrap_err();

        match err {
            PricingError::MissingExchangeRate { from, to, date } => {
                assert_eq!(from, code("USD"));
                assert_eq!(to, code("EUR"));
                assert_eq!(date, d(2025, 5, 1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_converts_each_line_into_target() {
        let f = fixture().await;
        add_rate(&f.fx, "USD", "EUR", dec!(0.90), d(2025, 1, 1)).await;
        let ctx = PricingContext::new(d(2025, 5, 1), code("EUR"));

        let quote = f
            .aggregator
            .price_quotation(&items(&f, d(2025, 5, 1)), &ctx, &code("EUR"))
            .await
            .unwrap();

        // Tour: 2 x 50 EUR = 100.00 EUR; guide: 200 USD x 0.90 = 180.00 EUR
        assert_eq!(quote.total.total, Money::new(28_000, code("EUR")));
        assert_eq!(quote.lines.len(), 2);

        let guide_line = &quote.total.lines[1];
        assert_eq!(guide_line.original, Money::new(20_000, code("USD")));
        assert_eq!(guide_line.converted, Money::new(18_000, code("EUR")));
        assert_eq!(guide_line.rate, dec!(0.90));
        assert_eq!(guide_line.rate_date, Some(d(2025, 1, 1)));

        let tour_line = &quote.total.lines[0];
        assert_eq!(tour_line.rate, Decimal::ONE);
        assert_eq!(tour_line.rate_date, None);
    }

    #[tokio::test]
    async fn test_lines_convert_at_their_own_date() {
        let f = fixture().await;
        add_rate(&f.fx, "EUR", "USD", dec!(1.10), d(2025, 1, 1)).await;
        add_rate(&f.fx, "EUR", "USD", dec!(1.20), d(2025, 6, 1)).await;
        let ctx = PricingContext::new(d(2025, 3, 1), code("USD"));

        let march = f
            .aggregator
            .pricing
            .resolve_line(&items(&f, d(2025, 3, 1))[0], &ctx)
            .await
            .unwrap();
        let july = f
            .aggregator
            .pricing
            .resolve_line(&items(&f, d(2025, 7, 1))[0], &ctx)
            .await
            .unwrap();

        let total = f
            .aggregator
            .aggregate(&[march, july], &code("USD"), d(2025, 3, 1))
            .await
            .unwrap();
        // 100 EUR x 1.10 + 100 EUR x 1.20
        assert_eq!(total, Money::new(23_000, code("USD")));
    }

    #[tokio::test]
    async fn test_unpriced_line_fails_aggregate() {
        let f = fixture().await;
        let ctx = PricingContext::new(d(2026, 2, 1), code("EUR"));
        let line = f
            .aggregator
            .pricing
            .resolve_line(&items(&f, d(2026, 2, 1))[0], &ctx)
            .await
            .unwrap();
        assert_eq!(line.error, Some(PricingIssue::NoPricingForDate));

        let err = f
            .aggregator
            .aggregate(&[line], &code("EUR"), d(2026, 2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PricingError::NoPricingForDate { .. }));
    }

    #[tokio::test]
    async fn test_empty_quotation_is_zero() {
        let f = fixture().await;
        let total = f
            .aggregator
            .aggregate(&[], &code("TRY"), d(2025, 1, 1))
            .await
            .unwrap();
        assert_eq!(total, Money::zero(code("TRY")));
    }

    #[tokio::test]
    async fn test_same_currency_adds_minor_units() {
        let f = fixture().await;
        let ctx = PricingContext::new(d(2025, 4, 1), code("USD"))
            .with_markup(dec!(20))
            .with_tax(dec!(18));
        let quote = f
            .aggregator
            .price_quotation(&items(&f, d(2025, 4, 1))[1..], &ctx, &code("USD"))
            .await
            .unwrap();
        assert_eq!(quote.lines[0].pricing_source, PricingSource::GuidePricing);
        // 200 x 1.2 x 1.18 = 283.20
        assert_eq!(quote.total.total, Money::new(28_320, code("USD")));
    }
}
