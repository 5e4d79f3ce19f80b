//! In-process stores.
//!
//! Used for embedded deployments and tests. The pricing store re-validates
//! the active-window invariant under its write lock, so it rejects
//! conflicting writes even when a caller skipped the overlap check.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{PricingError, Result};
use crate::fx::ExchangeRate;
use crate::money::CurrencyCode;
use crate::pricing::models::{PricingRecord, SupplierType};

use super::{PricingRecordStore, RateHistoryStore};

fn poisoned<E: std::fmt::Display>(e: E) -> PricingError {
    PricingError::StoreUnavailable(format!("store lock poisoned: {}", e))
}

#[derive(Default)]
pub struct InMemoryPricingStore {
    records: RwLock<HashMap<Uuid, PricingRecord>>,
}

impl InMemoryPricingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_no_conflict(
        records: &HashMap<Uuid, PricingRecord>,
        candidate: &PricingRecord,
    ) -> Result<()> {
        if !candidate.is_active() {
            return Ok(());
        }

        let window = candidate.window();
        let conflicts: Vec<_> = records
            .values()
            .filter(|r| {
                r.id != candidate.id
                    && r.is_active()
                    && r.entity_id == candidate.entity_id
                    && r.supplier_type() == candidate.supplier_type()
                    && window.overlaps(&r.window())
            })
            .map(PricingRecord::to_conflict)
            .collect();

        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(PricingError::OverlapConflict { conflicts })
        }
    }
}

#[async_trait]
impl PricingRecordStore for InMemoryPricingStore {
    async fn active_records_covering(
        &self,
        supplier: SupplierType,
        entity_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<PricingRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .values()
            .filter(|r| {
                r.entity_id == entity_id && r.supplier_type() == supplier && r.covers(date)
            })
            .cloned()
            .collect())
    }

    async fn list_active_records_for_entity(
        &self,
        supplier: SupplierType,
        entity_id: Uuid,
    ) -> Result<Vec<PricingRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut active: Vec<PricingRecord> = records
            .values()
            .filter(|r| r.entity_id == entity_id && r.supplier_type() == supplier && r.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|r| (r.start_date, r.end_date));
        Ok(active)
    }

    async fn get_record(&self, id: Uuid) -> Result<Option<PricingRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(&id).cloned())
    }

    async fn insert_record(&self, record: PricingRecord) -> Result<PricingRecord> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.contains_key(&record.id) {
            return Err(PricingError::Validation(format!(
                "Pricing record {} already exists",
                record.id
            )));
        }
        Self::ensure_no_conflict(&records, &record)?;
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_record(&self, record: PricingRecord) -> Result<PricingRecord> {
        let mut records = self.records.write().map_err(poisoned)?;
        if !records.contains_key(&record.id) {
            return Err(PricingError::RecordNotFound(record.id));
        }
        Self::ensure_no_conflict(&records, &record)?;
        records.insert(record.id, record.clone());
        Ok(record)
    }
}

type PairKey = (CurrencyCode, CurrencyCode);

/// Rate history keyed by pair, each pair a date-ordered series.
#[derive(Default)]
pub struct InMemoryRateStore {
    rates: RwLock<HashMap<PairKey, BTreeMap<NaiveDate, ExchangeRate>>>,
}

impl InMemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateHistoryStore for InMemoryRateStore {
    async fn latest_rate_on_or_before(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>> {
        let rates = self.rates.read().map_err(poisoned)?;
        let key = (from.clone(), to.clone());
        Ok(rates
            .get(&key)
            .and_then(|history| history.range(..=date).next_back())
            .map(|(_, rate)| rate.clone()))
    }

    async fn list_rates_for_pair(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Vec<ExchangeRate>> {
        let rates = self.rates.read().map_err(poisoned)?;
        let key = (from.clone(), to.clone());
        Ok(rates
            .get(&key)
            .map(|history| history.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_rate(&self, rate: ExchangeRate) -> Result<ExchangeRate> {
        let mut rates = self.rates.write().map_err(poisoned)?;
        let history = rates
            .entry((rate.from_currency.clone(), rate.to_currency.clone()))
            .or_default();
        if history.contains_key(&rate.effective_date) {
            return Err(PricingError::Validation(format!(
                "A {}->{} rate effective {} is already recorded",
                rate.from_currency, rate.to_currency, rate.effective_date
            )));
        }
        history.insert(rate.effective_date, rate.clone());
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::models::RecordStatus;
    use crate::pricing::selectors::{SupplierRates, VehicleRates};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn vehicle_record(entity_id: Uuid, start: NaiveDate, end: NaiveDate) -> PricingRecord {
        PricingRecord {
            id: Uuid::new_v4(),
            entity_id,
            season_name: "High season".to_string(),
            start_date: start,
            end_date: end,
            currency: CurrencyCode::parse("EUR").unwrap(),
            rates: SupplierRates::Vehicle(VehicleRates {
                full_day: dec!(220),
                half_day: Some(dec!(140)),
                airport_transfer: None,
            }),
            status: RecordStatus::Active,
            effective_from: Utc::now(),
            created_by: "ops".to_string(),
        }
    }

    fn rate(from: &str, to: &str, rate: Decimal, date: NaiveDate) -> ExchangeRate {
        ExchangeRate {
            id: Uuid::new_v4(),
            from_currency: CurrencyCode::parse(from).unwrap(),
            to_currency: CurrencyCode::parse(to).unwrap(),
            rate,
            effective_date: date,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_overlapping_active_window() {
        let store = InMemoryPricingStore::new();
        let entity = Uuid::new_v4();
        let first = store
            .insert_record(vehicle_record(entity, d(2025, 6, 1), d(2025, 8, 31)))
            .await
            .unwrap();

        let err = store
            .insert_record(vehicle_record(entity, d(2025, 8, 1), d(2025, 9, 30)))
            .await
            .unwrap_err();
        match err {
            PricingError::OverlapConflict { conflicts } => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].id, first.id);
            }
            other => panic!("expected overlap conflict, got {other:?}"),
        }

        // Other entities are unaffected
        store
            .insert_record(vehicle_record(Uuid::new_v4(), d(2025, 8, 1), d(2025, 9, 30)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_archived_records_are_invisible_to_reads() {
        let store = InMemoryPricingStore::new();
        let entity = Uuid::new_v4();
        let mut rec = store
            .insert_record(vehicle_record(entity, d(2025, 6, 1), d(2025, 8, 31)))
            .await
            .unwrap();

        rec.status = RecordStatus::Archived;
        store.update_record(rec.clone()).await.unwrap();

        let covering = store
            .active_records_covering(SupplierType::Vehicle, entity, d(2025, 7, 1))
            .await
            .unwrap();
        assert!(covering.is_empty());
        let listed = store
            .list_active_records_for_entity(SupplierType::Vehicle, entity)
            .await
            .unwrap();
        assert!(listed.is_empty());
        // Still retrievable for audit
        assert!(store.get_record(rec.id).await.unwrap().is_some());

        // And its window is free again
        store
            .insert_record(vehicle_record(entity, d(2025, 6, 1), d(2025, 8, 31)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = InMemoryPricingStore::new();
        let rec = vehicle_record(Uuid::new_v4(), d(2025, 6, 1), d(2025, 8, 31));
        assert!(matches!(
            store.update_record(rec).await,
            Err(PricingError::RecordNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_latest_rate_on_or_before() {
        let store = InMemoryRateStore::new();
        let usd = CurrencyCode::parse("USD").unwrap();
        let eur = CurrencyCode::parse("EUR").unwrap();
        store
            .insert_rate(rate("USD", "EUR", dec!(0.95), d(2025, 6, 1)))
            .await
            .unwrap();
        store
            .insert_rate(rate("USD", "EUR", dec!(0.90), d(2025, 1, 1)))
            .await
            .unwrap();

        let march = store
            .latest_rate_on_or_before(&usd, &eur, d(2025, 3, 15))
            .await
            .unwrap();
        assert_eq!(march.unwrap().rate, dec!(0.90));
        let june = store
            .latest_rate_on_or_before(&usd, &eur, d(2025, 6, 1))
            .await
            .unwrap();
        assert_eq!(june.unwrap().rate, dec!(0.95));
        assert!(store
            .latest_rate_on_or_before(&usd, &eur, d(2024, 12, 31))
            .await
            .unwrap()
            .is_none());

        // Pairs are directional
        assert!(store
            .latest_rate_on_or_before(&eur, &usd, d(2025, 7, 1))
            .await
            .unwrap()
            .is_none());

        let history = store.list_rates_for_pair(&usd, &eur).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].effective_date, d(2025, 1, 1));
    }

    #[tokio::test]
    async fn test_duplicate_rate_date_rejected() {
        let store = InMemoryRateStore::new();
        store
            .insert_rate(rate("USD", "EUR", dec!(0.90), d(2025, 1, 1)))
            .await
            .unwrap();
        assert!(matches!(
            store
                .insert_rate(rate("USD", "EUR", dec!(0.91), d(2025, 1, 1)))
                .await,
            Err(PricingError::Validation(_))
        ));
    }
}
