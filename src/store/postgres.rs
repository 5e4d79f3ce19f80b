//! PostgreSQL-backed stores.
//!
//! Schema lives in `migrations/`. The `pricing_records` table carries an
//! exclusion constraint on active windows per entity; a violation surfaces as
//! `PricingError::OverlapConflict`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::queries as rate_queries;
use crate::error::Result;
use crate::fx::ExchangeRate;
use crate::money::CurrencyCode;
use crate::pricing::models::{PricingRecord, SupplierType};
use crate::pricing::queries;

use super::{PricingRecordStore, RateHistoryStore};

#[derive(Clone)]
pub struct PgPricingStore {
    pool: PgPool,
}

impl PgPricingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PricingRecordStore for PgPricingStore {
    async fn active_records_covering(
        &self,
        supplier: SupplierType,
        entity_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<PricingRecord>> {
        let rows =
            queries::find_active_records_covering(&self.pool, supplier, entity_id, date).await?;
        queries::rows_to_records(rows)
    }

    async fn list_active_records_for_entity(
        &self,
        supplier: SupplierType,
        entity_id: Uuid,
    ) -> Result<Vec<PricingRecord>> {
        let rows = queries::list_active_records(&self.pool, supplier, entity_id).await?;
        queries::rows_to_records(rows)
    }

    async fn get_record(&self, id: Uuid) -> Result<Option<PricingRecord>> {
        queries::get_record(&self.pool, id)
            .await?
            .map(PricingRecord::try_from)
            .transpose()
    }

    async fn insert_record(&self, record: PricingRecord) -> Result<PricingRecord> {
        queries::insert_record(&self.pool, &record).await?;
        Ok(record)
    }

    async fn update_record(&self, record: PricingRecord) -> Result<PricingRecord> {
        queries::update_record(&self.pool, &record).await?;
        Ok(record)
    }
}

#[async_trait]
impl RateHistoryStore for PgPricingStore {
    async fn latest_rate_on_or_before(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>> {
        rate_queries::find_latest_rate_on_or_before(&self.pool, from, to, date)
            .await?
            .map(ExchangeRate::try_from)
            .transpose()
    }

    async fn list_rates_for_pair(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Vec<ExchangeRate>> {
        let rows = rate_queries::get_rates_for_pair(&self.pool, from, to).await?;
        rate_queries::rows_to_rates(rows)
    }

    async fn insert_rate(&self, rate: ExchangeRate) -> Result<ExchangeRate> {
        rate_queries::insert_exchange_rate(&self.pool, &rate).await?;
        Ok(rate)
    }
}
