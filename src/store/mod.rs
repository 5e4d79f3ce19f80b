//! Persistence interfaces consumed by the engine.
//!
//! Every read path returns active records only; archived records are kept for
//! audit and never participate in resolution or overlap checks.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::fx::ExchangeRate;
use crate::money::CurrencyCode;
use crate::pricing::models::{PricingRecord, SupplierType};

pub use memory::{InMemoryPricingStore, InMemoryRateStore};
pub use postgres::PgPricingStore;

/// Season-scoped pricing records, per supplier type.
#[async_trait]
pub trait PricingRecordStore: Send + Sync {
    /// Active records of the entity whose window covers `date`.
    async fn active_records_covering(
        &self,
        supplier: SupplierType,
        entity_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<PricingRecord>>;

    /// All active records of the entity, ordered by start date.
    async fn list_active_records_for_entity(
        &self,
        supplier: SupplierType,
        entity_id: Uuid,
    ) -> Result<Vec<PricingRecord>>;

    /// Fetch a record regardless of status.
    async fn get_record(&self, id: Uuid) -> Result<Option<PricingRecord>>;

    async fn insert_record(&self, record: PricingRecord) -> Result<PricingRecord>;

    async fn update_record(&self, record: PricingRecord) -> Result<PricingRecord>;

    /// The single authoritative record for `date`, if any.
    async fn find_active_record_covering_date(
        &self,
        supplier: SupplierType,
        entity_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<PricingRecord>> {
        let candidates = self
            .active_records_covering(supplier, entity_id, date)
            .await?;
        Ok(select_covering_record(candidates, supplier, entity_id, date))
    }
}

/// Exchange-rate history. Append-only.
#[async_trait]
pub trait RateHistoryStore: Send + Sync {
    /// Rate for the pair with the greatest `effective_date <= date`.
    async fn latest_rate_on_or_before(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>>;

    /// Full history of a pair, oldest first.
    async fn list_rates_for_pair(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Vec<ExchangeRate>>;

    async fn insert_rate(&self, rate: ExchangeRate) -> Result<ExchangeRate>;
}

/// Pick one record among those covering a date.
///
/// More than one candidate means the active-window invariant was broken in
/// storage. The read still succeeds with the latest `effective_from`.
pub fn select_covering_record(
    candidates: Vec<PricingRecord>,
    supplier: SupplierType,
    entity_id: Uuid,
    date: NaiveDate,
) -> Option<PricingRecord> {
    if candidates.len() > 1 {
        let ids: Vec<String> = candidates.iter().map(|r| r.id.to_string()).collect();
        warn!(
            %supplier,
            %entity_id,
            %date,
            records = %ids.join(","),
            "Inconsistent pricing calendar: {} active records cover the same date",
            candidates.len()
        );
    }

    candidates
        .into_iter()
        .filter(|r| r.covers(date))
        .max_by_key(|r| r.effective_from)
}
