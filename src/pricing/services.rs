//! Pricing record write path.
//!
//! Every write that can change an active window runs validate -> check ->
//! write under a per-entity async mutex, so two concurrent writers for the same
//! `(supplier, entity)` cannot both pass the overlap check. The stores keep
//! their own backstop for writers outside this service.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{PricingError, Result};
use crate::store::PricingRecordStore;

use super::models::{PricingRecord, RecordStatus, SupplierType};
use super::overlap::{validate_window, OverlapValidator};
use super::requests::{parse_currency, parse_price_fields, NewPricingRecord, PatchPricingRecord};
use super::window::{parse_date, DateWindow};

type EntityKey = (SupplierType, Uuid);

#[derive(Clone)]
pub struct PricingRecordService {
    store: Arc<dyn PricingRecordStore>,
    validator: OverlapValidator,
    locks: Arc<DashMap<EntityKey, Arc<Mutex<()>>>>,
}

impl PricingRecordService {
    pub fn new(store: Arc<dyn PricingRecordStore>) -> Self {
        Self {
            validator: OverlapValidator::new(store.clone()),
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Run `work` holding the entity's write lock.
    ///
    /// The map entry is dropped again once no other writer holds or waits on
    /// it, so the map only grows with entities being written concurrently.
    async fn with_entity_lock<T>(
        &self,
        supplier: SupplierType,
        entity_id: Uuid,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let key = (supplier, entity_id);
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let outcome = {
            let _guard = lock.lock().await;
            work.await
        };

        drop(lock);
        self.locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        outcome
    }

    /// Validate and insert a new active record.
    #[instrument(skip(self, request), fields(supplier = %request.supplier_type, entity_id = %request.entity_id))]
    pub async fn create_record(&self, request: NewPricingRecord) -> Result<PricingRecord> {
        let window = validate_window(&request.season_name, &request.start_date, &request.end_date)?;
        let currency = parse_currency(&request.currency)?;
        let rates = parse_price_fields(request.supplier_type, request.price_fields)?;
        if request.created_by.trim().is_empty() {
            return Err(PricingError::Validation(
                "created_by must not be empty".to_string(),
            ));
        }

        let record = PricingRecord {
            id: Uuid::new_v4(),
            entity_id: request.entity_id,
            season_name: request.season_name.trim().to_string(),
            start_date: window.start,
            end_date: window.end,
            currency,
            rates,
            status: RecordStatus::Active,
            effective_from: Utc::now(),
            created_by: request.created_by,
        };

        let (supplier, entity_id) = (record.supplier_type(), record.entity_id);
        let saved = self
            .with_entity_lock(supplier, entity_id, async move {
                self.validator
                    .check_window(supplier, entity_id, window, None)
                    .await?
                    .into_result()?;
                self.store.insert_record(record).await
            })
            .await?;

        info!(
            "Created {} record {} '{}' {}..{}",
            saved.supplier_type(),
            saved.id,
            saved.season_name,
            saved.start_date,
            saved.end_date
        );
        Ok(saved)
    }

    /// Apply a field-by-field patch to an active record.
    ///
    /// Window changes re-run the overlap check against every other active
    /// record of the entity.
    #[instrument(skip(self, patch))]
    pub async fn patch_record(&self, id: Uuid, patch: PatchPricingRecord) -> Result<PricingRecord> {
        let current = self.get_active(id).await?;

        let saved = self
            .with_entity_lock(current.supplier_type(), current.entity_id, async move {
                // Re-read under the lock; a concurrent writer may have archived it.
                let record = self.get_active(id).await?;
                let record = self.apply_patch(record, &patch).await?;
                self.store.update_record(record).await
            })
            .await?;

        info!("Patched {} record {}", saved.supplier_type(), saved.id);
        Ok(saved)
    }

    async fn apply_patch(
        &self,
        mut record: PricingRecord,
        patch: &PatchPricingRecord,
    ) -> Result<PricingRecord> {
        if let Some(season_name) = &patch.season_name {
            if season_name.trim().is_empty() {
                return Err(PricingError::Validation(
                    "season_name must not be empty".to_string(),
                ));
            }
            record.season_name = season_name.trim().to_string();
        }
        if let Some(currency) = &patch.currency {
            record.currency = parse_currency(currency)?;
        }
        if let Some(price_fields) = patch.price_fields.clone() {
            record.rates = parse_price_fields(record.supplier_type(), price_fields)?;
        }

        if patch.changes_window() {
            let start = match &patch.start_date {
                Some(s) => parse_date(s)?,
                None => record.start_date,
            };
            let end = match &patch.end_date {
                Some(s) => parse_date(s)?,
                None => record.end_date,
            };
            let window = DateWindow::new(start, end)?;

            self.validator
                .check_window(record.supplier_type(), record.entity_id, window, Some(record.id))
                .await?
                .into_result()?;

            record.start_date = window.start;
            record.end_date = window.end;
        }

        record.effective_from = Utc::now();
        Ok(record)
    }

    /// Retire a record. Archiving an archived record is a no-op.
    #[instrument(skip(self))]
    pub async fn archive_record(&self, id: Uuid) -> Result<PricingRecord> {
        let current = self.get_record(id).await?;
        if !current.is_active() {
            return Ok(current);
        }

        let saved = self
            .with_entity_lock(current.supplier_type(), current.entity_id, async move {
                // Re-read under the lock so a patch that just landed is kept.
                let record = self.get_record(id).await?;
                if !record.is_active() {
                    return Ok(record);
                }
                let archived = PricingRecord {
                    status: RecordStatus::Archived,
                    ..record
                };
                self.store.update_record(archived).await
            })
            .await?;

        info!("Archived {} record {}", saved.supplier_type(), saved.id);
        Ok(saved)
    }

    pub async fn get_record(&self, id: Uuid) -> Result<PricingRecord> {
        self.store
            .get_record(id)
            .await?
            .ok_or(PricingError::RecordNotFound(id))
    }

    /// Active records of an entity, ordered by start date.
    pub async fn list_records(
        &self,
        supplier: SupplierType,
        entity_id: Uuid,
    ) -> Result<Vec<PricingRecord>> {
        self.store
            .list_active_records_for_entity(supplier, entity_id)
            .await
    }

    async fn get_active(&self, id: Uuid) -> Result<PricingRecord> {
        let record = self.get_record(id).await?;
        if !record.is_active() {
            return Err(PricingError::RecordArchived(id));
        }
        Ok(record)
    }
}
