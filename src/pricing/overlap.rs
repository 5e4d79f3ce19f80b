//! Validity-window conflict detection for pricing writes.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{PricingError, Result};
use crate::store::PricingRecordStore;

use super::models::{ConflictingRecord, SupplierType};
use super::window::DateWindow;

/// Outcome of an overlap check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapResult {
    pub overlaps: bool,
    pub conflicts: Vec<ConflictingRecord>,
}

impl OverlapResult {
    fn from_conflicts(conflicts: Vec<ConflictingRecord>) -> Self {
        Self {
            overlaps: !conflicts.is_empty(),
            conflicts,
        }
    }

    /// `Err(OverlapConflict)` when any active record collides.
    pub fn into_result(self) -> Result<()> {
        if self.overlaps {
            Err(PricingError::OverlapConflict {
                conflicts: self.conflicts,
            })
        } else {
            Ok(())
        }
    }
}

/// Validate the header of a candidate record: non-empty season name and a
/// well-formed `[start, end]` window given as `YYYY-MM-DD` strings.
pub fn validate_window(season_name: &str, start: &str, end: &str) -> Result<DateWindow> {
    if season_name.trim().is_empty() {
        return Err(PricingError::Validation(
            "season_name must not be empty".to_string(),
        ));
    }
    DateWindow::parse(start, end)
}

#[derive(Clone)]
pub struct OverlapValidator {
    store: Arc<dyn PricingRecordStore>,
}

impl OverlapValidator {
    pub fn new(store: Arc<dyn PricingRecordStore>) -> Self {
        Self { store }
    }

    /// Check a candidate window against every active record of the entity,
    /// skipping `exclude_id` (the record being updated).
    pub async fn check_overlap(
        &self,
        supplier: SupplierType,
        entity_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<Uuid>,
    ) -> Result<OverlapResult> {
        let candidate = DateWindow::new(start, end)?;
        self.check_window(supplier, entity_id, candidate, exclude_id)
            .await
    }

    pub async fn check_window(
        &self,
        supplier: SupplierType,
        entity_id: Uuid,
        candidate: DateWindow,
        exclude_id: Option<Uuid>,
    ) -> Result<OverlapResult> {
        let existing = self
            .store
            .list_active_records_for_entity(supplier, entity_id)
            .await?;

        let conflicts: Vec<ConflictingRecord> = existing
            .iter()
            .filter(|r| Some(r.id) != exclude_id && r.is_active())
            .filter(|r| candidate.overlaps(&r.window()))
            .map(|r| r.to_conflict())
            .collect();

        if !conflicts.is_empty() {
            debug!(
                %supplier,
                %entity_id,
                "Window {}..{} overlaps {} active record(s)",
                candidate.start,
                candidate.end,
                conflicts.len()
            );
        }

        Ok(OverlapResult::from_conflicts(conflicts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::CurrencyCode;
    use crate::pricing::models::{PricingRecord, RecordStatus};
    use crate::pricing::selectors::{SupplierRates, TransferRates};
    use crate::store::InMemoryPricingStore;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn transfer(entity_id: Uuid, season: &str, start: NaiveDate, end: NaiveDate) -> PricingRecord {
        PricingRecord {
            id: Uuid::new_v4(),
            entity_id,
            season_name: season.to_string(),
            start_date: start,
            end_date: end,
            currency: CurrencyCode::parse("EUR").unwrap(),
            rates: SupplierRates::Transfer(TransferRates {
                per_vehicle: dec!(80),
                per_person: Some(dec!(15)),
            }),
            status: RecordStatus::Active,
            effective_from: Utc::now(),
            created_by: "ops".to_string(),
        }
    }

    /// Entity with a single June-August record.
    async fn summer_fixture() -> (OverlapValidator, Arc<InMemoryPricingStore>, Uuid, PricingRecord) {
        let store = Arc::new(InMemoryPricingStore::new());
        let entity_id = Uuid::new_v4();
        let summer = transfer(entity_id, "Summer", d(2025, 6, 1), d(2025, 8, 31));
        store.insert_record(summer.clone()).await.unwrap();
        (OverlapValidator::new(store.clone()), store, entity_id, summer)
    }

    async fn check(
        validator: &OverlapValidator,
        entity_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> OverlapResult {
        validator
            .check_overlap(SupplierType::Transfer, entity_id, start, end, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_overlap_cases() {
        let (validator, _, entity_id, summer) = summer_fixture().await;
        let v = &validator;

        // Starts inside
        let r = check(v, entity_id, d(2025, 8, 15), d(2025, 9, 15)).await;
        assert!(r.overlaps);
        assert_eq!(r.conflicts[0].id, summer.id);
        assert_eq!(r.conflicts[0].season_name, "Summer");

        // Ends inside
        assert!(check(v, entity_id, d(2025, 5, 1), d(2025, 6, 1)).await.overlaps);
        // Contains existing
        assert!(check(v, entity_id, d(2025, 1, 1), d(2025, 12, 31)).await.overlaps);
        // Contained by existing
        assert!(check(v, entity_id, d(2025, 7, 1), d(2025, 7, 2)).await.overlaps);
        // Single shared day at the boundary
        assert!(check(v, entity_id, d(2025, 8, 31), d(2025, 8, 31)).await.overlaps);

        // Disjoint neighbours
        let before = check(v, entity_id, d(2025, 1, 1), d(2025, 5, 31)).await;
        assert!(!before.overlaps);
        assert!(before.conflicts.is_empty());
        assert!(!check(v, entity_id, d(2025, 9, 1), d(2025, 10, 31)).await.overlaps);
    }

    #[tokio::test]
    async fn test_exclude_self_on_update() {
        let (validator, _, entity_id, summer) = summer_fixture().await;
        let r = validator
            .check_overlap(
                SupplierType::Transfer,
                entity_id,
                d(2025, 5, 15),
                d(2025, 9, 15),
                Some(summer.id),
            )
            .await
            .unwrap();
        assert!(!r.overlaps);

        // Unchanged window
        let same = validator
            .check_overlap(
                SupplierType::Transfer,
                entity_id,
                summer.start_date,
                summer.end_date,
                Some(summer.id),
            )
            .await
            .unwrap();
        assert!(!same.overlaps);
        assert!(same.conflicts.is_empty());

        // Without the exclusion the record conflicts with itself
        let unexcluded = check(&validator, entity_id, summer.start_date, summer.end_date).await;
        assert_eq!(unexcluded.conflicts[0].id, summer.id);
    }

    #[tokio::test]
    async fn test_archived_and_other_entities_ignored() {
        let (validator, store, entity_id, summer) = summer_fixture().await;

        // Same window, another entity
        let other = transfer(Uuid::new_v4(), "Summer", d(2025, 6, 1), d(2025, 8, 31));
        store.insert_record(other).await.unwrap();

        let archived = PricingRecord {
            status: RecordStatus::Archived,
            ..summer
        };
        store.update_record(archived).await.unwrap();

        let r = validator
            .check_overlap(SupplierType::Transfer, entity_id, d(2025, 7, 1), d(2025, 7, 31), None)
            .await
            .unwrap();
        assert!(!r.overlaps);
    }

    #[tokio::test]
    async fn test_other_supplier_type_ignored() {
        let (validator, _, entity_id, _) = summer_fixture().await;
        let r = validator
            .check_overlap(SupplierType::Vehicle, entity_id, d(2025, 7, 1), d(2025, 7, 31), None)
            .await
            .unwrap();
        assert!(!r.overlaps);
    }

    #[tokio::test]
    async fn test_inverted_window_rejected() {
        let (validator, _, entity_id, _) = summer_fixture().await;
        let err = validator
            .check_overlap(SupplierType::Transfer, entity_id, d(2025, 9, 1), d(2025, 8, 1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PricingError::InvalidDateRange(_)));
    }

    #[tokio::test]
    async fn test_into_result_carries_conflicts() {
        let (validator, _, entity_id, summer) = summer_fixture().await;
        let err = validator
            .check_overlap(SupplierType::Transfer, entity_id, d(2025, 8, 1), d(2025, 9, 1), None)
            .await
            .unwrap()
            .into_result()
            .unwrap_err();
        match err {
            PricingError::OverlapConflict { conflicts } => {
                assert_eq!(conflicts, vec![summer.to_conflict()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_window() {
        assert!(validate_window("High season", "2025-06-01", "2025-08-31").is_ok());
        assert!(matches!(
            validate_window("  ", "2025-06-01", "2025-08-31"),
            Err(PricingError::Validation(_))
        ));
        assert!(matches!(
            validate_window("High", "2025-02-30", "2025-08-31"),
            Err(PricingError::InvalidDateRange(_))
        ));
        assert!(matches!(
            validate_window("High", "2025-09-01", "2025-08-31"),
            Err(PricingError::InvalidDateRange(_))
        ));
    }
}
