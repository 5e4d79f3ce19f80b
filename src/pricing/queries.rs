//! Database queries for pricing records.
//!
//! Every read filters on `status` explicitly; archived rows are only reachable
//! by id.

use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{PricingError, Result};

use super::models::{PricingRecord, PricingRecordRow, SupplierType};

const RECORD_COLUMNS: &str = r#"
    id, entity_id, supplier_type, season_name,
    start_date, end_date, currency, price_fields,
    status, effective_from, created_by
"#;

/// Active records of an entity whose window covers `date`
pub async fn find_active_records_covering(
    pool: &PgPool,
    supplier: SupplierType,
    entity_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<PricingRecordRow>> {
    let rows = sqlx::query_as::<_, PricingRecordRow>(&format!(
        r#"
        SELECT {RECORD_COLUMNS}
        FROM pricing_records
        WHERE supplier_type = $1
          AND entity_id = $2
          AND status = 'active'
          AND start_date <= $3
          AND end_date >= $3
        ORDER BY effective_from DESC
        "#
    ))
    .bind(supplier.as_str())
    .bind(entity_id)
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All active records of an entity
pub async fn list_active_records(
    pool: &PgPool,
    supplier: SupplierType,
    entity_id: Uuid,
) -> Result<Vec<PricingRecordRow>> {
    let rows = sqlx::query_as::<_, PricingRecordRow>(&format!(
        r#"
        SELECT {RECORD_COLUMNS}
        FROM pricing_records
        WHERE supplier_type = $1
          AND entity_id = $2
          AND status = 'active'
        ORDER BY start_date, end_date
        "#
    ))
    .bind(supplier.as_str())
    .bind(entity_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Get a record by id, any status
pub async fn get_record(pool: &PgPool, id: Uuid) -> Result<Option<PricingRecordRow>> {
    let row = sqlx::query_as::<_, PricingRecordRow>(&format!(
        r#"
        SELECT {RECORD_COLUMNS}
        FROM pricing_records
        WHERE id = $1
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert a new record. The table's exclusion constraint rejects
/// overlapping active windows.
pub async fn insert_record(pool: &PgPool, record: &PricingRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pricing_records (
            id, entity_id, supplier_type, season_name,
            start_date, end_date, currency, price_fields,
            status, effective_from, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(record.id)
    .bind(record.entity_id)
    .bind(record.supplier_type().as_str())
    .bind(&record.season_name)
    .bind(record.start_date)
    .bind(record.end_date)
    .bind(record.currency.as_str())
    .bind(Json(price_fields_json(record)?))
    .bind(record.status.as_str())
    .bind(record.effective_from)
    .bind(&record.created_by)
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite the mutable columns of a record
pub async fn update_record(pool: &PgPool, record: &PricingRecord) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE pricing_records
        SET season_name = $2,
            start_date = $3,
            end_date = $4,
            currency = $5,
            price_fields = $6,
            status = $7,
            effective_from = $8
        WHERE id = $1
        "#,
    )
    .bind(record.id)
    .bind(&record.season_name)
    .bind(record.start_date)
    .bind(record.end_date)
    .bind(record.currency.as_str())
    .bind(Json(price_fields_json(record)?))
    .bind(record.status.as_str())
    .bind(record.effective_from)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PricingError::RecordNotFound(record.id));
    }

    Ok(())
}

fn price_fields_json(record: &PricingRecord) -> Result<serde_json::Value> {
    record.rates.to_json().map_err(|e| {
        PricingError::Validation(format!(
            "Price fields of record {} cannot be stored: {}",
            record.id, e
        ))
    })
}

/// Convert fetched rows into typed records
pub fn rows_to_records(rows: Vec<PricingRecordRow>) -> Result<Vec<PricingRecord>> {
    rows.into_iter().map(PricingRecord::try_from).collect()
}
