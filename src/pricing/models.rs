//! Pricing record models.
//!
//! `PricingRecordRow` uses sqlx's FromRow derive for direct database
//! deserialization and is converted into the typed `PricingRecord`.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{PricingError, Result};
use crate::money::CurrencyCode;

use super::selectors::SupplierRates;
use super::window::DateWindow;

/// Supplier catalog a pricing record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplierType {
    Hotel,
    Guide,
    Vehicle,
    Tour,
    EntranceFee,
    Transfer,
    Restaurant,
}

impl SupplierType {
    pub const ALL: [SupplierType; 7] = [
        SupplierType::Hotel,
        SupplierType::Guide,
        SupplierType::Vehicle,
        SupplierType::Tour,
        SupplierType::EntranceFee,
        SupplierType::Transfer,
        SupplierType::Restaurant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierType::Hotel => "hotel",
            SupplierType::Guide => "guide",
            SupplierType::Vehicle => "vehicle",
            SupplierType::Tour => "tour",
            SupplierType::EntranceFee => "entrance_fee",
            SupplierType::Transfer => "transfer",
            SupplierType::Restaurant => "restaurant",
        }
    }
}

impl fmt::Display for SupplierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SupplierType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        SupplierType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| PricingError::Validation(format!("Unknown supplier type: '{}'", s)))
    }
}

/// Record status. Archived is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Active,
    Archived,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Archived => "archived",
        }
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(RecordStatus::Active),
            "archived" => Ok(RecordStatus::Archived),
            other => Err(PricingError::Validation(format!(
                "Unknown record status: '{}'",
                other
            ))),
        }
    }
}

/// Season-scoped price set for one supplier entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRecord {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub season_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub currency: CurrencyCode,
    #[serde(flatten)]
    pub rates: SupplierRates,
    pub status: RecordStatus,
    pub effective_from: DateTime<Utc>,
    pub created_by: String,
}

impl PricingRecord {
    pub fn supplier_type(&self) -> SupplierType {
        self.rates.supplier_type()
    }

    pub fn window(&self) -> DateWindow {
        DateWindow::from_bounds(self.start_date, self.end_date)
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    /// Check if this record is the authoritative price on `date`
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.is_active() && self.window().contains(date)
    }

    pub fn to_conflict(&self) -> ConflictingRecord {
        ConflictingRecord {
            id: self.id,
            season_name: self.season_name.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Existing record a candidate window collided with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingRecord {
    pub id: Uuid,
    pub season_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Row from pricing_records
#[derive(Debug, Clone, FromRow)]
pub struct PricingRecordRow {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub supplier_type: String,
    pub season_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub currency: String,
    pub price_fields: Json<serde_json::Value>,
    pub status: String,
    pub effective_from: DateTime<Utc>,
    pub created_by: String,
}

impl TryFrom<PricingRecordRow> for PricingRecord {
    type Error = PricingError;

    fn try_from(row: PricingRecordRow) -> Result<Self> {
        let supplier: SupplierType = row.supplier_type.parse()?;
        let rates = SupplierRates::from_json(supplier, row.price_fields.0).map_err(|e| {
            PricingError::StoreUnavailable(format!(
                "Pricing record {} has unreadable price fields: {}",
                row.id, e
            ))
        })?;

        Ok(PricingRecord {
            id: row.id,
            entity_id: row.entity_id,
            season_name: row.season_name,
            start_date: row.start_date,
            end_date: row.end_date,
            currency: CurrencyCode::parse(&row.currency)?,
            rates,
            status: row.status.parse()?,
            effective_from: row.effective_from,
            created_by: row.created_by,
        })
    }
}
