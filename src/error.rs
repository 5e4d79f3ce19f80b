//! Error handling for the pricing engine

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::money::CurrencyCode;
use crate::pricing::models::{ConflictingRecord, SupplierType};
use crate::pricing::responses::PricingErrorResponse;

/// Postgres SQLSTATE for `exclusion_violation`.
const EXCLUSION_VIOLATION: &str = "23P01";

/// Pricing engine error type
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("No {supplier} pricing for entity {entity_id} on {date}")]
    NoPricingForDate {
        supplier: SupplierType,
        entity_id: Uuid,
        date: NaiveDate,
    },

    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch {
        expected: CurrencyCode,
        found: CurrencyCode,
    },

    #[error("No exchange rate {from}->{to} effective on or before {date}")]
    MissingExchangeRate {
        from: CurrencyCode,
        to: CurrencyCode,
        date: NaiveDate,
    },

    #[error("Validity window overlaps {} active record(s)", conflicts.len())]
    OverlapConflict { conflicts: Vec<ConflictingRecord> },

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Invalid exchange rate: {0}")]
    InvalidExchangeRate(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Pricing record {0} not found")]
    RecordNotFound(Uuid),

    #[error("Pricing record {0} is archived")]
    RecordArchived(Uuid),

    #[error("Selector for {selector} cannot price a {record} record")]
    SelectorMismatch {
        selector: SupplierType,
        record: SupplierType,
    },

    #[error("Pricing store unavailable: {0}")]
    StoreUnavailable(String),
}

impl PricingError {
    /// HTTP status the API layer answers with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PricingError::OverlapConflict { .. } | PricingError::RecordArchived(_) => {
                StatusCode::CONFLICT
            }
            PricingError::MissingExchangeRate { .. }
            | PricingError::CurrencyMismatch { .. }
            | PricingError::InvalidExchangeRate(_)
            | PricingError::SelectorMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PricingError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PricingError::NoPricingForDate { .. } | PricingError::RecordNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            PricingError::InvalidDateRange(_) | PricingError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    /// Stable machine-readable tag for the error body.
    pub fn error_type(&self) -> &'static str {
        match self {
            PricingError::NoPricingForDate { .. } => "no_pricing_for_date",
            PricingError::CurrencyMismatch { .. } => "currency_mismatch",
            PricingError::MissingExchangeRate { .. } => "missing_exchange_rate",
            PricingError::OverlapConflict { .. } => "overlap_conflict",
            PricingError::InvalidDateRange(_) => "invalid_date_range",
            PricingError::InvalidExchangeRate(_) => "invalid_exchange_rate",
            PricingError::Validation(_) => "validation",
            PricingError::RecordNotFound(_) => "record_not_found",
            PricingError::RecordArchived(_) => "record_archived",
            PricingError::SelectorMismatch { .. } => "selector_mismatch",
            PricingError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl From<sqlx::Error> for PricingError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(EXCLUSION_VIOLATION) {
                // The constraint does not name the rows it collided with.
                return PricingError::OverlapConflict { conflicts: vec![] };
            }
        }
        PricingError::StoreUnavailable(err.to_string())
    }
}

impl IntoResponse for PricingError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            PricingError::StoreUnavailable(msg) => {
                tracing::error!("Pricing store unavailable: {}", msg);
            }
            PricingError::CurrencyMismatch { .. } => {
                tracing::error!("{}", self);
            }
            _ => tracing::debug!("Pricing request rejected: {}", self),
        }

        let details = match &self {
            PricingError::OverlapConflict { conflicts } => serde_json::to_value(conflicts).ok(),
            PricingError::MissingExchangeRate { from, to, date } => Some(serde_json::json!({
                "from_currency": from,
                "to_currency": to,
                "date": date,
            })),
            _ => None,
        };

        let body = PricingErrorResponse {
            error_type: self.error_type().to_string(),
            message: self.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PricingError>;
