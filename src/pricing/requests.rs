//! Request DTOs for the pricing API.

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{PricingError, Result};
use crate::money::CurrencyCode;

use super::models::SupplierType;
use super::resolver::{PricingContext, QuotationLineItem};
use super::selectors::{Selector, SupplierRates};

/// Request to create a season-scoped pricing record
#[derive(Debug, Clone, Deserialize)]
pub struct NewPricingRecord {
    pub entity_id: Uuid,
    pub supplier_type: SupplierType,
    pub season_name: String,
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `YYYY-MM-DD`, inclusive
    pub end_date: String,
    pub currency: String,
    pub price_fields: serde_json::Value,
    pub created_by: String,
}

/// Field-by-field update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchPricingRecord {
    #[serde(default)]
    pub season_name: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub price_fields: Option<serde_json::Value>,
}

impl PatchPricingRecord {
    pub fn changes_window(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

/// Parse and validate submitted price fields for a supplier type.
pub fn parse_price_fields(
    supplier: SupplierType,
    price_fields: serde_json::Value,
) -> Result<SupplierRates> {
    let rates = SupplierRates::from_json(supplier, price_fields).map_err(|e| {
        PricingError::Validation(format!("Invalid {} price fields: {}", supplier, e))
    })?;
    rates.validate()?;
    Ok(rates)
}

/// Parse a submitted currency code
pub fn parse_currency(code: &str) -> Result<CurrencyCode> {
    CurrencyCode::parse(code)
}

/// Request to price a single service
#[derive(Debug, Clone, Deserialize)]
pub struct PriceRequest {
    pub entity_id: Uuid,
    pub date: NaiveDate,
    pub service: Selector,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub context: PricingContext,
}

fn default_quantity() -> u32 {
    1
}

/// Request to price and total a whole quotation
#[derive(Debug, Clone, Deserialize)]
pub struct QuotationRequest {
    pub items: Vec<QuotationLineItem>,
    pub context: PricingContext,
    /// Defaults to the context currency.
    #[serde(default)]
    pub target_currency: Option<CurrencyCode>,
}

impl QuotationRequest {
    pub fn target_currency(&self) -> &CurrencyCode {
        self.target_currency
            .as_ref()
            .unwrap_or(&self.context.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::selectors::{MealPlan, RoomType};

    #[test]
    fn test_price_request_from_json() {
        let req: PriceRequest = serde_json::from_value(serde_json::json!({
            "entity_id": "6f1c2a8e-0b7d-4a53-9d1e-1c2b3a4d5e6f",
            "date": "2025-07-10",
            "service": {"service_type": "hotel", "selector": {"room": "double", "meal_plan": "HB"}},
            "context": {"date": "2025-07-01", "currency": "usd", "markup_percent": "20"}
        }))
        .unwrap();

        assert_eq!(req.quantity, 1);
        assert_eq!(
            req.service,
            Selector::Hotel {
                room: RoomType::Double,
                meal_plan: MealPlan::HB
            }
        );
        assert_eq!(req.context.currency.as_str(), "USD");
        assert!(!req.context.respect_locked);
    }

    #[test]
    fn test_quotation_target_defaults_to_context_currency() {
        let req: QuotationRequest = serde_json::from_value(serde_json::json!({
            "items": [],
            "context": {"date": "2025-07-01", "currency": "EUR"}
        }))
        .unwrap();
        assert_eq!(req.target_currency().as_str(), "EUR");
    }

    #[test]
    fn test_parse_price_fields_validates() {
        let ok = parse_price_fields(
            SupplierType::Vehicle,
            serde_json::json!({"full_day": "120", "airport_transfer": "45"}),
        );
        assert!(ok.is_ok());

        let missing = parse_price_fields(SupplierType::Vehicle, serde_json::json!({"half_day": "60"}));
        assert!(matches!(missing, Err(PricingError::Validation(_))));

        let negative = parse_price_fields(SupplierType::Tour, serde_json::json!({"adult": "-1"}));
        assert!(matches!(negative, Err(PricingError::Validation(_))));
    }

    #[test]
    fn test_patch_window_detection() {
        let patch = PatchPricingRecord {
            end_date: Some("2025-09-30".to_string()),
            ..Default::default()
        };
        assert!(patch.changes_window());
        assert!(!PatchPricingRecord::default().changes_window());
    }
}
