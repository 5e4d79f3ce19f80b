//! Response DTOs for the pricing API.
//!
//! Money is always serialized as `{ "amount_minor": .., "currency": .. }`;
//! `*_display` fields carry the formatted string alongside.

use chrono::NaiveDate;
use serde::Serialize;

use crate::money::Money;

use super::aggregator::{LineContribution, PricedQuotation};
use super::resolver::PriceResult;

/// Response for single-service pricing
#[derive(Debug, Clone, Serialize)]
pub struct PriceResponse {
    #[serde(flatten)]
    pub result: PriceResult,
    pub unit_price_display: String,
    pub total_price_display: String,
}

impl From<PriceResult> for PriceResponse {
    fn from(result: PriceResult) -> Self {
        Self {
            unit_price_display: result.unit_price.to_string(),
            total_price_display: result.total_price.to_string(),
            result,
        }
    }
}

/// Response for quotation pricing
#[derive(Debug, Clone, Serialize)]
pub struct QuotationResponse {
    pub lines: Vec<PriceResponse>,
    pub contributions: Vec<LineContribution>,
    pub total: Money,
    pub total_display: String,
    pub quotation_date: NaiveDate,
}

impl From<PricedQuotation> for QuotationResponse {
    fn from(quote: PricedQuotation) -> Self {
        Self {
            lines: quote.lines.into_iter().map(PriceResponse::from).collect(),
            contributions: quote.total.lines,
            total_display: quote.total.total.to_string(),
            total: quote.total.total,
            quotation_date: quote.total.quotation_date,
        }
    }
}

/// Generic pricing error response
#[derive(Debug, Serialize)]
pub struct PricingErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::CurrencyCode;
    use crate::pricing::models::SupplierType;
    use crate::pricing::resolver::PricingSource;
    use crate::pricing::selectors::{Selector, TicketClass};
    use uuid::Uuid;

    #[test]
    fn test_price_response_json_shape() {
        let usd = CurrencyCode::parse("USD").unwrap();
        let result = PriceResult {
            entity_id: Uuid::nil(),
            supplier_type: SupplierType::Tour,
            date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            selector: Selector::Tour(TicketClass::Adult),
            quantity: 2,
            unit_price: Money::new(7_080, usd.clone()),
            total_price: Money::new(14_160, usd),
            pricing_source: PricingSource::TourPricing,
            season_name: Some("High".to_string()),
            record_id: None,
            error: None,
        };

        let json = serde_json::to_value(PriceResponse::from(result)).unwrap();
        assert_eq!(json["total_price"]["amount_minor"], 14_160);
        assert_eq!(json["total_price"]["currency"], "USD");
        assert_eq!(json["total_price_display"], "$141.60");
        assert_eq!(json["pricing_source"], "tour_pricing");
        assert_eq!(json["selector"]["service_type"], "tour");
        assert!(json["error"].is_null());
    }
}
