//! Resolve the applicable price of a service on a calendar date.
//!
//! A missing record or an unoffered selector is a normal outcome and comes
//! back as a `PriceResult` with `pricing_source = none` and an issue tag.
//! Only store failures and invalid inputs are errors.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{PricingError, Result};
use crate::money::{CurrencyCode, Money};
use crate::store::PricingRecordStore;

use super::calculators::line_price;
use super::models::{PricingRecord, SupplierType};
use super::selectors::Selector;

/// Explicit inputs for one resolution. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingContext {
    /// Quotation date.
    pub date: NaiveDate,
    /// Currency locked rates are denominated in; unpriced lines report zero
    /// in this currency.
    pub currency: CurrencyCode,
    #[serde(default)]
    pub markup_percent: Decimal,
    #[serde(default)]
    pub tax_percent: Decimal,
    #[serde(default)]
    pub respect_locked: bool,
    /// Locked base prices keyed `"{entity_id}:{selector_key}"`.
    #[serde(default)]
    pub locked_rates: HashMap<String, Decimal>,
}

impl PricingContext {
    pub fn new(date: NaiveDate, currency: CurrencyCode) -> Self {
        Self {
            date,
            currency,
            markup_percent: Decimal::ZERO,
            tax_percent: Decimal::ZERO,
            respect_locked: false,
            locked_rates: HashMap::new(),
        }
    }

    pub fn with_markup(mut self, percent: Decimal) -> Self {
        self.markup_percent = percent;
        self
    }

    pub fn with_tax(mut self, percent: Decimal) -> Self {
        self.tax_percent = percent;
        self
    }

    /// Lock a base price and switch lock handling on.
    pub fn with_locked_rate(mut self, entity_id: Uuid, selector: &Selector, base: Decimal) -> Self {
        self.locked_rates
            .insert(Self::lock_key(entity_id, selector), base);
        self.respect_locked = true;
        self
    }

    pub fn lock_key(entity_id: Uuid, selector: &Selector) -> String {
        format!("{}:{}", entity_id, selector.key())
    }

    /// Locked base for the line, if locks are respected and one is set.
    pub fn locked_base(&self, entity_id: Uuid, selector: &Selector) -> Option<Decimal> {
        if !self.respect_locked {
            return None;
        }
        self.locked_rates
            .get(&Self::lock_key(entity_id, selector))
            .copied()
    }

    pub fn validate(&self) -> Result<()> {
        if self.markup_percent <= Decimal::from(-100) {
            return Err(PricingError::Validation(format!(
                "markup_percent must be greater than -100, got {}",
                self.markup_percent
            )));
        }
        if self.tax_percent.is_sign_negative() && !self.tax_percent.is_zero() {
            return Err(PricingError::Validation(format!(
                "tax_percent must not be negative, got {}",
                self.tax_percent
            )));
        }
        if let Some((key, base)) = self
            .locked_rates
            .iter()
            .find(|(_, base)| base.is_sign_negative() && !base.is_zero())
        {
            return Err(PricingError::Validation(format!(
                "Locked rate {} must not be negative, got {}",
                key, base
            )));
        }
        Ok(())
    }
}

/// Where a resolved price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingSource {
    HotelPricing,
    GuidePricing,
    VehiclePricing,
    TourPricing,
    EntranceFeePricing,
    TransferPricing,
    RestaurantPricing,
    LockedRate,
    None,
}

impl PricingSource {
    pub fn for_supplier(supplier: SupplierType) -> Self {
        match supplier {
            SupplierType::Hotel => PricingSource::HotelPricing,
            SupplierType::Guide => PricingSource::GuidePricing,
            SupplierType::Vehicle => PricingSource::VehiclePricing,
            SupplierType::Tour => PricingSource::TourPricing,
            SupplierType::EntranceFee => PricingSource::EntranceFeePricing,
            SupplierType::Transfer => PricingSource::TransferPricing,
            SupplierType::Restaurant => PricingSource::RestaurantPricing,
        }
    }
}

/// Why a line came back unpriced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingIssue {
    /// No active record covers the date.
    NoPricingForDate,
    /// The covering record does not offer the selected variant.
    SelectorUnavailable,
}

/// Priced (or unpriced) quotation line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResult {
    pub entity_id: Uuid,
    pub supplier_type: SupplierType,
    pub date: NaiveDate,
    pub selector: Selector,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    pub pricing_source: PricingSource,
    pub season_name: Option<String>,
    pub record_id: Option<Uuid>,
    pub error: Option<PricingIssue>,
}

impl PriceResult {
    pub fn is_priced(&self) -> bool {
        self.pricing_source != PricingSource::None
    }
}

/// One requested service of a quotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotationLineItem {
    pub entity_id: Uuid,
    pub date: NaiveDate,
    pub quantity: u32,
    /// Selector; its variant is the service type.
    pub service: Selector,
}

impl QuotationLineItem {
    pub fn service_type(&self) -> SupplierType {
        self.service.supplier_type()
    }
}

#[derive(Clone)]
pub struct PricingResolver {
    store: Arc<dyn PricingRecordStore>,
}

impl PricingResolver {
    pub fn new(store: Arc<dyn PricingRecordStore>) -> Self {
        Self { store }
    }

    /// Resolve the price of `quantity` x `selector` for `entity_id` on `date`.
    #[instrument(skip(self, context, selector), fields(selector = %selector.key()))]
    pub async fn resolve_price(
        &self,
        entity_id: Uuid,
        date: NaiveDate,
        selector: Selector,
        quantity: u32,
        context: &PricingContext,
    ) -> Result<PriceResult> {
        context.validate()?;
        if quantity == 0 {
            return Err(PricingError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let supplier = selector.supplier_type();
        let record = self
            .store
            .find_active_record_covering_date(supplier, entity_id, date)
            .await?;

        let line = Line {
            entity_id,
            date,
            selector,
            quantity,
        };

        if let Some(locked) = context.locked_base(entity_id, &selector) {
            debug!("Using locked base {} {}", locked, context.currency);
            return line.priced(
                locked,
                &context.currency,
                PricingSource::LockedRate,
                record.as_ref(),
                context,
            );
        }

        let Some(record) = record else {
            debug!("No active {} record covers {}", supplier, date);
            return Ok(line.unpriced(PricingIssue::NoPricingForDate, None, context));
        };

        match record.rates.base_price(&selector)? {
            Some(base) => line.priced(
                base,
                &record.currency,
                PricingSource::for_supplier(supplier),
                Some(&record),
                context,
            ),
            None => {
                debug!("Record {} does not offer {}", record.id, selector.key());
                Ok(line.unpriced(PricingIssue::SelectorUnavailable, Some(&record), context))
            }
        }
    }

    /// Resolve a quotation line item.
    pub async fn resolve_line(
        &self,
        item: &QuotationLineItem,
        context: &PricingContext,
    ) -> Result<PriceResult> {
        self.resolve_price(item.entity_id, item.date, item.service, item.quantity, context)
            .await
    }
}

/// Line under resolution.
struct Line {
    entity_id: Uuid,
    date: NaiveDate,
    selector: Selector,
    quantity: u32,
}

impl Line {
    fn priced(
        self,
        base: Decimal,
        currency: &CurrencyCode,
        source: PricingSource,
        record: Option<&PricingRecord>,
        context: &PricingContext,
    ) -> Result<PriceResult> {
        let price = line_price(
            base,
            context.markup_percent,
            context.tax_percent,
            self.quantity,
            self.selector.is_per_person(),
            currency,
        )?;

        Ok(PriceResult {
            entity_id: self.entity_id,
            supplier_type: self.selector.supplier_type(),
            date: self.date,
            selector: self.selector,
            quantity: self.quantity,
            unit_price: price.unit_price,
            total_price: price.total_price,
            pricing_source: source,
            season_name: record.map(|r| r.season_name.clone()),
            record_id: record.map(|r| r.id),
            error: None,
        })
    }

    fn unpriced(
        self,
        issue: PricingIssue,
        record: Option<&PricingRecord>,
        context: &PricingContext,
    ) -> PriceResult {
        PriceResult {
            entity_id: self.entity_id,
            supplier_type: self.selector.supplier_type(),
            date: self.date,
            selector: self.selector,
            quantity: self.quantity,
            unit_price: Money::zero(context.currency.clone()),
            total_price: Money::zero(context.currency.clone()),
            pricing_source: PricingSource::None,
            season_name: record.map(|r| r.season_name.clone()),
            record_id: record.map(|r| r.id),
            error: Some(issue),
        }
    }
}
