//! Temporal pricing for supplier services.
//!
//! Season-scoped pricing records per supplier type, resolved for a service
//! and a calendar date and totalled into quotations.

pub mod aggregator;
pub mod calculators;
pub mod models;
pub mod overlap;
pub mod queries;
pub mod requests;
pub mod resolver;
pub mod responses;
pub mod selectors;
pub mod services;
pub mod window;

// Re-export commonly used items
pub use aggregator::{LineContribution, PricedQuotation, QuotationAggregator, QuotationTotal};
pub use models::{ConflictingRecord, PricingRecord, RecordStatus, SupplierType};
pub use overlap::{OverlapResult, OverlapValidator};
pub use resolver::{
    PriceResult, PricingContext, PricingIssue, PricingResolver, PricingSource, QuotationLineItem,
};
pub use selectors::{Selector, SupplierRates};
pub use services::PricingRecordService;
pub use window::DateWindow;
