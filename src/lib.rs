//! Temporal pricing resolution for a tour-operator back office.
//!
//! Season-scoped supplier pricing is resolved for a service and a calendar
//! date, converted with date-effective exchange rates and totalled into
//! quotations. Writes are checked for validity-window conflicts.

pub mod cache;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod fx;
pub mod money;
pub mod pricing;
pub mod store;

pub use config::{init_tracing, EngineConfig};
pub use engine::PricingEngine;
pub use error::{PricingError, Result};
pub use money::{CurrencyCode, Money};
