//! Exchange-rate history and currency conversion.

mod models;
mod resolver;

pub use models::{ExchangeRate, ExchangeRateRow, NewExchangeRate};
pub use resolver::{Conversion, ExchangeRateResolver, ResolvedRate};
