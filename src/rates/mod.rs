//! Exchange rate domain: quote types and the fetch-through service.

pub mod service;
pub mod types;

pub use service::{RateError, RateService};
pub use types::{CurrencyCode, Quote, QuoteError};
