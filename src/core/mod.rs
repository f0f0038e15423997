//! Domain types, configuration and process-wide helpers

pub mod cache;
pub mod clock;
pub mod config;
pub mod currency;
pub mod log;
pub mod market;
pub mod news;
pub mod snapshot;

// Re-export main types for cleaner imports
pub use clock::LocalTime;
pub use currency::{
    BankQuote, BankQuoteSource, CurrencySnapshot, HistoryPoint, OfficialRateProvider,
};
pub use snapshot::{Snapshot, Stamp};
