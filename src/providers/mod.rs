pub mod bank_uz;
pub mod cbu;
pub mod fetcher;
pub mod iqair;
pub mod polygon;
pub mod util;
pub mod worldnews;

pub use fetcher::{FetchError, Fetcher};
