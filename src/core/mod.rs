//! Core market-data types shared by the fetch pipeline

pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod log;
pub mod payload;
pub mod selection;
pub mod symbol;

// Re-export main types for cleaner imports
pub use cache::{CacheEntry, CacheKey, QuoteCache};
pub use credentials::CredentialRotator;
pub use error::{FetchError, SelectionError};
pub use payload::ChartPayload;
pub use selection::{Interval, Range, Selection};
pub use symbol::{Market, Symbol};
