//! In-memory caching in front of the spreadsheet store.

pub mod loader;
pub mod ttl;

pub use loader::{DedupingLoader, LoadAborted, LoaderStats};
pub use ttl::{CacheEntry, CacheStats, TtlCache};
