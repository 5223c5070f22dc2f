#![deny(missing_docs)]
//! Cost and usage tracking: prices every model call against a built-in
//! pricing table, persists it to an append-only, date-partitioned JSONL
//! log with a per-session index, and answers aggregation and export
//! queries over the result.

pub mod error;
pub mod export;
pub mod pricing;
pub mod store;
pub mod tracker;

pub use error::CostError;
pub use export::ExportFormat;
pub use pricing::{PricingTable, Priced, Rates};
pub use store::{CostStore, IndexEntry};
pub use tracker::CostTracker;
