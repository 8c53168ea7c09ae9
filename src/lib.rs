//! Shelter intake/outcome analytics.
//!
//! CSV exports are normalized and bulk-loaded into a [`store::RecordStore`];
//! [`analytics::Analytics`] then serves a region × year risk heatmap, an
//! adoption forecast and a hotspot list, falling back to deterministic local
//! generators when the prediction service is unavailable.

pub mod analytics;
pub mod columns;
pub mod config;
pub mod forecast;
pub mod heatmap;
pub mod hotspots;
pub mod loader;
pub mod output;
pub mod region;
pub mod reports;
pub mod service;
pub mod store;
pub mod types;
pub mod util;

pub use analytics::Analytics;
pub use config::Config;
pub use loader::{ingest_files, IngestError, LoadOptions, LoadReport};
pub use store::{MemoryStore, RecordStore, StoreError};
