//! mysql-space-core — table size collection for mysql-space-exporter.
//!
//! Provides:
//! - `config` — validated collection settings (filters, sort, limit, schedule)
//! - `collector` — catalog query building, catalog sources and the collection loop
//! - `metrics` — the per-table gauge families and their text exposition
//! - `error` — error types for configuration and collection

pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;

/// Crate version, shared with the exporter binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
