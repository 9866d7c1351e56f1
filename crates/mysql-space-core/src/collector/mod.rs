//! Table size collection from the MySQL catalog.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      TableCollector                       │
//! │   ping ─► build_catalog_query ─► fetch ─► TableMetrics    │
//! └─────────────────────────────┬─────────────────────────────┘
//!                               │
//!                      ┌────────▼────────┐
//!                      │  CatalogSource  │ (trait)
//!                      └────────┬────────┘
//!                               │
//!                ┌──────────────┴──────────────┐
//!         ┌──────▼──────┐               ┌──────▼──────┐
//!         │ MySqlSource │               │ MockSource  │
//!         │   (sqlx)    │               │  (Testing)  │
//!         └─────────────┘               └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use mysql_space_core::collector::{MockSource, TableCollector};
//! use mysql_space_core::config::{CatalogFilter, CollectionConfig};
//! use mysql_space_core::metrics::TableMetrics;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let metrics = Arc::new(TableMetrics::new().unwrap());
//! let config = CollectionConfig::new(CatalogFilter::default(), 200).unwrap();
//! let mut collector = TableCollector::new(MockSource::three_tables(), metrics.clone(), config);
//! let stats = collector.collect_once().await.unwrap();
//! assert_eq!(stats.applied, 3);
//! # });
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod mock;
mod mysql;
pub mod queries;
pub mod source;

pub use collector::{CycleStats, TableCollector};
pub use mock::{MockSource, MockTable};
pub use mysql::MySqlSource;
pub use queries::{CatalogQuery, build_catalog_query};
pub use source::{CatalogRow, CatalogSource, ScannedRow};
