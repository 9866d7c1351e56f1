//! Catalog source abstraction.
//!
//! The collector talks to the database only through [`CatalogSource`], so tests
//! can substitute [`MockSource`](super::mock::MockSource) for a live server.

use async_trait::async_trait;

use super::queries::CatalogQuery;
use crate::error::{CollectError, RowScanError};

/// One `information_schema.tables` row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRow {
    pub schema: String,
    pub table: String,
    /// Storage engine estimate, not an exact count.
    pub rows: u64,
    pub data_length: u64,
    pub index_length: u64,
    pub data_free: u64,
    /// `data_length + index_length`, computed by the server.
    pub total_size: u64,
}

/// Result of decoding a single row.
pub type ScannedRow = Result<CatalogRow, RowScanError>;

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Checks that the server is reachable.
    async fn ping(&self) -> Result<(), CollectError>;

    /// Executes `query`, binding its filter params and then `limit`.
    ///
    /// Per-row decode failures are returned in place as `Err` entries. A failure
    /// of the statement or of the result stream fails the whole call, in which
    /// case no rows are returned. The result set is fully drained and released
    /// before this returns.
    async fn fetch(&self, query: &CatalogQuery, limit: u32) -> Result<Vec<ScannedRow>, CollectError>;
}
