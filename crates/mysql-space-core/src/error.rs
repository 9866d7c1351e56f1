//! Error types for configuration and collection.

use std::time::Duration;

use thiserror::Error;

/// Invalid collection settings. Fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Sort field outside the allow-listed catalog columns.
    #[error("invalid sort field '{0}' (expected one of {1})")]
    InvalidSortField(String, &'static str),

    /// Sort order other than ASC or DESC.
    #[error("invalid sort order '{0}' (expected ASC or DESC)")]
    InvalidSortOrder(String),

    /// Row limit must be positive.
    #[error("row limit must be greater than zero")]
    InvalidRowLimit,

    #[error("collection interval must be greater than zero")]
    InvalidInterval,

    #[error("query timeout must be greater than zero")]
    InvalidQueryTimeout,
}

/// Failure of a whole collection cycle.
///
/// None of these are fatal once the exporter is running: the cycle is skipped
/// and existing gauge values stay as they were.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectError {
    /// Connection check failed.
    #[error("MySQL: {0}")]
    Connectivity(String),

    /// Statement execution or result stream failed.
    #[error("MySQL query error: {0}")]
    Query(String),

    /// Ping or catalog query did not finish in time.
    #[error("MySQL timed out after {0:?}")]
    Timeout(Duration),
}

/// A single catalog row that could not be decoded. The row is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("skipping {schema}.{table}: {reason}")]
pub struct RowScanError {
    /// Schema name, if it could be read.
    pub schema: String,
    /// Table name, if it could be read.
    pub table: String,
    pub reason: String,
}

impl RowScanError {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            reason: reason.into(),
        }
    }
}
