//! MySQL-backed catalog source.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Connection, Row};
use tracing::debug;

use super::queries::CatalogQuery;
use super::source::{CatalogRow, CatalogSource, ScannedRow};
use crate::config::ConnectionOptions;
use crate::error::{CollectError, RowScanError};

/// How long to wait for the single pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Catalog source over a single-connection MySQL pool.
///
/// The pool connects lazily and re-establishes the connection after failures,
/// so a server restart only costs the cycles that ran while it was down.
pub struct MySqlSource {
    pool: MySqlPool,
}

impl MySqlSource {
    /// Creates a source without touching the network.
    ///
    /// No default schema is selected; the catalog query addresses
    /// `information_schema` explicitly.
    pub fn connect_lazy(options: &ConnectionOptions) -> Self {
        let connect = MySqlConnectOptions::new()
            .host(&options.host)
            .port(options.port)
            .username(&options.user)
            .password(&options.password);

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy_with(connect);

        Self { pool }
    }

    /// Closes the pool, waiting for the connection to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CatalogSource for MySqlSource {
    async fn ping(&self) -> Result<(), CollectError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| CollectError::Connectivity(format_mysql_error(&e)))?;
        conn.ping()
            .await
            .map_err(|e| CollectError::Connectivity(format_mysql_error(&e)))
    }

    async fn fetch(&self, query: &CatalogQuery, limit: u32) -> Result<Vec<ScannedRow>, CollectError> {
        let mut statement = sqlx::query(&query.sql);
        for value in &query.params {
            statement = statement.bind(value.as_str());
        }
        statement = statement.bind(limit);

        let mut stream = statement.fetch(&self.pool);
        let mut rows = Vec::with_capacity((limit as usize).min(1024));
        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| CollectError::Query(format_mysql_error(&e)))?
        {
            rows.push(parse_catalog_row(&row));
        }
        debug!(rows = rows.len(), "catalog query drained");

        Ok(rows)
    }
}

/// Decodes one catalog row. NULL sizes (some engines) count as scan failures.
fn parse_catalog_row(row: &MySqlRow) -> ScannedRow {
    let schema: String = row
        .try_get("TABLE_SCHEMA")
        .map_err(|e| RowScanError::new("?", "?", e.to_string()))?;
    let table: String = row
        .try_get("TABLE_NAME")
        .map_err(|e| RowScanError::new(&schema, "?", e.to_string()))?;

    let column = |name: &str| -> Result<u64, RowScanError> {
        match row.try_get::<Option<u64>, _>(name) {
            Ok(Some(v)) => Ok(v),
            Ok(None) => Err(RowScanError::new(&schema, &table, format!("{name} is NULL"))),
            Err(e) => Err(RowScanError::new(&schema, &table, e.to_string())),
        }
    };

    let rows = column("TABLE_ROWS")?;
    let data_length = column("DATA_LENGTH")?;
    let index_length = column("INDEX_LENGTH")?;
    let data_free = column("DATA_FREE")?;
    let total_size = column("TOTAL_SIZE")?;

    Ok(CatalogRow {
        schema,
        table,
        rows,
        data_length,
        index_length,
        data_free,
        total_size,
    })
}

/// Formats a driver error for logs, preferring the server's message.
pub(crate) fn format_mysql_error(e: &sqlx::Error) -> String {
    match e {
        sqlx::Error::Database(db_error) => match db_error.code() {
            Some(code) => format!("{}: {}", code, db_error.message()),
            None => db_error.message().to_string(),
        },
        sqlx::Error::PoolTimedOut => "timed out waiting for a connection".to_string(),
        sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
            "connection refused".to_string()
        }
        other => other.to_string(),
    }
}
