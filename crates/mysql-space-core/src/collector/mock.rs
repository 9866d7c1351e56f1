//! In-memory catalog source for testing.
//!
//! `MockSource` evaluates a [`CatalogQuery`] the way the server would: system
//! schemas excluded, filters applied, rows sorted by the requested column and
//! truncated to the limit. Views never match. Clones share state, so a test
//! can keep a handle while the collector owns another and flip reachability
//! or latency between cycles.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::queries::{CatalogQuery, SYSTEM_SCHEMAS};
use super::source::{CatalogRow, CatalogSource, ScannedRow};
use crate::config::{SortField, SortOrder};
use crate::error::{CollectError, RowScanError};

/// A table known to the mock server.
#[derive(Debug, Clone, Default)]
pub struct MockTable {
    pub schema: String,
    pub table: String,
    pub rows: u64,
    pub data_length: u64,
    pub index_length: u64,
    pub data_free: u64,
    /// Return a decode failure for this row instead of its values.
    pub malformed: bool,
    /// Not a base table; never matched by the catalog query.
    pub view: bool,
}

impl MockTable {
    pub fn new(schema: &str, table: &str, data_length: u64, index_length: u64) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            rows: data_length / 100,
            data_length,
            index_length,
            data_free: 0,
            malformed: false,
            view: false,
        }
    }

    pub fn malformed(mut self) -> Self {
        self.malformed = true;
        self
    }

    pub fn view(mut self) -> Self {
        self.view = true;
        self
    }

    fn total_size(&self) -> u64 {
        self.data_length + self.index_length
    }

    fn to_row(&self) -> ScannedRow {
        if self.malformed {
            return Err(RowScanError::new(&self.schema, &self.table, "TABLE_ROWS is NULL"));
        }
        Ok(CatalogRow {
            schema: self.schema.clone(),
            table: self.table.clone(),
            rows: self.rows,
            data_length: self.data_length,
            index_length: self.index_length,
            data_free: self.data_free,
            total_size: self.total_size(),
        })
    }

    fn compare(&self, other: &Self, field: SortField) -> Ordering {
        match field {
            SortField::TableSchema => self.schema.cmp(&other.schema),
            SortField::TableName => self.table.cmp(&other.table),
            SortField::TableRows => self.rows.cmp(&other.rows),
            SortField::DataLength => self.data_length.cmp(&other.data_length),
            SortField::IndexLength => self.index_length.cmp(&other.index_length),
            SortField::DataFree => self.data_free.cmp(&other.data_free),
            SortField::TotalSize => self.total_size().cmp(&other.total_size()),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    tables: Vec<MockTable>,
    unreachable: bool,
    query_error: Option<String>,
    ping_delay: Option<Duration>,
    fetch_delay: Option<Duration>,
    pings: usize,
    queries: Vec<(CatalogQuery, u32)>,
}

/// Mock catalog source. See module docs.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    state: Arc<Mutex<MockState>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    pub fn add_table(&self, table: MockTable) {
        self.lock().tables.push(table);
    }

    /// Drops a table, as if `DROP TABLE` ran on the server.
    pub fn drop_table(&self, schema: &str, table: &str) {
        self.lock()
            .tables
            .retain(|t| !(t.schema == schema && t.table == table));
    }

    /// Replaces the sizes of an existing table.
    pub fn resize_table(&self, schema: &str, table: &str, data_length: u64, index_length: u64) {
        let mut state = self.lock();
        if let Some(t) = state
            .tables
            .iter_mut()
            .find(|t| t.schema == schema && t.table == table)
        {
            t.data_length = data_length;
            t.index_length = index_length;
        }
    }

    /// Makes `ping` fail (or succeed again).
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Makes `fetch` fail with the given message; `None` restores normal behavior.
    pub fn set_query_error(&self, message: Option<&str>) {
        self.lock().query_error = message.map(str::to_string);
    }

    /// Makes every `ping` take `delay` before answering.
    pub fn set_ping_delay(&self, delay: Option<Duration>) {
        self.lock().ping_delay = delay;
    }

    /// Makes every `fetch` take `delay` before returning rows.
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        self.lock().fetch_delay = delay;
    }

    /// Number of `ping` calls so far.
    pub fn pings(&self) -> usize {
        self.lock().pings
    }

    /// Queries executed so far with their limits.
    pub fn queries(&self) -> Vec<(CatalogQuery, u32)> {
        self.lock().queries.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CatalogSource for MockSource {
    async fn ping(&self) -> Result<(), CollectError> {
        let delay = {
            let mut state = self.lock();
            state.pings += 1;
            if state.unreachable {
                return Err(CollectError::Connectivity("connection refused".to_string()));
            }
            state.ping_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn fetch(&self, query: &CatalogQuery, limit: u32) -> Result<Vec<ScannedRow>, CollectError> {
        let delay = {
            let mut state = self.lock();
            state.queries.push((query.clone(), limit));
            if let Some(ref message) = state.query_error {
                return Err(CollectError::Query(message.clone()));
            }
            state.fetch_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.lock();
        let filter = &query.filter;
        let mut matching: Vec<&MockTable> = state
            .tables
            .iter()
            .filter(|t| !t.view)
            .filter(|t| !SYSTEM_SCHEMAS.contains(&t.schema.as_str()))
            .filter(|t| filter.databases.is_empty() || filter.databases.contains(&t.schema))
            .filter(|t| filter.tables.is_empty() || filter.tables.contains(&t.table))
            .collect();

        matching.sort_by(|a, b| {
            let ord = a.compare(b, filter.sort_field);
            match filter.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        Ok(matching
            .into_iter()
            .take(limit as usize)
            .map(MockTable::to_row)
            .collect())
    }
}

// Scenarios

impl MockSource {
    /// Three user tables with total sizes 500, 300 and 100 bytes, plus one
    /// system table that must never be reported.
    pub fn three_tables() -> Self {
        let source = Self::new();
        source.add_table(MockTable::new("db1", "t1", 300, 200));
        source.add_table(MockTable::new("db1", "t2", 200, 100));
        source.add_table(MockTable::new("db2", "t3", 60, 40));
        source.add_table(MockTable::new("mysql", "user", 4000, 1000));
        source
    }

    /// Two tables in `db1` with a malformed row between them.
    pub fn with_malformed_row() -> Self {
        let source = Self::new();
        source.add_table(MockTable::new("db1", "t1", 300, 200));
        source.add_table(MockTable::new("db1", "broken", 250, 0).malformed());
        source.add_table(MockTable::new("db1", "t2", 200, 100));
        source
    }
}
