//! Per-table gauge families and their Prometheus text exposition.
//!
//! All five families share the label pair (`database`, `table`) and are always
//! written together for a given catalog row. The registry is owned by
//! [`TableMetrics`] rather than the process-global default registry, so several
//! instances (tests, multiple exporters) never collide.

use std::collections::HashSet;
use std::sync::Mutex;

use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::collector::CatalogRow;

/// Content type of the rendered exposition.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Label names shared by every family.
pub const LABELS: [&str; 2] = ["database", "table"];

/// (database, table) identity of a series.
pub type LabelPair = (String, String);

/// One of the five exported gauge families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Rows,
    DataSize,
    IndexSize,
    DataFree,
    TotalSize,
}

impl Family {
    pub const ALL: [Family; 5] = [
        Family::Rows,
        Family::DataSize,
        Family::IndexSize,
        Family::DataFree,
        Family::TotalSize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Family::Rows => "mysql_table_rows",
            Family::DataSize => "mysql_table_data_size_bytes",
            Family::IndexSize => "mysql_table_index_size_bytes",
            Family::DataFree => "mysql_table_data_free_bytes",
            Family::TotalSize => "mysql_table_total_size_bytes",
        }
    }

    fn help(self) -> &'static str {
        match self {
            Family::Rows => "Number of rows in table",
            Family::DataSize => "Data size of table in bytes",
            Family::IndexSize => "Index size of table in bytes",
            Family::DataFree => "Free space in table in bytes",
            Family::TotalSize => "Total size (data + index) of table in bytes",
        }
    }

    fn value(self, row: &CatalogRow) -> u64 {
        match self {
            Family::Rows => row.rows,
            Family::DataSize => row.data_length,
            Family::IndexSize => row.index_length,
            Family::DataFree => row.data_free,
            Family::TotalSize => row.total_size,
        }
    }
}

/// Registry holding the five table gauge families.
///
/// Safe to share between the collector and any number of HTTP handlers:
/// each series is updated atomically by the `prometheus` crate.
pub struct TableMetrics {
    registry: Registry,
    /// Indexed in `Family::ALL` order.
    gauges: [IntGaugeVec; 5],
    /// Label pairs currently exposed, used for pruning.
    known: Mutex<HashSet<LabelPair>>,
}

impl TableMetrics {
    /// Creates the families and registers them in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let make = |family: Family| -> Result<IntGaugeVec, prometheus::Error> {
            let gauge = IntGaugeVec::new(Opts::new(family.name(), family.help()), &LABELS)?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };

        let gauges = [
            make(Family::Rows)?,
            make(Family::DataSize)?,
            make(Family::IndexSize)?,
            make(Family::DataFree)?,
            make(Family::TotalSize)?,
        ];

        Ok(Self {
            registry,
            gauges,
            known: Mutex::new(HashSet::new()),
        })
    }

    fn gauge(&self, family: Family) -> &IntGaugeVec {
        &self.gauges[family as usize]
    }

    /// Overwrites all five series for the row's (schema, table) pair.
    pub fn observe(&self, row: &CatalogRow) {
        let labels = [row.schema.as_str(), row.table.as_str()];
        for family in Family::ALL {
            let value = i64::try_from(family.value(row)).unwrap_or(i64::MAX);
            self.gauge(family).with_label_values(&labels[..]).set(value);
        }
        self.known_pairs()
            .insert((row.schema.clone(), row.table.clone()));
    }

    /// Removes every series whose label pair is not in `current`.
    ///
    /// Returns the number of label pairs removed.
    pub fn retain_only(&self, current: &HashSet<LabelPair>) -> usize {
        let mut known = self.known_pairs();
        let stale: Vec<LabelPair> = known.difference(current).cloned().collect();
        for (database, table) in &stale {
            let labels = [database.as_str(), table.as_str()];
            for family in Family::ALL {
                // Missing series are fine: the pair may never have been set in this family.
                let _ = self.gauge(family).remove_label_values(&labels[..]);
            }
            known.remove(&(database.clone(), table.clone()));
        }
        stale.len()
    }

    /// Current value of one series, without creating it.
    pub fn get(&self, family: Family, database: &str, table: &str) -> Option<i64> {
        let known = self.known_pairs();
        if !known.contains(&(database.to_string(), table.to_string())) {
            return None;
        }
        Some(self.gauge(family).with_label_values(&[database, table][..]).get())
    }

    /// Label pairs currently exposed, sorted.
    pub fn series(&self) -> Vec<LabelPair> {
        let mut pairs: Vec<LabelPair> = self.known_pairs().iter().cloned().collect();
        pairs.sort();
        pairs
    }

    /// Renders all families in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    fn known_pairs(&self) -> std::sync::MutexGuard<'_, HashSet<LabelPair>> {
        // A poisoned set only means a panic mid-insert; the data is still usable.
        self.known.lock().unwrap_or_else(|e| e.into_inner())
    }
}
