//! Collection loop: catalog query → gauges, repeated on a fixed period.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::queries::build_catalog_query;
use super::source::CatalogSource;
use crate::config::CollectionConfig;
use crate::error::CollectError;
use crate::metrics::{LabelPair, TableMetrics};

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Rows written to the gauges.
    pub applied: usize,
    /// Rows skipped because they could not be decoded.
    pub skipped: usize,
    /// Label pairs removed by stale-series pruning.
    pub pruned: usize,
    pub elapsed: Duration,
}

/// Drives collection cycles against a [`CatalogSource`].
///
/// Owns the source; shares the metrics with the HTTP side.
pub struct TableCollector<S: CatalogSource> {
    source: S,
    metrics: Arc<TableMetrics>,
    config: CollectionConfig,
    cycles: u64,
}

impl<S: CatalogSource> TableCollector<S> {
    pub fn new(source: S, metrics: Arc<TableMetrics>, config: CollectionConfig) -> Self {
        Self {
            source,
            metrics,
            config,
            cycles: 0,
        }
    }

    pub fn metrics(&self) -> &Arc<TableMetrics> {
        &self.metrics
    }

    /// Number of cycles attempted so far, successful or not.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Runs one collection cycle.
    ///
    /// On error no gauge is touched: rows are only applied once the whole
    /// result set has been read. The ping and the query are each bounded by
    /// the configured query timeout.
    pub async fn collect_once(&mut self) -> Result<CycleStats, CollectError> {
        self.cycles += 1;
        let t0 = Instant::now();
        let timeout = self.config.query_timeout;

        tokio::time::timeout(timeout, self.source.ping())
            .await
            .map_err(|_| CollectError::Timeout(timeout))??;

        let query = build_catalog_query(&self.config.filter);
        debug!(
            params = query.params.len(),
            sort = %self.config.filter.sort_field,
            order = %self.config.filter.sort_order,
            limit = self.config.row_limit,
            "executing catalog query"
        );

        let rows = tokio::time::timeout(timeout, self.source.fetch(&query, self.config.row_limit))
            .await
            .map_err(|_| CollectError::Timeout(timeout))??;

        let mut stats = CycleStats::default();
        let mut seen: HashSet<LabelPair> = HashSet::with_capacity(rows.len());

        for row in rows {
            match row {
                Ok(row) => {
                    self.metrics.observe(&row);
                    seen.insert((row.schema, row.table));
                    stats.applied += 1;
                }
                Err(e) => {
                    warn!(schema = %e.schema, table = %e.table, reason = %e.reason, "skipping catalog row");
                    stats.skipped += 1;
                }
            }
        }

        if self.config.prune_stale {
            stats.pruned = self.metrics.retain_only(&seen);
        }

        stats.elapsed = t0.elapsed();
        Ok(stats)
    }

    /// Runs one cycle and logs the outcome. Never fails.
    pub async fn tick(&mut self) -> Option<CycleStats> {
        match self.collect_once().await {
            Ok(stats) => {
                let duration_ms = stats.elapsed.as_millis() as u64;
                if self.config.verbose {
                    info!(
                        tables = stats.applied,
                        skipped = stats.skipped,
                        pruned = stats.pruned,
                        duration_ms,
                        "collected table metrics"
                    );
                } else {
                    debug!(
                        tables = stats.applied,
                        skipped = stats.skipped,
                        pruned = stats.pruned,
                        duration_ms,
                        "collected table metrics"
                    );
                }
                if stats.elapsed > self.config.interval / 2 {
                    warn!(
                        duration_ms,
                        interval_ms = self.config.interval.as_millis() as u64,
                        "cycle exceeded 50% of interval"
                    );
                }
                Some(stats)
            }
            Err(e) => {
                warn!(cycle = self.cycles, error = %e, "metrics collection failed");
                None
            }
        }
    }

    /// Repeats [`tick`](Self::tick) until `shutdown` turns true or its sender is dropped.
    ///
    /// The first cycle is expected to have run already, so this starts by
    /// sleeping. The period is measured from the end of one cycle to the
    /// start of the next, so cycles never overlap. Shutdown is observed only
    /// between cycles, and a watch update that is not a shutdown leaves the
    /// pending deadline alone. Hands the source back once stopped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> S {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "starting collection loop"
        );

        loop {
            let deadline = tokio::time::Instant::now() + self.config.interval;
            let stop = loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => break false,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break true;
                        }
                    }
                }
            };
            if stop {
                break;
            }

            self.tick().await;
        }

        info!(cycles = self.cycles, "collection loop stopped");
        self.source
    }
}
