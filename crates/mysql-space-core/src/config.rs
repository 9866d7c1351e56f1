//! Collection settings.
//!
//! Everything here is resolved once at startup (flags, environment, dotenv file)
//! and handed to the collector as a finished [`CollectionConfig`]. Sort field and
//! sort order are closed enums so that only known catalog identifiers ever reach
//! the rendered SQL.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Default period between collection cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Default upper bound for a single catalog query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of catalog rows fetched per cycle.
pub const DEFAULT_ROW_LIMIT: u32 = 200;

/// Catalog column used to order results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortField {
    TableSchema,
    TableName,
    TableRows,
    DataLength,
    IndexLength,
    DataFree,
    #[default]
    TotalSize,
}

impl SortField {
    pub const ALL: [SortField; 7] = [
        SortField::TableSchema,
        SortField::TableName,
        SortField::TableRows,
        SortField::DataLength,
        SortField::IndexLength,
        SortField::DataFree,
        SortField::TotalSize,
    ];

    const EXPECTED: &'static str =
        "TABLE_SCHEMA, TABLE_NAME, TABLE_ROWS, DATA_LENGTH, INDEX_LENGTH, DATA_FREE, TOTAL_SIZE";

    /// Column name as it appears in the catalog query's select list.
    pub fn column(self) -> &'static str {
        match self {
            SortField::TableSchema => "TABLE_SCHEMA",
            SortField::TableName => "TABLE_NAME",
            SortField::TableRows => "TABLE_ROWS",
            SortField::DataLength => "DATA_LENGTH",
            SortField::IndexLength => "INDEX_LENGTH",
            SortField::DataFree => "DATA_FREE",
            SortField::TotalSize => "TOTAL_SIZE",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for SortField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SortField::ALL
            .into_iter()
            .find(|field| field.column().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::InvalidSortField(s.to_string(), Self::EXPECTED))
    }
}

/// Direction of the ordering clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for SortOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            v if v.eq_ignore_ascii_case("asc") => Ok(SortOrder::Asc),
            v if v.eq_ignore_ascii_case("desc") => Ok(SortOrder::Desc),
            _ => Err(ConfigError::InvalidSortOrder(s.to_string())),
        }
    }
}

/// Filter and sort settings consumed by the query builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    /// Schema names to restrict to. Empty = no restriction.
    pub databases: Vec<String>,
    /// Table names to restrict to. Empty = no restriction.
    pub tables: Vec<String>,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
}

impl CatalogFilter {
    /// Builds a filter from raw comma-separated lists.
    pub fn from_lists(
        databases: &str,
        tables: &str,
        sort_field: SortField,
        sort_order: SortOrder,
    ) -> Self {
        Self {
            databases: parse_filter_list(databases),
            tables: parse_filter_list(tables),
            sort_field,
            sort_order,
        }
    }
}

/// Settings for one collector instance. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    pub filter: CatalogFilter,
    /// Maximum catalog rows fetched per cycle, bound as the query's last parameter.
    pub row_limit: u32,
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
    pub query_timeout: Duration,
    /// Log a per-cycle summary at info level instead of debug.
    pub verbose: bool,
    /// Drop series for tables missing from the latest successful cycle.
    pub prune_stale: bool,
}

impl CollectionConfig {
    /// Creates a config with default schedule and logging settings.
    ///
    /// Fails if `row_limit` is zero.
    pub fn new(filter: CatalogFilter, row_limit: u32) -> Result<Self, ConfigError> {
        if row_limit == 0 {
            return Err(ConfigError::InvalidRowLimit);
        }
        Ok(Self {
            filter,
            row_limit,
            interval: DEFAULT_INTERVAL,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            verbose: false,
            prune_stale: false,
        })
    }

    /// Fails on a zero interval, which would turn the loop into a busy spin.
    pub fn with_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }
        self.interval = interval;
        Ok(self)
    }

    /// Fails on a zero timeout, which no query could ever meet.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::InvalidQueryTimeout);
        }
        self.query_timeout = timeout;
        Ok(self)
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_prune_stale(mut self, prune_stale: bool) -> Self {
        self.prune_stale = prune_stale;
        self
    }
}

/// Connection settings for the MySQL server.
#[derive(Clone)]
pub struct ConnectionOptions {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

// Keeps the password out of logs.
impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .finish()
    }
}

/// Splits a comma-separated filter list, trimming whitespace around each element.
///
/// Empty elements are dropped, so `""`, `" "` and `",,"` all yield no restriction.
pub fn parse_filter_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_filter_list_trims_and_drops_empty() {
        assert_eq!(parse_filter_list(" shop , crm,,  "), vec!["shop", "crm"]);
        assert!(parse_filter_list("").is_empty());
        assert!(parse_filter_list(" , ").is_empty());
    }

    #[test]
    fn parse_filter_list_keeps_quotes_verbatim() {
        assert_eq!(parse_filter_list("o'brien"), vec!["o'brien"]);
    }

    #[test]
    fn sort_field_parses_case_insensitively() {
        assert_eq!("TOTAL_SIZE".parse::<SortField>(), Ok(SortField::TotalSize));
        assert_eq!("table_rows".parse::<SortField>(), Ok(SortField::TableRows));
        assert_eq!(" Data_Free ".parse::<SortField>(), Ok(SortField::DataFree));
    }

    #[test]
    fn sort_field_rejects_unknown_columns() {
        let err = "TOTAL_SIZE; DROP TABLE users".parse::<SortField>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSortField(_, _)));
        let message = err.to_string();
        assert!(message.contains("DROP TABLE users"));
        assert!(message.contains("TABLE_SCHEMA, TABLE_NAME"));
    }

    #[test]
    fn sort_field_display_round_trips() {
        for field in SortField::ALL {
            assert_eq!(field.to_string().parse::<SortField>(), Ok(field));
        }
    }

    #[test]
    fn sort_order_parses() {
        assert_eq!("asc".parse::<SortOrder>(), Ok(SortOrder::Asc));
        assert_eq!("DESC".parse::<SortOrder>(), Ok(SortOrder::Desc));
        assert_eq!(
            "DESC, 1".parse::<SortOrder>(),
            Err(ConfigError::InvalidSortOrder("DESC, 1".to_string()))
        );
    }

    #[test]
    fn collection_config_rejects_zero_limit() {
        assert_eq!(
            CollectionConfig::new(CatalogFilter::default(), 0),
            Err(ConfigError::InvalidRowLimit)
        );
    }

    #[test]
    fn collection_config_rejects_zero_durations() {
        let base = CollectionConfig::new(CatalogFilter::default(), DEFAULT_ROW_LIMIT).unwrap();
        assert_eq!(
            base.clone().with_interval(Duration::ZERO),
            Err(ConfigError::InvalidInterval)
        );
        assert_eq!(
            base.clone().with_query_timeout(Duration::ZERO),
            Err(ConfigError::InvalidQueryTimeout)
        );

        let config = base
            .with_interval(Duration::from_secs(5))
            .and_then(|c| c.with_query_timeout(Duration::from_millis(500)))
            .unwrap();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.query_timeout, Duration::from_millis(500));
    }

    #[test]
    fn collection_config_defaults() {
        let config = CollectionConfig::new(CatalogFilter::default(), DEFAULT_ROW_LIMIT).unwrap();
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.query_timeout, Duration::from_secs(30));
        assert!(!config.verbose);
        assert!(!config.prune_stale);
        assert_eq!(config.filter.sort_field, SortField::TotalSize);
        assert_eq!(config.filter.sort_order, SortOrder::Desc);
    }

    #[test]
    fn connection_options_debug_hides_password() {
        let opts = ConnectionOptions {
            host: "db".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", opts);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
    }
}
