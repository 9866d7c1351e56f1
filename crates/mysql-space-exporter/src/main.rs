//! mysql-space-exporter - MySQL table size exporter for Prometheus.
//!
//! Periodically reads `information_schema.tables` and exposes per-table row
//! counts and sizes on `/metrics`.

mod env_file;
mod handlers;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use clap::builder::FalseyValueParser;
use tokio::sync::watch;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use mysql_space_core::collector::{CatalogSource, MySqlSource, TableCollector};
use mysql_space_core::config::{
    CatalogFilter, CollectionConfig, ConnectionOptions, SortField, SortOrder,
};
use mysql_space_core::error::ConfigError;
use mysql_space_core::metrics::TableMetrics;

use env_file::{DEFAULT_ENV_FILE, load_env_file};

// ============================================================
// CLI
// ============================================================

#[derive(Parser, Debug)]
#[command(
    name = "mysql-space-exporter",
    about = "MySQL table size exporter for Prometheus",
    version = mysql_space_core::VERSION
)]
struct Args {
    /// Load environment variables from this file.
    /// Defaults to ./.env when present. Existing environment variables win.
    #[arg(short = 'E', long, value_name = "FILE")]
    dotenv: Option<PathBuf>,

    /// Port for the metrics endpoint.
    #[arg(long, default_value_t = 9107, env = "SERVER_PORT")]
    server_port: u16,

    /// Database host.
    #[arg(short = 'H', long, default_value = "localhost", env = "DB_HOST")]
    host: String,

    /// Database port.
    #[arg(short = 'P', long, default_value_t = 3306, env = "DB_PORT")]
    port: u16,

    /// Database user.
    #[arg(short, long, default_value = "root", env = "DB_USER")]
    user: String,

    /// Database password.
    #[arg(short, long, default_value = "", env = "DB_PASSWD", hide_env_values = true)]
    password: String,

    /// Database filter, comma separated.
    #[arg(long, default_value = "", env = "DB_FILTER")]
    db_filter: String,

    /// Table filter, comma separated.
    #[arg(long, default_value = "", env = "TABLE_FILTER")]
    table_filter: String,

    /// Maximum number of tables reported per cycle.
    #[arg(long, default_value_t = 200, env = "OUT_LIMIT")]
    limit: u32,

    /// Sort field: TABLE_SCHEMA, TABLE_NAME, TABLE_ROWS, DATA_LENGTH,
    /// INDEX_LENGTH, DATA_FREE or TOTAL_SIZE.
    #[arg(long, default_value = "TOTAL_SIZE", env = "SORT_FIELD")]
    sort_field: SortField,

    /// Sort order: ASC or DESC.
    #[arg(long, default_value = "DESC", env = "SORT_ORDER")]
    sort_order: SortOrder,

    /// Log a summary of every collection cycle.
    #[arg(long, env = "ENABLE_LOGGING", value_parser = FalseyValueParser::new())]
    enable_logging: bool,

    /// Seconds between the end of one collection cycle and the start of the next.
    #[arg(long, default_value_t = 60, env = "COLLECT_INTERVAL")]
    interval: u64,

    /// Seconds before a catalog query is abandoned.
    #[arg(long, default_value_t = 30, env = "QUERY_TIMEOUT")]
    query_timeout: u64,

    /// Remove series for tables that disappeared from the catalog.
    #[arg(long, env = "PRUNE_STALE", value_parser = FalseyValueParser::new())]
    prune_stale: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn collection_config(&self) -> Result<CollectionConfig, ConfigError> {
        let filter = CatalogFilter::from_lists(
            &self.db_filter,
            &self.table_filter,
            self.sort_field,
            self.sort_order,
        );
        Ok(CollectionConfig::new(filter, self.limit)?
            .with_interval(Duration::from_secs(self.interval))?
            .with_query_timeout(Duration::from_secs(self.query_timeout))?
            .with_verbose(self.enable_logging)
            .with_prune_stale(self.prune_stale))
    }

    fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

/// Initializes the tracing subscriber. Default level is INFO; `RUST_LOG` adds directives.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["mysql_space_exporter", "mysql_space_core"] {
        if let Ok(directive) = format!("{target}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    // Environment file values only fill in what flags and the real environment
    // left unset, so arguments are parsed again after loading it.
    let args = match load_env_file(args.dotenv.as_deref(), Path::new(DEFAULT_ENV_FILE)) {
        Ok(Some(path)) => {
            info!(path = %path.display(), "loaded environment file");
            Args::parse()
        }
        Ok(None) => args,
        Err(e) => {
            warn!(error = %e, "could not load environment file");
            args
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };

    runtime.block_on(async_main(args));
}

async fn async_main(args: Args) {
    info!(version = mysql_space_core::VERSION, "mysql-space-exporter starting");

    let config = match args.collection_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            process::exit(1);
        }
    };
    info!(
        databases = ?config.filter.databases,
        tables = ?config.filter.tables,
        sort = %config.filter.sort_field,
        order = %config.filter.sort_order,
        limit = config.row_limit,
        interval_secs = config.interval.as_secs(),
        prune_stale = config.prune_stale,
        "collection config"
    );

    let metrics = match TableMetrics::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(e) => {
            error!(error = %e, "failed to register metrics");
            process::exit(1);
        }
    };

    let source = MySqlSource::connect_lazy(&args.connection_options());
    if let Err(e) = source.ping().await {
        error!(host = %args.host, port = args.port, error = %e, "failed to connect to MySQL");
        process::exit(1);
    }
    info!(host = %args.host, port = args.port, "connected to MySQL");

    // First cycle runs before serving so the first scrape is never empty.
    let mut collector = TableCollector::new(source, metrics.clone(), config);
    if collector.tick().await.is_none() {
        warn!("initial metrics collection failed");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let collector_task = tokio::spawn(collector.run(shutdown_rx));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.server_port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };
    info!(%addr, "listening");

    let server = axum::serve(listener, handlers::router(metrics)).with_graceful_shutdown(async {
        shutdown_signal().await;
        info!("received shutdown signal");
    });
    if let Err(e) = server.await {
        error!(error = %e, "server error");
    }

    // The collector finishes a running cycle before it stops.
    let _ = shutdown_tx.send(true);
    match collector_task.await {
        Ok(source) => source.close().await,
        Err(e) => error!(error = %e, "collection task failed"),
    }

    info!("shutdown complete");
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut full = vec!["mysql-space-exporter"];
        full.extend_from_slice(args);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn args_build_collection_config() {
        let args = parse(&[
            "--db-filter",
            "shop, crm",
            "--table-filter",
            "orders",
            "--limit",
            "2",
            "--sort-field",
            "table_rows",
            "--sort-order",
            "asc",
            "--enable-logging",
            "--prune-stale",
            "--interval",
            "15",
        ]);
        let config = args.collection_config().unwrap();

        assert_eq!(config.filter.databases, vec!["shop", "crm"]);
        assert_eq!(config.filter.tables, vec!["orders"]);
        assert_eq!(config.filter.sort_field, SortField::TableRows);
        assert_eq!(config.filter.sort_order, SortOrder::Asc);
        assert_eq!(config.row_limit, 2);
        assert_eq!(config.interval, Duration::from_secs(15));
        assert!(config.verbose);
        assert!(config.prune_stale);
    }

    #[test]
    fn short_connection_flags() {
        let args = parse(&["-H", "db", "-P", "3307", "-u", "exporter", "-p", "secret"]);
        let opts = args.connection_options();
        assert_eq!(opts.host, "db");
        assert_eq!(opts.port, 3307);
        assert_eq!(opts.user, "exporter");
        assert_eq!(opts.password, "secret");
    }

    #[test]
    fn rejects_unknown_sort_field() {
        let result = Args::try_parse_from(["mysql-space-exporter", "--sort-field", "1; DROP TABLE x"]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_limit() {
        let args = parse(&["--limit", "0"]);
        assert_eq!(args.collection_config(), Err(ConfigError::InvalidRowLimit));
    }

    #[test]
    fn rejects_zero_interval_and_timeout() {
        let args = parse(&["--interval", "0"]);
        assert_eq!(args.collection_config(), Err(ConfigError::InvalidInterval));

        let args = parse(&["--query-timeout", "0"]);
        assert_eq!(args.collection_config(), Err(ConfigError::InvalidQueryTimeout));
    }

    #[test]
    fn boolean_env_flags_accept_numeric_values() {
        // SAFETY: no other test depends on these two variables being unset.
        unsafe {
            std::env::set_var("ENABLE_LOGGING", "1");
            std::env::set_var("PRUNE_STALE", "off");
        }
        let result = Args::try_parse_from(["mysql-space-exporter"]);
        unsafe {
            std::env::remove_var("ENABLE_LOGGING");
            std::env::remove_var("PRUNE_STALE");
        }

        let args = result.unwrap();
        assert!(args.enable_logging);
        assert!(!args.prune_stale);
    }
}
