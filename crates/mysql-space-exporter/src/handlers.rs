//! HTTP request handlers: informational root page and the metrics endpoint.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tracing::error;

use mysql_space_core::metrics::{CONTENT_TYPE, TableMetrics};

const ROOT_PAGE: &str = r#"<html>
<head><title>MySQL Space Exporter</title></head>
<body>
<h1>MySQL Space Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>"#;

pub(crate) fn router(metrics: Arc<TableMetrics>) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/metrics", get(handle_metrics))
        .with_state(metrics)
        .layer(CompressionLayer::new())
}

// ============================================================
// Root
// ============================================================

pub(crate) async fn handle_root() -> Html<&'static str> {
    Html(ROOT_PAGE)
}

// ============================================================
// Metrics
// ============================================================

pub(crate) async fn handle_metrics(State(metrics): State<Arc<TableMetrics>>) -> Response {
    match metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use mysql_space_core::collector::{CatalogRow, MockSource, TableCollector};
    use mysql_space_core::config::{CatalogFilter, CollectionConfig};

    async fn get_body(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn root_links_to_metrics() {
        let app = router(Arc::new(TableMetrics::new().unwrap()));
        let (status, content_type, body) = get_body(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/html"));
        assert!(body.contains(r#"<a href="/metrics">"#));
    }

    #[tokio::test]
    async fn metrics_exposes_collected_tables() {
        let metrics = Arc::new(TableMetrics::new().unwrap());
        let config = CollectionConfig::new(CatalogFilter::default(), 2).unwrap();
        let mut collector = TableCollector::new(MockSource::three_tables(), metrics.clone(), config);
        collector.collect_once().await.unwrap();

        let (status, content_type, body) = get_body(router(metrics), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(CONTENT_TYPE));
        assert!(body.contains(r#"mysql_table_total_size_bytes{database="db1",table="t1"} 500"#));
        assert!(body.contains(r#"mysql_table_total_size_bytes{database="db1",table="t2"} 300"#));
        assert!(!body.contains(r#"table="t3""#));
        assert!(!body.contains(r#"database="mysql""#));
        for name in [
            "mysql_table_rows",
            "mysql_table_data_size_bytes",
            "mysql_table_index_size_bytes",
            "mysql_table_data_free_bytes",
        ] {
            assert!(body.contains(&format!("# TYPE {name} gauge")));
        }
    }

    #[tokio::test]
    async fn metrics_reflects_latest_value() {
        let metrics = Arc::new(TableMetrics::new().unwrap());
        let mut row = CatalogRow {
            schema: "shop".to_string(),
            table: "orders".to_string(),
            rows: 1,
            ..Default::default()
        };
        metrics.observe(&row);
        row.rows = 42;
        metrics.observe(&row);

        let (_, _, body) = get_body(router(metrics), "/metrics").await;
        assert!(body.contains(r#"mysql_table_rows{database="shop",table="orders"} 42"#));
    }
}
