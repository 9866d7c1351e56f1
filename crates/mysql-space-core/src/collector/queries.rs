//! SQL query builder for `information_schema.tables`.

use crate::config::CatalogFilter;

/// Schemas that belong to the server itself and are never reported.
pub const SYSTEM_SCHEMAS: [&str; 3] = ["mysql", "information_schema", "performance_schema"];

/// A rendered catalog query plus the values for its filter placeholders.
///
/// The row limit is always the final placeholder and is bound by the executor
/// after `params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub sql: String,
    /// Filter values in placeholder order: databases first, then tables.
    pub params: Vec<String>,
    /// The filter this query was rendered from.
    pub filter: CatalogFilter,
}

impl CatalogQuery {
    /// Number of `?` placeholders in `sql`, including the row limit.
    pub fn placeholder_count(&self) -> usize {
        self.params.len() + 1
    }
}

/// Renders the catalog query for `filter`.
///
/// Only base tables are selected: views carry NULL sizes.
///
/// Filter values are never interpolated: each becomes its own `?` placeholder.
/// Sort field and order come from closed enums, so the ordering clause only ever
/// contains known column names and keywords.
pub fn build_catalog_query(filter: &CatalogFilter) -> CatalogQuery {
    let system_schemas = SYSTEM_SCHEMAS
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        r#"
            SELECT
                CAST(TABLE_SCHEMA AS CHAR) AS TABLE_SCHEMA,
                CAST(TABLE_NAME AS CHAR) AS TABLE_NAME,
                CAST(TABLE_ROWS AS UNSIGNED) AS TABLE_ROWS,
                CAST(DATA_LENGTH AS UNSIGNED) AS DATA_LENGTH,
                CAST(INDEX_LENGTH AS UNSIGNED) AS INDEX_LENGTH,
                CAST(DATA_FREE AS UNSIGNED) AS DATA_FREE,
                CAST(DATA_LENGTH + INDEX_LENGTH AS UNSIGNED) AS TOTAL_SIZE
            FROM information_schema.tables
            WHERE TABLE_SCHEMA NOT IN ({system_schemas})
            AND TABLE_TYPE = 'BASE TABLE'"#
    );

    let mut params = Vec::with_capacity(filter.databases.len() + filter.tables.len());

    if !filter.databases.is_empty() {
        sql.push_str(&format!(
            "\n            AND TABLE_SCHEMA IN ({})",
            placeholders(filter.databases.len())
        ));
        params.extend(filter.databases.iter().cloned());
    }

    if !filter.tables.is_empty() {
        sql.push_str(&format!(
            "\n            AND TABLE_NAME IN ({})",
            placeholders(filter.tables.len())
        ));
        params.extend(filter.tables.iter().cloned());
    }

    sql.push_str(&format!(
        "\n            ORDER BY {} {}\n            LIMIT ?\n",
        filter.sort_field.column(),
        filter.sort_order.keyword()
    ));

    CatalogQuery {
        sql,
        params,
        filter: filter.clone(),
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
