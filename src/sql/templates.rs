//! Per-table statement synthesis. A `TableQueries` snapshot holds everything
//! needed to render the four CRUD statements without touching the database
//! again; `TemplateCache` memoizes snapshots for one TTL window.

use crate::error::AppError;
use crate::meta::descriptor::{primary_key_columns, ColumnDescriptor};
use crate::meta::{SchemaCache, TtlCache};
use crate::sql::builder;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Statement skeletons. `{records}` is a multi-row VALUES body, the rest are
/// identifier fragments rendered by `builder`.
pub struct CrudTemplates;

impl CrudTemplates {
    pub const INSERT: &'static str =
        "INSERT INTO {target} ({columns}) VALUES {records} RETURNING *;";
    pub const SELECT: &'static str = "SELECT {columns} FROM {target} {tail};";
    pub const DELETE: &'static str = "DELETE FROM {target} {tail} RETURNING *;";
    pub const UPDATE: &'static str = "WITH cte ({columns}) AS (VALUES {records}) \
         UPDATE {target} SET {set_clause} FROM cte WHERE {match_clause} RETURNING *;";
}

fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{}}}", name), value);
    }
    out
}

/// Immutable per-table statement factory: validated column names, primary-key
/// composition, and declared types for CTE casts.
#[derive(Clone, Debug)]
pub struct TableQueries {
    pub target: String,
    pub table: String,
    pub columns: Vec<String>,
    pub pk_columns: Vec<String>,
    pub updatable_columns: Vec<String>,
    column_types: HashMap<String, String>,
}

impl TableQueries {
    pub fn from_columns(
        schema: &str,
        table: &str,
        columns: &[ColumnDescriptor],
    ) -> Result<Self, AppError> {
        if columns.is_empty() {
            return Err(AppError::NoSchema(table.to_string()));
        }
        let pk_columns = primary_key_columns(table, columns)?;
        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let updatable_columns = names
            .iter()
            .filter(|n| !pk_columns.contains(n))
            .cloned()
            .collect();
        let column_types = columns
            .iter()
            .map(|c| (c.name.clone(), c.data_type.clone()))
            .collect();
        Ok(TableQueries {
            target: format!(
                "{}.{}",
                crate::ident::quoted(schema),
                crate::ident::quoted(table)
            ),
            table: table.to_string(),
            columns: names,
            pk_columns,
            updatable_columns,
            column_types,
        })
    }

    pub fn column_types(&self) -> &HashMap<String, String> {
        &self.column_types
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    fn type_of(&self, column: &str) -> String {
        self.column_types
            .get(column)
            .cloned()
            .unwrap_or_else(|| "text".to_string())
    }

    /// Column order of one UPDATE parameter row: primary keys first, then the
    /// columns being set.
    pub fn update_row_columns(&self, update_columns: &[String]) -> Vec<String> {
        let mut row = self.pk_columns.clone();
        row.extend(update_columns.iter().cloned());
        row
    }

    /// Every placeholder is cast to the column's declared type. Bound values
    /// declare generic wire types (text labels for enums, int8 for any
    /// integer), so without the cast the statement can fail at prepare.
    pub fn insert_sql(&self, insert_columns: &[String], record_count: usize) -> String {
        let types: Vec<String> = insert_columns.iter().map(|c| self.type_of(c)).collect();
        let casts: Vec<Option<&str>> = types.iter().map(|t| Some(t.as_str())).collect();
        render(
            CrudTemplates::INSERT,
            &[
                ("target", self.target.as_str()),
                ("columns", &builder::column_list(insert_columns)),
                ("records", &builder::values_rows(record_count, &casts)),
            ],
        )
    }

    /// Filters are equality-only conjunctions; LIMIT/OFFSET always trail so
    /// unfiltered listings stay bounded.
    pub fn select_sql(
        &self,
        projection: &[String],
        filter_columns: &[String],
        limit: i64,
        offset: i64,
    ) -> String {
        let columns = if projection.is_empty() {
            "*".to_string()
        } else {
            builder::column_list(projection)
        };
        let paging = format!("LIMIT {} OFFSET {}", limit, offset);
        let tail = if filter_columns.is_empty() {
            paging
        } else {
            format!(
                "WHERE {} {}",
                builder::equality_conjunction(filter_columns, 1, |c| self.type_of(c)),
                paging
            )
        };
        render(
            CrudTemplates::SELECT,
            &[
                ("target", self.target.as_str()),
                ("columns", &columns),
                ("tail", &tail),
            ],
        )
    }

    /// Rows are addressed by full primary-key tuples only.
    pub fn delete_sql(&self, record_count: usize) -> String {
        let tail = format!(
            "WHERE {}",
            builder::pk_disjunction(&self.pk_columns, record_count, |c| self.type_of(c))
        );
        render(
            CrudTemplates::DELETE,
            &[("target", self.target.as_str()), ("tail", &tail)],
        )
    }

    /// CTE-driven bulk update. The VALUES literals carry no inherent type, so
    /// every placeholder is cast to the column's declared type and the join
    /// predicate casts both sides.
    pub fn update_sql(&self, update_columns: &[String], record_count: usize) -> String {
        let row_columns = self.update_row_columns(update_columns);
        let types: Vec<String> = row_columns.iter().map(|c| self.type_of(c)).collect();
        let casts: Vec<Option<&str>> = types.iter().map(|t| Some(t.as_str())).collect();
        render(
            CrudTemplates::UPDATE,
            &[
                ("columns", &builder::column_list(&row_columns)),
                ("records", &builder::values_rows(record_count, &casts)),
                ("target", self.target.as_str()),
                ("set_clause", &builder::cte_set_clause(update_columns)),
                (
                    "match_clause",
                    &builder::cte_pk_match(&self.table, &self.pk_columns, |c| self.type_of(c)),
                ),
            ],
        )
    }
}

/// TTL-bounded cache of `TableQueries`, keyed by table name. Entries are
/// derived from the schema cache, so both expire on the same clock and a
/// schema change is picked up within one window.
pub struct TemplateCache {
    cache: TtlCache<String, Arc<TableQueries>>,
    schema: String,
}

impl TemplateCache {
    pub fn new(ttl: Duration, schema: impl Into<String>) -> Self {
        TemplateCache {
            cache: TtlCache::new(ttl),
            schema: schema.into(),
        }
    }

    /// Snapshot for a table that already passed `SchemaCache::validate_table`.
    pub async fn queries(
        &self,
        schema_cache: &SchemaCache,
        pool: &PgPool,
        role: &str,
        table: &str,
    ) -> Result<Arc<TableQueries>, AppError> {
        if let Some(hit) = self.cache.get(table).await {
            return Ok(hit);
        }
        let columns = schema_cache.table_columns(pool, role, table).await?;
        let queries = Arc::new(TableQueries::from_columns(&self.schema, table, &columns)?);
        self.cache.insert(table.to_string(), queries.clone()).await;
        Ok(queries)
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
    }
}
