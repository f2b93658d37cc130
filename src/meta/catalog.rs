//! Raw catalog introspection. All metadata comes from `meta.*` database
//! functions; each returns plain rows this module maps into structs.

use crate::error::AppError;
use crate::ident::sanitize;
use sqlx::PgPool;

/// One raw metadata row: a (column x constraint) pairing. A column that
/// participates in two constraints appears twice; grouping happens in
/// `descriptor`.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct RawColumnRow {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: String,
    pub column_default: Option<String>,
    pub enum_options: Option<Vec<String>>,
    pub const_type: Option<String>,
    pub ref_schema: Option<String>,
    pub ref_table: Option<String>,
    pub ref_column: Option<String>,
}

impl RawColumnRow {
    pub fn nullable(&self) -> bool {
        self.is_nullable != "NO"
    }
}

/// Kind of statement a role wants to run; visibility is filtered per kind.
#[derive(Clone, Copy, Debug)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Select => "SELECT",
            QueryKind::Insert => "INSERT",
            QueryKind::Update => "UPDATE",
            QueryKind::Delete => "DELETE",
        }
    }
}

/// Tables the role may touch for the given statement kind.
pub async fn fetch_visible_tables(
    pool: &PgPool,
    role: &str,
    kind: QueryKind,
) -> Result<Vec<String>, AppError> {
    let sql = "SELECT table_name FROM meta.get_available_tables($1, $2)";
    tracing::debug!(sql, role, kind = kind.as_str(), "catalog query");
    let names: Vec<String> = sqlx::query_scalar(sql)
        .bind(role)
        .bind(kind.as_str())
        .fetch_all(pool)
        .await
        .map_err(AppError::from_db)?;
    Ok(names)
}

/// Raw per-column metadata for one table, one row per (column x constraint).
pub async fn fetch_relation_metadata(
    pool: &PgPool,
    table: &str,
) -> Result<Vec<RawColumnRow>, AppError> {
    let sql = "SELECT column_name, data_type, is_nullable, column_default, enum_options, \
               const_type, ref_schema, ref_table, ref_column \
               FROM meta.get_relation_metadata($1)";
    tracing::debug!(sql, table, "catalog query");
    let rows: Vec<RawColumnRow> = sqlx::query_as(sql)
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(AppError::from_db)?;
    Ok(rows)
}

/// All enum type names visible to the role's connection.
pub async fn fetch_enum_types(pool: &PgPool) -> Result<Vec<String>, AppError> {
    let sql = "SELECT enum_name FROM meta.get_enum_types()";
    tracing::debug!(sql, "catalog query");
    let names: Vec<String> = sqlx::query_scalar(sql)
        .fetch_all(pool)
        .await
        .map_err(AppError::from_db)?;
    Ok(names)
}

/// Labels of one enum type. The name is sanitized before it reaches the
/// catalog function.
pub async fn fetch_enum_labels(pool: &PgPool, enum_name: &str) -> Result<Vec<String>, AppError> {
    let sql = "SELECT enum_label FROM meta.get_enum_labels($1)";
    let name = sanitize(enum_name);
    tracing::debug!(sql, enum_name = %name, "catalog query");
    let labels: Vec<String> = sqlx::query_scalar(sql)
        .bind(&name)
        .fetch_all(pool)
        .await
        .map_err(AppError::from_db)?;
    Ok(labels)
}
