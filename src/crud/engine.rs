//! CRUD orchestration: table validation, statement planning, execution, and
//! shaping returned rows into keyed records.

use crate::crud::exec::fetch_rows;
use crate::crud::plan::{self, SelectQuery};
use crate::error::AppError;
use crate::meta::SchemaCache;
use crate::records::{keyed_from_row, DataOnly, KeyedData, KeysOnly, Records};
use crate::sql::{TableQueries, TemplateCache};
use crate::value::FieldMap;
use sqlx::PgPool;
use std::sync::Arc;

pub struct CrudEngine {
    schema: Arc<SchemaCache>,
    templates: Arc<TemplateCache>,
}

impl CrudEngine {
    pub fn new(schema: Arc<SchemaCache>, templates: Arc<TemplateCache>) -> Self {
        CrudEngine { schema, templates }
    }

    pub fn schema(&self) -> &Arc<SchemaCache> {
        &self.schema
    }

    pub fn templates(&self) -> &Arc<TemplateCache> {
        &self.templates
    }

    /// Validate an externally supplied table name and fetch its statement
    /// snapshot. Every operation funnels through here first.
    pub async fn table_queries(
        &self,
        pool: &PgPool,
        role: &str,
        table: &str,
    ) -> Result<Arc<TableQueries>, AppError> {
        let table = self.schema.validate_table(pool, role, table).await?;
        self.templates
            .queries(&self.schema, pool, role, &table)
            .await
    }

    pub async fn insert_many(
        &self,
        pool: &PgPool,
        role: &str,
        table: &str,
        payload: Records<DataOnly>,
    ) -> Result<Records<KeyedData>, AppError> {
        let queries = self.table_queries(pool, role, table).await?;
        let expected = payload.len();
        let stmt = plan::plan_insert(&queries, payload)?;
        let rows = fetch_rows(pool, &stmt).await?;
        if rows.len() != expected {
            return Err(AppError::InsertFailed(queries.table.clone()));
        }
        Ok(keyed(rows, &queries))
    }

    /// Filtered listing. An empty result is a valid answer, not an error.
    pub async fn select_many(
        &self,
        pool: &PgPool,
        role: &str,
        table: &str,
        query: SelectQuery,
    ) -> Result<Records<KeyedData>, AppError> {
        let queries = self.table_queries(pool, role, table).await?;
        let stmt = plan::plan_select(&queries, query)?;
        let rows = fetch_rows(pool, &stmt).await?;
        Ok(keyed(rows, &queries))
    }

    pub async fn update_many(
        &self,
        pool: &PgPool,
        role: &str,
        table: &str,
        payload: Records<KeyedData>,
    ) -> Result<Records<KeyedData>, AppError> {
        let queries = self.table_queries(pool, role, table).await?;
        let stmt = plan::plan_update(&queries, payload)?;
        let rows = fetch_rows(pool, &stmt).await?;
        if rows.is_empty() {
            return Err(AppError::NotFound);
        }
        Ok(keyed(rows, &queries))
    }

    pub async fn delete_many(
        &self,
        pool: &PgPool,
        role: &str,
        table: &str,
        payload: Records<KeysOnly>,
    ) -> Result<Records<KeyedData>, AppError> {
        let queries = self.table_queries(pool, role, table).await?;
        let stmt = plan::plan_delete(&queries, payload)?;
        let rows = fetch_rows(pool, &stmt).await?;
        if rows.is_empty() {
            return Err(AppError::NotFound);
        }
        Ok(keyed(rows, &queries))
    }

    pub async fn insert_one(
        &self,
        pool: &PgPool,
        role: &str,
        table: &str,
        record: DataOnly,
    ) -> Result<KeyedData, AppError> {
        let inserted = self
            .insert_many(pool, role, table, Records::one(record))
            .await?;
        first(inserted).ok_or_else(|| AppError::InsertFailed(table.to_string()))
    }

    /// First matching record or `NotFound`. Filters must be non-empty so a
    /// bare single-record read cannot silently return an arbitrary row.
    pub async fn select_one(
        &self,
        pool: &PgPool,
        role: &str,
        table: &str,
        mut query: SelectQuery,
    ) -> Result<KeyedData, AppError> {
        if query.filters.is_empty() {
            return Err(AppError::BadRequest("filters cannot be empty".to_string()));
        }
        query.limit = Some(1);
        let found = self.select_many(pool, role, table, query).await?;
        first(found).ok_or(AppError::NotFound)
    }

    pub async fn update_one(
        &self,
        pool: &PgPool,
        role: &str,
        table: &str,
        record: KeyedData,
    ) -> Result<KeyedData, AppError> {
        let updated = self
            .update_many(pool, role, table, Records::one(record))
            .await?;
        first(updated).ok_or(AppError::NotFound)
    }

    pub async fn delete_one(
        &self,
        pool: &PgPool,
        role: &str,
        table: &str,
        record: KeysOnly,
    ) -> Result<KeyedData, AppError> {
        let deleted = self
            .delete_many(pool, role, table, Records::one(record))
            .await?;
        first(deleted).ok_or(AppError::NotFound)
    }
}

fn keyed(rows: Vec<FieldMap>, queries: &TableQueries) -> Records<KeyedData> {
    Records::new(
        rows.into_iter()
            .map(|row| keyed_from_row(row, &queries.pk_columns))
            .collect(),
    )
}

fn first(records: Records<KeyedData>) -> Option<KeyedData> {
    records.records.into_iter().next()
}
