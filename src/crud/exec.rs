//! Statement execution: bind dynamic parameters, run, and decode returned
//! rows back into the field-value model.

use crate::error::AppError;
use crate::value::{FieldMap, FieldValue};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use sqlx::postgres::{PgConnection, PgPool, PgRow, Postgres};
use sqlx::{Column, Row, TypeInfo};

/// One ready-to-run statement: SQL text with `$n` placeholders and the
/// flattened parameter list in matching order.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

/// Decode one returned row into an ordered field map, dispatching on the
/// column's reported type. Custom types (enums) fall back to a text decode.
pub fn row_to_fields(row: &PgRow) -> Result<FieldMap, AppError> {
    let mut fields = FieldMap::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = cell_to_value(row, idx, column.type_info().name()).map_err(AppError::from_db)?;
        fields.insert(column.name().to_string(), value);
    }
    Ok(fields)
}

fn cell_to_value(row: &PgRow, idx: usize, type_name: &str) -> Result<FieldValue, sqlx::Error> {
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(FieldValue::Bool),
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)?
            .map(|v| FieldValue::Int(v as i64)),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)?
            .map(|v| FieldValue::Int(v as i64)),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(FieldValue::Int),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)?
            .map(|v| FieldValue::Float(v as f64)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx)?.map(FieldValue::Float),
        "NUMERIC" => row
            .try_get::<Option<rust_decimal::Decimal>, _>(idx)?
            .map(|v| FieldValue::Float(v.to_f64().unwrap_or(f64::NAN))),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)?
            .map(FieldValue::Uuid),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)?
            .map(FieldValue::Date),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)?
            .map(FieldValue::Timestamp),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)?
            .map(|v| FieldValue::Timestamp(v.naive_utc())),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(idx)?
            .map(FieldValue::Json),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => row
            .try_get::<Option<String>, _>(idx)?
            .map(FieldValue::Text),
        // Enum and other user-defined types arrive as their label text.
        _ => row
            .try_get_unchecked::<Option<String>, _>(idx)?
            .map(FieldValue::Text),
    };
    Ok(value.unwrap_or(FieldValue::Null))
}

/// Run a statement against any executor and decode every returned row.
pub async fn fetch_rows<'e, E>(executor: E, stmt: &Statement) -> Result<Vec<FieldMap>, AppError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "executing statement");
    let mut query = sqlx::query(&stmt.sql);
    for param in &stmt.params {
        query = query.bind(param.clone());
    }
    let rows = query
        .fetch_all(executor)
        .await
        .map_err(AppError::from_db)?;
    rows.iter().map(row_to_fields).collect()
}

/// Seam between statement planning and the database, so orchestration logic
/// is testable against a fake.
#[async_trait]
pub trait StatementRunner: Send {
    async fn run(&mut self, stmt: &Statement) -> Result<Vec<FieldMap>, AppError>;
}

#[async_trait]
impl StatementRunner for PgConnection {
    async fn run(&mut self, stmt: &Statement) -> Result<Vec<FieldMap>, AppError> {
        fetch_rows(&mut *self, stmt).await
    }
}

#[async_trait]
impl StatementRunner for PgPool {
    async fn run(&mut self, stmt: &Statement) -> Result<Vec<FieldMap>, AppError> {
        fetch_rows(&*self, stmt).await
    }
}
