//! Metadata endpoint handlers: table listings, entity schemas, enums.

use crate::auth::AuthClaims;
use crate::error::AppError;
use crate::meta::catalog;
use crate::schema::entity_schema;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value as JsonValue;

pub async fn list_tables(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
) -> Result<Json<Vec<String>>, AppError> {
    let pool = state.pools.get(&claims.role).await?;
    let tables = state
        .engine
        .schema()
        .visible_tables(&pool, &claims.role)
        .await?;
    Ok(Json(tables.as_ref().clone()))
}

pub async fn table_schema(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Path(table): Path<String>,
) -> Result<Json<JsonValue>, AppError> {
    let pool = state.pools.get(&claims.role).await?;
    let schema = state.engine.schema();
    let table = schema.validate_table(&pool, &claims.role, &table).await?;
    let columns = schema.table_columns(&pool, &claims.role, &table).await?;
    Ok(Json(entity_schema(&table, &columns)))
}

pub async fn list_enum_types(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
) -> Result<Json<Vec<String>>, AppError> {
    let pool = state.pools.get(&claims.role).await?;
    Ok(Json(catalog::fetch_enum_types(&pool).await?))
}

pub async fn list_enum_labels(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Path(enum_type): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let pool = state.pools.get(&claims.role).await?;
    Ok(Json(catalog::fetch_enum_labels(&pool, &enum_type).await?))
}
