//! CRUD endpoint handlers: decode the boundary shapes, resolve the caller's
//! pool, and delegate to the engine.

use crate::auth::AuthClaims;
use crate::crud::SelectQuery;
use crate::error::AppError;
use crate::records::{DataOnly, KeyedData, KeysOnly, Records};
use crate::state::AppState;
use crate::value::{FieldMap, FieldValue};
use crate::wizard::{self, WizardResult, WizardStep};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Listing query string: `filters` and `columns` arrive as JSON text inside
/// single query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub filters: Option<String>,
    pub columns: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn parse_filters(raw: Option<&str>) -> Result<FieldMap, AppError> {
    let Some(raw) = raw else {
        return Ok(FieldMap::new());
    };
    let value: JsonValue = serde_json::from_str(raw)
        .map_err(|_| AppError::BadRequest("filters must be a JSON object".to_string()))?;
    match value {
        JsonValue::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, FieldValue::from_json(v)))
            .collect()),
        _ => Err(AppError::BadRequest(
            "filters must be a JSON object".to_string(),
        )),
    }
}

fn parse_columns(raw: Option<&str>) -> Result<Vec<String>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    serde_json::from_str::<Vec<String>>(raw)
        .map_err(|_| AppError::BadRequest("columns must be a JSON array of strings".to_string()))
}

fn select_query(params: ListParams) -> Result<SelectQuery, AppError> {
    Ok(SelectQuery {
        filters: parse_filters(params.filters.as_deref())?,
        projection: parse_columns(params.columns.as_deref())?,
        limit: params.limit,
        offset: params.offset,
    })
}

pub async fn bulk_insert(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Path(table): Path<String>,
    Json(payload): Json<Records<DataOnly>>,
) -> Result<Json<Records<KeyedData>>, AppError> {
    let pool = state.pools.get(&claims.role).await?;
    let inserted = state
        .engine
        .insert_many(&pool, &claims.role, &table, payload)
        .await?;
    Ok(Json(inserted))
}

pub async fn bulk_select(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Path(table): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Records<KeyedData>>, AppError> {
    let pool = state.pools.get(&claims.role).await?;
    let found = state
        .engine
        .select_many(&pool, &claims.role, &table, select_query(params)?)
        .await?;
    Ok(Json(found))
}

pub async fn bulk_update(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Path(table): Path<String>,
    Json(payload): Json<Records<KeyedData>>,
) -> Result<Json<Records<KeyedData>>, AppError> {
    let pool = state.pools.get(&claims.role).await?;
    let updated = state
        .engine
        .update_many(&pool, &claims.role, &table, payload)
        .await?;
    Ok(Json(updated))
}

pub async fn bulk_delete(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Path(table): Path<String>,
    Json(payload): Json<Records<KeysOnly>>,
) -> Result<Json<Records<KeyedData>>, AppError> {
    let pool = state.pools.get(&claims.role).await?;
    let deleted = state
        .engine
        .delete_many(&pool, &claims.role, &table, payload)
        .await?;
    Ok(Json(deleted))
}

pub async fn insert_one(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Path(table): Path<String>,
    Json(record): Json<DataOnly>,
) -> Result<Json<KeyedData>, AppError> {
    let pool = state.pools.get(&claims.role).await?;
    let inserted = state
        .engine
        .insert_one(&pool, &claims.role, &table, record)
        .await?;
    Ok(Json(inserted))
}

pub async fn select_one(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Path(table): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<KeyedData>, AppError> {
    let pool = state.pools.get(&claims.role).await?;
    let found = state
        .engine
        .select_one(&pool, &claims.role, &table, select_query(params)?)
        .await?;
    Ok(Json(found))
}

pub async fn update_one(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Path(table): Path<String>,
    Json(record): Json<KeyedData>,
) -> Result<Json<KeyedData>, AppError> {
    let pool = state.pools.get(&claims.role).await?;
    let updated = state
        .engine
        .update_one(&pool, &claims.role, &table, record)
        .await?;
    Ok(Json(updated))
}

pub async fn delete_one(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Path(table): Path<String>,
    Json(record): Json<KeysOnly>,
) -> Result<Json<KeyedData>, AppError> {
    let pool = state.pools.get(&claims.role).await?;
    let deleted = state
        .engine
        .delete_one(&pool, &claims.role, &table, record)
        .await?;
    Ok(Json(deleted))
}

/// The path's table names the wizard's main entity; its resolved key is the
/// response's headline `keys`.
pub async fn run_wizard(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Path(table): Path<String>,
    Json(steps): Json<Vec<WizardStep>>,
) -> Result<Json<WizardResult>, AppError> {
    let pool = state.pools.get(&claims.role).await?;
    let result = wizard::run_wizard(&state.engine, &pool, &claims.role, &table, steps).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_parse_into_field_maps() {
        let map = parse_filters(Some(r#"{"name":"A","age":3}"#)).unwrap();
        assert_eq!(map["name"], FieldValue::Text("A".into()));
        assert_eq!(map["age"], FieldValue::Int(3));
        assert!(parse_filters(None).unwrap().is_empty());
        assert!(matches!(
            parse_filters(Some("[1,2]")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn columns_parse_into_names() {
        assert_eq!(
            parse_columns(Some(r#"["id","name"]"#)).unwrap(),
            vec!["id", "name"]
        );
        assert!(matches!(
            parse_columns(Some(r#"{"a":1}"#)),
            Err(AppError::BadRequest(_))
        ));
    }
}
