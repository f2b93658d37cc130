//! Closed value model for dynamic payloads. Everything that crosses the
//! gateway — request fields, bind parameters, returned cells — is a
//! `FieldValue`, so SQL generation never reflects over raw JSON.

use crate::error::AppError;
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// One dynamically typed field value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(uuid::Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Json(JsonValue),
}

/// Ordered field name -> value map. Order matters: the first record of a bulk
/// insert defines the column order of the generated VALUES list.
pub type FieldMap = IndexMap<String, FieldValue>;

impl FieldValue {
    /// Build from decoded JSON. Strings stay text here; coercion to typed
    /// UUIDs, dates and so on happens once the column's declared type is
    /// known, so a uuid-shaped string aimed at a text column stays a string.
    pub fn from_json(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Int(i)
                } else {
                    FieldValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            JsonValue::String(s) => FieldValue::Text(s),
            other @ (JsonValue::Array(_) | JsonValue::Object(_)) => FieldValue::Json(other),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Bool(b) => JsonValue::Bool(*b),
            FieldValue::Int(i) => JsonValue::Number((*i).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            FieldValue::Text(s) => JsonValue::String(s.clone()),
            FieldValue::Uuid(u) => JsonValue::String(u.to_string()),
            FieldValue::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            FieldValue::Timestamp(t) => {
                JsonValue::String(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            FieldValue::Json(j) => j.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = JsonValue::deserialize(deserializer)?;
        Ok(FieldValue::from_json(v))
    }
}

impl<'q> Encode<'q, Postgres> for FieldValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            FieldValue::Null => <Option<i32> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            FieldValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            FieldValue::Int(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            FieldValue::Float(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            FieldValue::Text(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s_ref, buf)?
            }
            FieldValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf)?,
            FieldValue::Date(d) => <NaiveDate as Encode<Postgres>>::encode_by_ref(d, buf)?,
            FieldValue::Timestamp(t) => {
                <NaiveDateTime as Encode<Postgres>>::encode_by_ref(t, buf)?
            }
            FieldValue::Json(v) => <JsonValue as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            FieldValue::Null => return None,
            FieldValue::Bool(_) => PgTypeInfo::with_name("BOOL"),
            FieldValue::Int(_) => PgTypeInfo::with_name("INT8"),
            FieldValue::Float(_) => PgTypeInfo::with_name("FLOAT8"),
            FieldValue::Text(_) => PgTypeInfo::with_name("TEXT"),
            FieldValue::Uuid(_) => PgTypeInfo::with_name("UUID"),
            FieldValue::Date(_) => PgTypeInfo::with_name("DATE"),
            FieldValue::Timestamp(_) => PgTypeInfo::with_name("TIMESTAMP"),
            FieldValue::Json(_) => PgTypeInfo::with_name("JSONB"),
        })
    }
}

impl sqlx::Type<Postgres> for FieldValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

const DATE_FAMILY: &[&str] = &[
    "date",
    "timestamp",
    "timestamptz",
    "timestamp with time zone",
    "timestamp without time zone",
];
const INT_FAMILY: &[&str] = &["integer", "int", "int2", "int4", "int8", "smallint", "bigint"];
const NUMERIC_FAMILY: &[&str] = &["numeric", "decimal"];
const JSON_FAMILY: &[&str] = &["json", "jsonb"];

/// Coerce textual values into the concrete type implied by each column's
/// declared SQL type. Fields absent from the type map, and values that are
/// already typed, pass through unchanged. Idempotent for every branch.
pub fn coerce_fields(
    fields: FieldMap,
    column_types: &std::collections::HashMap<String, String>,
) -> Result<FieldMap, AppError> {
    let mut out = FieldMap::with_capacity(fields.len());
    for (name, value) in fields {
        let coerced = match (&value, column_types.get(&name)) {
            (FieldValue::Text(s), Some(ty)) => coerce_text(&name, s, &ty.to_lowercase())?,
            _ => value,
        };
        out.insert(name, coerced);
    }
    Ok(out)
}

fn coerce_text(field: &str, s: &str, col_type: &str) -> Result<FieldValue, AppError> {
    if DATE_FAMILY.contains(&col_type) {
        return parse_temporal(field, s, col_type);
    }
    if INT_FAMILY.contains(&col_type) {
        return s.parse::<i64>().map(FieldValue::Int).map_err(|_| {
            AppError::InvalidFormat {
                field: field.to_string(),
                expected: "integer",
                value: s.to_string(),
            }
        });
    }
    if NUMERIC_FAMILY.contains(&col_type) {
        return s.parse::<f64>().map(FieldValue::Float).map_err(|_| {
            AppError::InvalidFormat {
                field: field.to_string(),
                expected: "numeric",
                value: s.to_string(),
            }
        });
    }
    if col_type == "boolean" || col_type == "bool" {
        return match s.to_lowercase().as_str() {
            "true" => Ok(FieldValue::Bool(true)),
            "false" => Ok(FieldValue::Bool(false)),
            _ => Err(AppError::InvalidFormat {
                field: field.to_string(),
                expected: "boolean",
                value: s.to_string(),
            }),
        };
    }
    if col_type == "uuid" {
        return uuid::Uuid::parse_str(s).map(FieldValue::Uuid).map_err(|_| {
            AppError::InvalidFormat {
                field: field.to_string(),
                expected: "uuid",
                value: s.to_string(),
            }
        });
    }
    if JSON_FAMILY.contains(&col_type) {
        return serde_json::from_str(s).map(FieldValue::Json).map_err(|_| {
            AppError::InvalidFormat {
                field: field.to_string(),
                expected: "json",
                value: s.to_string(),
            }
        });
    }
    Ok(FieldValue::Text(s.to_string()))
}

/// Datetime format first, then bare date; first success wins.
fn parse_temporal(field: &str, s: &str, col_type: &str) -> Result<FieldValue, AppError> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(if col_type == "date" {
            FieldValue::Date(dt.date())
        } else {
            FieldValue::Timestamp(dt)
        });
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(if col_type == "date" {
            FieldValue::Date(d)
        } else {
            FieldValue::Timestamp(d.and_hms_opt(0, 0, 0).expect("midnight is valid"))
        });
    }
    Err(AppError::InvalidFormat {
        field: field.to_string(),
        expected: "date",
        value: s.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn types(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn map(pairs: Vec<(&str, FieldValue)>) -> FieldMap {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn json_round_trip_keeps_natural_shapes() {
        let v: FieldValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, FieldValue::Int(42));
        let v: FieldValue = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(v, FieldValue::Text("hello".into()));
        let v: FieldValue = serde_json::from_str("{\"a\":1}").unwrap();
        assert!(matches!(v, FieldValue::Json(_)));
        assert_eq!(serde_json::to_string(&FieldValue::Int(42)).unwrap(), "42");
    }

    #[test]
    fn uuid_detection_follows_the_column_type() {
        let id = "0a0b0c0d-0000-4000-8000-000000000001";
        let out = coerce_fields(
            map(vec![("id", FieldValue::Text(id.into()))]),
            &types(&[("id", "uuid")]),
        )
        .unwrap();
        assert_eq!(out["id"], FieldValue::Uuid(uuid::Uuid::parse_str(id).unwrap()));

        // a uuid-shaped string aimed at a text column is just a string
        let out = coerce_fields(
            map(vec![("note", FieldValue::Text(id.into()))]),
            &types(&[("note", "text")]),
        )
        .unwrap();
        assert_eq!(out["note"], FieldValue::Text(id.into()));

        let err = coerce_fields(
            map(vec![("id", FieldValue::Text("not-a-uuid".into()))]),
            &types(&[("id", "uuid")]),
        );
        assert!(matches!(err, Err(AppError::InvalidFormat { .. })));
    }

    #[test]
    fn date_column_accepts_both_formats() {
        let types = types(&[("born", "date")]);
        let out = coerce_fields(map(vec![("born", FieldValue::Text("2024-01-01".into()))]), &types)
            .unwrap();
        assert_eq!(
            out["born"],
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        let out = coerce_fields(
            map(vec![("born", FieldValue::Text("2024-01-01T10:30:00".into()))]),
            &types,
        )
        .unwrap();
        assert_eq!(
            out["born"],
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
    }

    #[test]
    fn timestamp_column_gets_midnight_for_bare_dates() {
        let types = types(&[("at", "timestamptz")]);
        let out = coerce_fields(map(vec![("at", FieldValue::Text("2015-01-01".into()))]), &types)
            .unwrap();
        assert_eq!(
            out["at"],
            FieldValue::Timestamp(
                NaiveDate::from_ymd_opt(2015, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            )
        );
    }

    #[test]
    fn boolean_is_case_insensitive_and_strict() {
        let types = types(&[("ok", "boolean")]);
        let out = coerce_fields(map(vec![("ok", FieldValue::Text("TRUE".into()))]), &types).unwrap();
        assert_eq!(out["ok"], FieldValue::Bool(true));
        let err = coerce_fields(map(vec![("ok", FieldValue::Text("yes".into()))]), &types);
        assert!(matches!(err, Err(AppError::InvalidFormat { .. })));
    }

    #[test]
    fn bad_integer_fails() {
        let types = types(&[("n", "int4")]);
        let err = coerce_fields(map(vec![("n", FieldValue::Text("abc".into()))]), &types);
        assert!(matches!(err, Err(AppError::InvalidFormat { .. })));
    }

    #[test]
    fn unknown_fields_and_typed_values_pass_through() {
        let types = types(&[("n", "int4")]);
        let out = coerce_fields(
            map(vec![
                ("n", FieldValue::Int(7)),
                ("other", FieldValue::Text("keep".into())),
            ]),
            &types,
        )
        .unwrap();
        assert_eq!(out["n"], FieldValue::Int(7));
        assert_eq!(out["other"], FieldValue::Text("keep".into()));
    }

    #[test]
    fn json_column_parses_text() {
        let types = types(&[("doc", "jsonb")]);
        let out = coerce_fields(
            map(vec![("doc", FieldValue::Text("{\"a\": [1, 2]}".into()))]),
            &types,
        )
        .unwrap();
        assert!(matches!(out["doc"], FieldValue::Json(_)));
        let err = coerce_fields(map(vec![("doc", FieldValue::Text("{nope".into()))]), &types);
        assert!(matches!(err, Err(AppError::InvalidFormat { .. })));
    }
}
