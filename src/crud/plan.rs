//! Request validation and statement planning. Everything here is pure:
//! payloads go in, a `Statement` comes out or a typed error explains what the
//! caller got wrong. No database access.

use crate::crud::exec::Statement;
use crate::error::AppError;
use crate::records::{DataOnly, KeyedData, KeysOnly, Records};
use crate::sql::TableQueries;
use crate::value::{coerce_fields, FieldMap, FieldValue};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Listing parameters: equality filters, optional projection, paging.
#[derive(Clone, Debug, Default)]
pub struct SelectQuery {
    pub filters: FieldMap,
    pub projection: Vec<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn require_column(queries: &TableQueries, name: &str) -> Result<(), AppError> {
    if queries.has_column(name) {
        Ok(())
    } else {
        Err(AppError::InvalidColumn(name.to_string()))
    }
}

/// Every record must carry exactly the primary-key tuple: no key column
/// missing, nothing besides key columns present.
fn require_key_tuple(
    queries: &TableQueries,
    index: usize,
    keys: &FieldMap,
) -> Result<(), AppError> {
    for name in keys.keys() {
        require_column(queries, name)?;
        if !queries.pk_columns.contains(name) {
            return Err(AppError::InvalidColumn(name.clone()));
        }
    }
    for pk in &queries.pk_columns {
        if !keys.contains_key(pk) {
            return Err(AppError::BadRequest(format!(
                "record {} is missing key column \"{}\"",
                index, pk
            )));
        }
    }
    Ok(())
}

/// Plan a bulk insert. The first record's fields fix the column order; every
/// other record must supply exactly the same column set.
pub fn plan_insert(
    queries: &TableQueries,
    payload: Records<DataOnly>,
) -> Result<Statement, AppError> {
    if payload.is_empty() {
        return Err(AppError::EmptyPayload);
    }
    let columns: Vec<String> = payload.records[0].data.keys().cloned().collect();
    if columns.is_empty() {
        return Err(AppError::EmptyPayload);
    }
    for name in &columns {
        require_column(queries, name)?;
    }
    for (index, record) in payload.records.iter().enumerate().skip(1) {
        if record.data.len() != columns.len()
            || !columns.iter().all(|c| record.data.contains_key(c))
        {
            return Err(AppError::BadRequest(format!(
                "record {} does not match the column set of record 0",
                index
            )));
        }
    }
    let count = payload.len();
    let mut params = Vec::with_capacity(count * columns.len());
    for record in payload.records {
        let mut coerced = coerce_fields(record.data, queries.column_types())?;
        for name in &columns {
            params.push(coerced.shift_remove(name).unwrap_or(FieldValue::Null));
        }
    }
    Ok(Statement {
        sql: queries.insert_sql(&columns, count),
        params,
    })
}

/// Plan a filtered listing. Filters are equality-only; paging is always
/// present so unfiltered listings stay bounded.
pub fn plan_select(queries: &TableQueries, query: SelectQuery) -> Result<Statement, AppError> {
    for name in &query.projection {
        require_column(queries, name)?;
    }
    for name in query.filters.keys() {
        require_column(queries, name)?;
    }
    let limit = match query.limit {
        None => DEFAULT_LIMIT,
        Some(l) if (1..=MAX_LIMIT).contains(&l) => l,
        Some(l) => {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIMIT, l
            )))
        }
    };
    let offset = match query.offset {
        None => 0,
        Some(o) if o >= 0 => o,
        Some(o) => {
            return Err(AppError::BadRequest(format!(
                "offset must not be negative, got {}",
                o
            )))
        }
    };
    let filter_columns: Vec<String> = query.filters.keys().cloned().collect();
    let coerced = coerce_fields(query.filters, queries.column_types())?;
    let params = coerced.into_values().collect();
    Ok(Statement {
        sql: queries.select_sql(&query.projection, &filter_columns, limit, offset),
        params,
    })
}

/// Plan a bulk update. The update column set is the sorted union across
/// records, and every record must supply a value (an explicit null counts)
/// for every column in that union, so no record is partially written by
/// accident.
pub fn plan_update(
    queries: &TableQueries,
    payload: Records<KeyedData>,
) -> Result<Statement, AppError> {
    if payload.is_empty() {
        return Err(AppError::EmptyPayload);
    }
    let mut update_columns: Vec<String> = Vec::new();
    for record in &payload.records {
        for name in record.data.keys() {
            require_column(queries, name)?;
            if queries.pk_columns.contains(name) {
                return Err(AppError::InvalidColumn(name.clone()));
            }
            if !update_columns.contains(name) {
                update_columns.push(name.clone());
            }
        }
    }
    // deterministic statement text regardless of per-record field order
    update_columns.sort();
    if update_columns.is_empty() {
        return Err(AppError::NoColumnsToUpdate);
    }
    for (index, record) in payload.records.iter().enumerate() {
        require_key_tuple(queries, index, &record.keys)?;
        for name in &update_columns {
            if !record.data.contains_key(name) {
                return Err(AppError::BadRequest(format!(
                    "record {} must supply column \"{}\" (use an explicit null to clear it)",
                    index, name
                )));
            }
        }
    }
    let count = payload.len();
    let mut params = Vec::with_capacity(count * (queries.pk_columns.len() + update_columns.len()));
    for record in payload.records {
        let mut keys = coerce_fields(record.keys, queries.column_types())?;
        let mut data = coerce_fields(record.data, queries.column_types())?;
        for pk in &queries.pk_columns {
            params.push(keys.shift_remove(pk).unwrap_or(FieldValue::Null));
        }
        for name in &update_columns {
            params.push(data.shift_remove(name).unwrap_or(FieldValue::Null));
        }
    }
    Ok(Statement {
        sql: queries.update_sql(&update_columns, count),
        params,
    })
}

/// Plan a bulk delete addressed by full primary-key tuples.
pub fn plan_delete(
    queries: &TableQueries,
    payload: Records<KeysOnly>,
) -> Result<Statement, AppError> {
    if payload.is_empty() {
        return Err(AppError::EmptyPayload);
    }
    for (index, record) in payload.records.iter().enumerate() {
        require_key_tuple(queries, index, &record.keys)?;
    }
    let count = payload.len();
    let mut params = Vec::with_capacity(count * queries.pk_columns.len());
    for record in payload.records {
        let mut keys = coerce_fields(record.keys, queries.column_types())?;
        for pk in &queries.pk_columns {
            params.push(keys.shift_remove(pk).unwrap_or(FieldValue::Null));
        }
    }
    Ok(Statement {
        sql: queries.delete_sql(count),
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::descriptor::PRIMARY_KEY;
    use crate::meta::ColumnDescriptor;
    use std::collections::BTreeSet;

    fn desc(name: &str, data_type: &str, pk: bool) -> ColumnDescriptor {
        let mut constraints = BTreeSet::new();
        if pk {
            constraints.insert(PRIMARY_KEY.to_string());
        }
        ColumnDescriptor {
            name: name.into(),
            data_type: data_type.into(),
            nullable: !pk,
            default: None,
            enum_labels: None,
            constraints,
            foreign_keys: Vec::new(),
        }
    }

    fn queries() -> TableQueries {
        TableQueries::from_columns(
            "pi",
            "person",
            &[
                desc("id", "int4", true),
                desc("name", "text", false),
                desc("born", "date", false),
            ],
        )
        .unwrap()
    }

    fn fields(pairs: Vec<(&str, FieldValue)>) -> FieldMap {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn insert_rejects_empty_and_unknown() {
        let q = queries();
        assert!(matches!(
            plan_insert(&q, Records::new(vec![])),
            Err(AppError::EmptyPayload)
        ));
        let bad = Records::one(DataOnly {
            data: fields(vec![("ghost", FieldValue::Int(1))]),
        });
        assert!(matches!(
            plan_insert(&q, bad),
            Err(AppError::InvalidColumn(c)) if c == "ghost"
        ));
    }

    #[test]
    fn insert_rejects_mismatched_column_sets() {
        let q = queries();
        let payload = Records::new(vec![
            DataOnly {
                data: fields(vec![("name", FieldValue::Text("A".into()))]),
            },
            DataOnly {
                data: fields(vec![("born", FieldValue::Text("2024-01-01".into()))]),
            },
        ]);
        assert!(matches!(plan_insert(&q, payload), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn insert_flattens_params_in_first_record_order() {
        let q = queries();
        let payload = Records::new(vec![
            DataOnly {
                data: fields(vec![
                    ("name", FieldValue::Text("A".into())),
                    ("born", FieldValue::Text("2024-01-01".into())),
                ]),
            },
            DataOnly {
                // same set, different order: still binds name first
                data: fields(vec![
                    ("born", FieldValue::Text("2025-02-02".into())),
                    ("name", FieldValue::Text("B".into())),
                ]),
            },
        ]);
        let stmt = plan_insert(&q, payload).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"pi\".\"person\" (\"name\", \"born\") \
             VALUES ($1::text, $2::date), ($3::text, $4::date) RETURNING *;"
        );
        assert_eq!(stmt.params[0], FieldValue::Text("A".into()));
        assert!(matches!(stmt.params[1], FieldValue::Date(_)));
        assert_eq!(stmt.params[2], FieldValue::Text("B".into()));
        assert!(matches!(stmt.params[3], FieldValue::Date(_)));
    }

    #[test]
    fn select_defaults_and_bounds() {
        let q = queries();
        let stmt = plan_select(&q, SelectQuery::default()).unwrap();
        assert!(stmt.sql.ends_with("LIMIT 20 OFFSET 0;"));
        assert!(stmt.params.is_empty());

        let err = plan_select(
            &q,
            SelectQuery {
                limit: Some(500),
                ..SelectQuery::default()
            },
        );
        assert!(matches!(err, Err(AppError::BadRequest(_))));

        let err = plan_select(
            &q,
            SelectQuery {
                offset: Some(-1),
                ..SelectQuery::default()
            },
        );
        assert!(matches!(err, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn select_coerces_filter_values() {
        let q = queries();
        let stmt = plan_select(
            &q,
            SelectQuery {
                filters: fields(vec![("born", FieldValue::Text("2024-01-01".into()))]),
                ..SelectQuery::default()
            },
        )
        .unwrap();
        assert!(stmt.sql.contains("WHERE \"born\" = $1::date"));
        assert!(matches!(stmt.params[0], FieldValue::Date(_)));
    }

    #[test]
    fn update_requires_full_union_and_key_tuple() {
        let q = queries();
        let payload = Records::new(vec![
            KeyedData {
                keys: fields(vec![("id", FieldValue::Int(1))]),
                data: fields(vec![("name", FieldValue::Text("A".into()))]),
            },
            KeyedData {
                keys: fields(vec![("id", FieldValue::Int(2))]),
                data: fields(vec![("born", FieldValue::Text("2024-01-01".into()))]),
            },
        ]);
        // each record covers only part of the union {name, born}
        assert!(matches!(plan_update(&q, payload), Err(AppError::BadRequest(_))));

        let missing_key = Records::one(KeyedData {
            keys: FieldMap::new(),
            data: fields(vec![("name", FieldValue::Text("A".into()))]),
        });
        assert!(matches!(
            plan_update(&q, missing_key),
            Err(AppError::BadRequest(_))
        ));

        let no_columns = Records::one(KeyedData {
            keys: fields(vec![("id", FieldValue::Int(1))]),
            data: FieldMap::new(),
        });
        assert!(matches!(
            plan_update(&q, no_columns),
            Err(AppError::NoColumnsToUpdate)
        ));
    }

    #[test]
    fn update_rejects_key_columns_in_data() {
        let q = queries();
        let payload = Records::one(KeyedData {
            keys: fields(vec![("id", FieldValue::Int(1))]),
            data: fields(vec![("id", FieldValue::Int(2))]),
        });
        assert!(matches!(
            plan_update(&q, payload),
            Err(AppError::InvalidColumn(c)) if c == "id"
        ));
    }

    #[test]
    fn update_binds_keys_before_values_per_record() {
        let q = queries();
        let payload = Records::new(vec![
            KeyedData {
                keys: fields(vec![("id", FieldValue::Int(1))]),
                data: fields(vec![("name", FieldValue::Text("A".into()))]),
            },
            KeyedData {
                keys: fields(vec![("id", FieldValue::Int(2))]),
                data: fields(vec![("name", FieldValue::Null)]),
            },
        ]);
        let stmt = plan_update(&q, payload).unwrap();
        assert_eq!(
            stmt.params,
            vec![
                FieldValue::Int(1),
                FieldValue::Text("A".into()),
                FieldValue::Int(2),
                FieldValue::Null,
            ]
        );
        assert!(stmt.sql.starts_with("WITH cte (\"id\", \"name\")"));
    }

    #[test]
    fn update_column_union_is_sorted() {
        let q = queries();
        let payload = Records::new(vec![
            KeyedData {
                keys: fields(vec![("id", FieldValue::Int(1))]),
                data: fields(vec![
                    ("name", FieldValue::Text("A".into())),
                    ("born", FieldValue::Text("2024-01-01".into())),
                ]),
            },
            KeyedData {
                keys: fields(vec![("id", FieldValue::Int(2))]),
                data: fields(vec![
                    ("born", FieldValue::Text("2025-02-02".into())),
                    ("name", FieldValue::Text("B".into())),
                ]),
            },
        ]);
        let stmt = plan_update(&q, payload).unwrap();
        // union {name, born} always renders as born then name
        assert!(stmt.sql.starts_with("WITH cte (\"id\", \"born\", \"name\")"));
        assert_eq!(stmt.params[0], FieldValue::Int(1));
        assert!(matches!(stmt.params[1], FieldValue::Date(_)));
        assert_eq!(stmt.params[2], FieldValue::Text("A".into()));
        assert_eq!(stmt.params[3], FieldValue::Int(2));
        assert!(matches!(stmt.params[4], FieldValue::Date(_)));
        assert_eq!(stmt.params[5], FieldValue::Text("B".into()));
    }

    #[test]
    fn delete_requires_exact_key_tuples() {
        let q = queries();
        let extraneous = Records::one(KeysOnly {
            keys: fields(vec![
                ("id", FieldValue::Int(1)),
                ("name", FieldValue::Text("A".into())),
            ]),
        });
        assert!(matches!(
            plan_delete(&q, extraneous),
            Err(AppError::InvalidColumn(c)) if c == "name"
        ));

        let good = Records::new(vec![
            KeysOnly {
                keys: fields(vec![("id", FieldValue::Int(1))]),
            },
            KeysOnly {
                keys: fields(vec![("id", FieldValue::Int(2))]),
            },
        ]);
        let stmt = plan_delete(&q, good).unwrap();
        assert_eq!(stmt.params, vec![FieldValue::Int(1), FieldValue::Int(2)]);
        assert_eq!(
            stmt.sql,
            "DELETE FROM \"pi\".\"person\" WHERE (\"id\" = $1::int4) OR (\"id\" = $2::int4) RETURNING *;"
        );
    }
}
