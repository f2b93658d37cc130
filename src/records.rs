//! Boundary payload shapes: data-only inserts, key-only selectors, keyed
//! update/result units, and the ordered record list wrapper.

use crate::value::FieldMap;
use serde::{Deserialize, Serialize};

/// An insert payload: non-key fields only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataOnly {
    pub data: FieldMap,
}

/// A selector carrying exactly the primary-key columns of its table. The
/// subset check happens at the operation boundary, not here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeysOnly {
    pub keys: FieldMap,
}

/// An update/result unit: primary-key values plus disjoint non-key fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyedData {
    pub keys: FieldMap,
    pub data: FieldMap,
}

/// Ordered record list. Mutating operations reject an empty list before any
/// SQL is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Records<T> {
    pub records: Vec<T>,
}

impl<T> Records<T> {
    pub fn new(records: Vec<T>) -> Self {
        Records { records }
    }

    pub fn one(record: T) -> Self {
        Records {
            records: vec![record],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Split a returned row into (primary-key values, everything else).
pub fn split_record(row: FieldMap, pk_columns: &[String]) -> (FieldMap, FieldMap) {
    let mut keys = FieldMap::new();
    let mut data = FieldMap::new();
    for (name, value) in row {
        if pk_columns.iter().any(|pk| *pk == name) {
            keys.insert(name, value);
        } else {
            data.insert(name, value);
        }
    }
    (keys, data)
}

/// Convenience for building a `KeyedData` from a raw returned row.
pub fn keyed_from_row(row: FieldMap, pk_columns: &[String]) -> KeyedData {
    let (keys, data) = split_record(row, pk_columns);
    KeyedData { keys, data }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;

    fn row(pairs: Vec<(&str, FieldValue)>) -> FieldMap {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn split_respects_pk_set() {
        let (keys, data) = split_record(
            row(vec![
                ("id", FieldValue::Int(1)),
                ("name", FieldValue::Text("A".into())),
                ("branch_id", FieldValue::Int(2)),
            ]),
            &["id".to_string()],
        );
        assert_eq!(keys.len(), 1);
        assert_eq!(keys["id"], FieldValue::Int(1));
        assert_eq!(data.len(), 2);
        assert_eq!(data["name"], FieldValue::Text("A".into()));
    }

    #[test]
    fn split_handles_composite_keys() {
        let (keys, data) = split_record(
            row(vec![
                ("a", FieldValue::Int(1)),
                ("b", FieldValue::Int(2)),
                ("v", FieldValue::Text("x".into())),
            ]),
            &["a".to_string(), "b".to_string()],
        );
        assert_eq!(keys.len(), 2);
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn payloads_deserialize_from_boundary_shapes() {
        let list: Records<DataOnly> =
            serde_json::from_str(r#"{"records":[{"data":{"name":"A","age":3}}]}"#).unwrap();
        assert_eq!(list.len(), 1);
        // field order is preserved for column-order derivation
        let keys: Vec<&String> = list.records[0].data.keys().collect();
        assert_eq!(keys, vec!["name", "age"]);

        let kd: KeyedData =
            serde_json::from_str(r#"{"keys":{"id":5},"data":{"name":"B"}}"#).unwrap();
        assert_eq!(kd.keys["id"], FieldValue::Int(5));
    }
}
