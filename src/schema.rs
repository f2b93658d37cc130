//! Entity descriptions for UI clients: a JSON Schema-style document derived
//! from grouped column metadata, with enough extra detail (labels, keys,
//! foreign-key targets, defaults) to drive generated forms.

use crate::meta::ColumnDescriptor;
use serde_json::{json, Map, Value};

const SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// JSON type/format for a declared SQL type. Unknown types render as strings,
/// which also covers enums (their labels are attached separately).
fn json_type(data_type: &str) -> (&'static str, Option<&'static str>) {
    match data_type {
        "bool" | "boolean" => ("boolean", None),
        "int" | "int2" | "int4" | "int8" | "integer" | "smallint" | "bigint" => ("integer", None),
        "money" | "numeric" | "decimal" | "float4" | "float8" | "real" | "double precision" => {
            ("number", None)
        }
        "date" => ("string", Some("date")),
        "time" | "timetz" | "time with time zone" | "time without time zone" => {
            ("string", Some("time"))
        }
        "timestamp" | "timestamptz" | "timestamp with time zone"
        | "timestamp without time zone" => ("string", Some("date-time")),
        _ => ("string", None),
    }
}

fn is_temporal(data_type: &str) -> bool {
    matches!(json_type(data_type), ("string", Some(_)))
}

/// `customer_email` -> `Customer Email`
fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip the `::type` cast and surrounding quotes from a raw column default,
/// e.g. `'new'::pi.e_status` -> `new`.
fn clean_default(raw: &str) -> String {
    let before_cast = raw.split("::").next().unwrap_or(raw);
    before_cast.trim_matches('\'').to_string()
}

fn property_schema(column: &ColumnDescriptor) -> Value {
    let data_type = column.data_type.to_lowercase();
    let (ty, format) = json_type(&data_type);
    let mut prop = Map::new();
    prop.insert("type".into(), json!(ty));
    if let Some(format) = format {
        prop.insert("format".into(), json!(format));
    }
    prop.insert("label".into(), json!(title_case(&column.name)));
    if let Some(labels) = &column.enum_labels {
        prop.insert("enum".into(), json!(labels));
        prop.insert("format".into(), json!("select"));
    }
    prop.insert("primary_key".into(), json!(column.is_primary_key()));
    if !column.foreign_keys.is_empty() {
        prop.insert("foreign_keys".into(), json!(column.foreign_keys));
    }
    // Generated defaults (serial keys, now()) are noise for a form.
    let generated = column.is_primary_key()
        || !column.foreign_keys.is_empty()
        || is_temporal(&data_type);
    if let (Some(raw), false) = (&column.default, generated) {
        prop.insert("default".into(), json!(clean_default(raw)));
    }
    prop.insert("required".into(), json!(column.is_mandatory()));
    Value::Object(prop)
}

/// The full entity document for one table.
pub fn entity_schema(table: &str, columns: &[ColumnDescriptor]) -> Value {
    let mut properties = Map::new();
    for column in columns {
        properties.insert(column.name.clone(), property_schema(column));
    }
    let required: Vec<&str> = columns
        .iter()
        .filter(|c| c.is_mandatory())
        .map(|c| c.name.as_str())
        .collect();
    json!({
        "$schema": SCHEMA_DIALECT,
        "entity": table,
        "title": title_case(table),
        "properties": properties,
        "additionalProperties": false,
        "required": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::descriptor::{FOREIGN_KEY, PRIMARY_KEY, UNIQUE};
    use crate::meta::ForeignKeyRef;
    use std::collections::BTreeSet;

    fn column(name: &str, data_type: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            enum_labels: None,
            constraints: BTreeSet::new(),
            foreign_keys: Vec::new(),
        }
    }

    #[test]
    fn titles_read_like_labels() {
        assert_eq!(title_case("customer_email"), "Customer Email");
        assert_eq!(title_case("branch"), "Branch");
    }

    #[test]
    fn type_mapping_covers_the_families() {
        assert_eq!(json_type("int4"), ("integer", None));
        assert_eq!(json_type("numeric"), ("number", None));
        assert_eq!(json_type("date"), ("string", Some("date")));
        assert_eq!(json_type("timestamptz"), ("string", Some("date-time")));
        assert_eq!(json_type("pi.e_status"), ("string", None));
    }

    #[test]
    fn defaults_are_cleaned() {
        assert_eq!(clean_default("'new'::pi.e_status"), "new");
        assert_eq!(clean_default("0"), "0");
    }

    #[test]
    fn enum_columns_render_as_selects() {
        let mut status = column("status", "pi.e_status");
        status.enum_labels = Some(vec!["open".into(), "closed".into()]);
        let prop = property_schema(&status);
        assert_eq!(prop["format"], "select");
        assert_eq!(prop["enum"][0], "open");
    }

    #[test]
    fn document_collects_required_and_keys() {
        let mut id = column("id", "int4");
        id.nullable = false;
        id.constraints.insert(PRIMARY_KEY.to_string());
        id.default = Some("nextval('pi.person_id_seq')".into());

        let mut email = column("email", "text");
        email.nullable = false;
        email.constraints.insert(UNIQUE.to_string());

        let mut branch = column("branch_id", "int4");
        branch.nullable = false;
        branch.constraints.insert(FOREIGN_KEY.to_string());
        branch.foreign_keys.push(ForeignKeyRef {
            ref_schema: "pi".into(),
            ref_table: "branch".into(),
            ref_column: "id".into(),
        });

        let doc = entity_schema("person", &[id, email, branch]);
        assert_eq!(doc["entity"], "person");
        assert_eq!(doc["title"], "Person");
        assert_eq!(doc["properties"]["id"]["primary_key"], true);
        // generated key default is suppressed
        assert!(doc["properties"]["id"].get("default").is_none());
        assert_eq!(doc["properties"]["email"]["required"], true);
        assert_eq!(
            doc["properties"]["branch_id"]["foreign_keys"][0]["ref_table"],
            "branch"
        );
        let required: Vec<&str> = doc["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["email", "branch_id"]);
    }
}
