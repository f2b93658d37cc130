//! Typed column descriptors built by grouping raw catalog rows.

use crate::error::AppError;
use crate::meta::catalog::RawColumnRow;
use indexmap::IndexMap;
use std::collections::BTreeSet;

pub const PRIMARY_KEY: &str = "PRIMARY KEY";
pub const FOREIGN_KEY: &str = "FOREIGN KEY";
pub const UNIQUE: &str = "UNIQUE";

/// Target of a foreign-key constraint.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ForeignKeyRef {
    pub ref_schema: String,
    pub ref_table: String,
    pub ref_column: String,
}

/// One table column with its constraint memberships unioned across all raw
/// catalog rows. Read-only after construction; lives for one cache TTL
/// window.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub enum_labels: Option<Vec<String>>,
    pub constraints: BTreeSet<String>,
    pub foreign_keys: Vec<ForeignKeyRef>,
}

impl ColumnDescriptor {
    pub fn is_primary_key(&self) -> bool {
        self.constraints.contains(PRIMARY_KEY)
    }

    /// A field the UI must collect: non-nullable and either enumerated or
    /// constrained by UNIQUE/FOREIGN KEY. Primary keys alone do not qualify;
    /// they are typically generated.
    pub fn is_mandatory(&self) -> bool {
        !self.nullable
            && (self.enum_labels.is_some()
                || self.constraints.contains(UNIQUE)
                || self.constraints.contains(FOREIGN_KEY))
    }
}

/// Group raw (column x constraint) rows by column name. The first row of each
/// group supplies the scalar attributes; every row contributes its constraint
/// kind, and FOREIGN KEY rows with a reference target append a deduplicated
/// target record. Column order follows first appearance in the input.
pub fn group_columns(rows: &[RawColumnRow]) -> Vec<ColumnDescriptor> {
    let mut grouped: IndexMap<&str, ColumnDescriptor> = IndexMap::new();
    for row in rows {
        let col = grouped
            .entry(row.column_name.as_str())
            .or_insert_with(|| ColumnDescriptor {
                name: row.column_name.clone(),
                data_type: row.data_type.clone(),
                nullable: row.nullable(),
                default: row.column_default.clone(),
                enum_labels: row.enum_options.clone(),
                constraints: BTreeSet::new(),
                foreign_keys: Vec::new(),
            });
        if let Some(const_type) = &row.const_type {
            col.constraints.insert(const_type.clone());
            if const_type == FOREIGN_KEY {
                if let (Some(schema), Some(table), Some(column)) =
                    (&row.ref_schema, &row.ref_table, &row.ref_column)
                {
                    let fk = ForeignKeyRef {
                        ref_schema: schema.clone(),
                        ref_table: table.clone(),
                        ref_column: column.clone(),
                    };
                    if !col.foreign_keys.contains(&fk) {
                        col.foreign_keys.push(fk);
                    }
                }
            }
        }
    }
    grouped.into_values().collect()
}

/// Names of the primary-key columns. Every table exposed through the gateway
/// must have one; an empty result is a configuration fault.
pub fn primary_key_columns(
    table: &str,
    columns: &[ColumnDescriptor],
) -> Result<Vec<String>, AppError> {
    let pks: Vec<String> = columns
        .iter()
        .filter(|c| c.is_primary_key())
        .map(|c| c.name.clone())
        .collect();
    if pks.is_empty() {
        return Err(AppError::NoPrimaryKey(table.to_string()));
    }
    Ok(pks)
}
