//! SQL fragment builders. Identifiers are always double-quoted after
//! allow-list validation; values are always numbered `$n` placeholders laid
//! out row-major, so the flattened parameter list lines up with the text.

use crate::ident::quoted;

/// `"a", "b", "c"`
pub fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quoted(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Multi-row VALUES body: `($1, $2), ($3, $4)`. `casts[j]` appends a
/// `::type` cast to every placeholder of column j; INSERT and UPDATE both
/// cast every column so the bound wire type never has to match exactly.
pub fn values_rows(record_count: usize, casts: &[Option<&str>]) -> String {
    let width = casts.len();
    (0..record_count)
        .map(|i| {
            let row = (0..width)
                .map(|j| match casts[j] {
                    Some(ty) => format!("${}::{}", i * width + j + 1, ty),
                    None => format!("${}", i * width + j + 1),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", row)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"a" = $1::int4 AND "b" = $2::text`, numbering from `start`. Each
/// placeholder is cast to the column's declared type; enum columns in
/// particular only accept their text labels through an explicit cast.
pub fn equality_conjunction(
    columns: &[String],
    start: usize,
    type_of: impl Fn(&str) -> String,
) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ${}::{}", quoted(c), start + i, type_of(c)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// OR-of-ANDs over full primary-key tuples:
/// `("a" = $1::int4 AND "b" = $2::text) OR ("a" = $3::int4 AND "b" = $4::text)`.
pub fn pk_disjunction(
    pk_columns: &[String],
    record_count: usize,
    type_of: impl Fn(&str) -> String,
) -> String {
    let width = pk_columns.len();
    (0..record_count)
        .map(|i| {
            let conj = pk_columns
                .iter()
                .enumerate()
                .map(|(j, c)| {
                    format!("{} = ${}::{}", quoted(c), i * width + j + 1, type_of(c))
                })
                .collect::<Vec<_>>()
                .join(" AND ");
            format!("({})", conj)
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Join predicate between the target table and the update CTE, both sides
/// cast to the column's declared type so the CTE's untyped literals compare
/// correctly: `("tab"."id"::int4 = cte."id"::int4)`.
pub fn cte_pk_match(table: &str, pk_columns: &[String], type_of: impl Fn(&str) -> String) -> String {
    let conj = pk_columns
        .iter()
        .map(|c| {
            let ty = type_of(c);
            format!(
                "{}.{}::{} = cte.{}::{}",
                quoted(table),
                quoted(c),
                ty,
                quoted(c),
                ty
            )
        })
        .collect::<Vec<_>>()
        .join(" AND ");
    format!("({})", conj)
}

/// `"x" = cte."x", "y" = cte."y"`
pub fn cte_set_clause(update_columns: &[String]) -> String {
    update_columns
        .iter()
        .map(|c| format!("{} = cte.{}", quoted(c), quoted(c)))
        .collect::<Vec<_>>()
        .join(", ")
}
