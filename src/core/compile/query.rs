//! Splices compiled fragments into a `SELECT` statement

use crate::deid::fragment::{Fragment, RowSuppressionFilterSet};
use std::collections::HashMap;

/// Build the de-identified `SELECT` for one table
///
/// Columns keep their schema order. A fragment naming a column replaces it
/// (the last fragment for a name wins); fragments naming no schema column are
/// appended in compile order. Row filters form the `WHERE` clause.
///
/// ```
/// use cdr_deid::core::compile::assemble_query;
/// use cdr_deid::deid::{Fragment, RowSuppressionFilterSet};
///
/// let fragments = vec![Fragment::column("zip", "NULL AS zip", "suppress")];
/// let mut filters = RowSuppressionFilterSet::new();
/// filters.insert("age <= 89", "suppress");
///
/// let sql = assemble_query(
///     "cdr.person",
///     &["person_id".to_string(), "zip".to_string()],
///     &fragments,
///     &filters,
/// );
/// assert_eq!(
///     sql,
///     "SELECT\n  person_id,\n  NULL AS zip\nFROM cdr.person\nWHERE age <= 89"
/// );
/// ```
pub fn assemble_query(
    source: &str,
    columns: &[String],
    fragments: &[Fragment],
    filters: &RowSuppressionFilterSet,
) -> String {
    let mut by_name: HashMap<&str, &Fragment> = HashMap::new();
    let mut extra: Vec<&Fragment> = Vec::new();

    for fragment in fragments {
        match fragment.name.as_deref() {
            Some(name) if columns.iter().any(|c| c == name) => {
                if let Some(previous) = by_name.insert(name, fragment) {
                    tracing::debug!(
                        column = name,
                        replaced = %previous.label,
                        by = %fragment.label,
                        "Later fragment replaces column expression"
                    );
                }
            }
            Some(name) => {
                match extra.iter().position(|f| f.name.as_deref() == Some(name)) {
                    Some(index) => extra[index] = fragment,
                    None => extra.push(fragment),
                }
            }
            None => extra.push(fragment),
        }
    }

    let mut projection: Vec<&str> = columns
        .iter()
        .map(|column| match by_name.get(column.as_str()) {
            Some(fragment) => fragment.apply.as_str(),
            None => column.as_str(),
        })
        .collect();
    projection.extend(extra.iter().map(|f| f.apply.as_str()));

    let mut sql = if projection.is_empty() {
        format!("SELECT *\nFROM {source}")
    } else {
        format!("SELECT\n  {}\nFROM {source}", projection.join(",\n  "))
    };
    if let Some(clause) = filters.where_clause() {
        sql.push_str("\nWHERE ");
        sql.push_str(&clause);
    }
    sql
}
