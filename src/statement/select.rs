use super::{ids_predicate, join_segments, ExecOptions, Statement};
use crate::types::{Ids, RecordId, Result, KEY_COLUMN};

/// Read-side inputs taken from a scope.
#[derive(Clone, Copy, Debug)]
pub struct SelectParts<'a> {
    /// Column family to read from.
    pub table: &'a str,
    /// Requested columns; empty selects `*`.
    pub columns: &'a [String],
    /// Precompiled predicate fragments.
    pub wheres: &'a [String],
    /// Identifier constraint; empty means unconstrained.
    pub ids: &'a [RecordId],
    /// Row limit; emitted only when positive.
    pub limit: Option<usize>,
}

/// `SELECT <cols> FROM <table> [USING CONSISTENCY ..] [WHERE ..] [LIMIT n]`
pub fn compile_select(parts: &SelectParts<'_>, opts: &ExecOptions) -> Result<Statement> {
    let mut predicates: Vec<String> = parts.wheres.to_vec();
    if !parts.ids.is_empty() {
        predicates.push(ids_predicate(Ids::Many(parts.ids.to_vec()))?);
    }
    let where_clause = (!predicates.is_empty()).then(|| format!("WHERE {}", predicates.join(" AND ")));
    let limit_clause = parts
        .limit
        .filter(|limit| *limit > 0)
        .map(|limit| format!("LIMIT {limit}"));

    let text = join_segments([
        Some(format!("SELECT {} FROM {}", select_list(parts.columns), parts.table)),
        opts.consistency_clause(false),
        where_clause,
        limit_clause,
    ]);
    Ok(Statement::new(text))
}

fn select_list(columns: &[String]) -> String {
    if columns.is_empty() {
        return "*".to_owned();
    }
    let mut list: Vec<&str> = vec![KEY_COLUMN];
    for column in columns {
        if !list.contains(&column.as_str()) {
            list.push(column);
        }
    }
    list.join(",")
}
