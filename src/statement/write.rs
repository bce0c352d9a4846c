use std::collections::BTreeMap;

use super::{ids_predicate, join_segments, quote_column, sanitize, Bind, ExecOptions, Statement};
use crate::types::{Ids, RecordId, Result, WidecolError, KEY_COLUMN};

/// Attribute name to stored form; `None` requests removal of the column.
pub type StoredAttributes = BTreeMap<String, Option<String>>;

/// Statements produced for one record write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WritePlan {
    /// Upsert of the identifier plus every non-null attribute.
    pub upsert: Option<Statement>,
    /// Column-level delete of every null attribute.
    pub delete: Option<Statement>,
}

impl WritePlan {
    /// Statements in execution order: upsert, then delete.
    pub fn into_statements(self) -> impl Iterator<Item = Statement> {
        self.upsert.into_iter().chain(self.delete)
    }

    /// True when the write touches nothing.
    pub fn is_empty(&self) -> bool {
        self.upsert.is_none() && self.delete.is_none()
    }
}

/// Splits `attributes` by nullness into an upsert and a column delete.
pub fn compile_write(
    table: &str,
    id: &RecordId,
    attributes: &StoredAttributes,
    opts: &ExecOptions,
) -> Result<WritePlan> {
    let mut plan = WritePlan::default();
    let consistency = opts.consistency_clause(false);

    let present: Vec<(&String, &String)> = attributes
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
        .collect();
    if !present.is_empty() {
        let mut columns = vec![quote_column(KEY_COLUMN)];
        let mut binds = vec![Bind::Text(id.0.clone())];
        for (name, value) in present {
            if name == KEY_COLUMN {
                return Err(WidecolError::invalid("attributes must not contain the KEY column"));
            }
            columns.push(quote_column(name));
            binds.push(Bind::Text(value.clone()));
        }
        let placeholders = vec!["?"; columns.len()].join(",");
        let template = join_segments([
            Some(format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders})",
                columns.join(",")
            )),
            consistency.clone(),
        ]);
        plan.upsert = Some(Statement::new(sanitize(&template, &binds)?));
    }

    let absent: Vec<String> = attributes
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| quote_column(name))
        .collect();
    if !absent.is_empty() {
        let template = join_segments([
            Some(format!("DELETE {} FROM {table}", absent.join(","))),
            consistency,
            Some(format!("WHERE {KEY_COLUMN} = ?")),
        ]);
        plan.delete = Some(Statement::new(sanitize(&template, &[Bind::Text(id.0.clone())])?));
    }

    Ok(plan)
}

/// Full-row delete keyed by one or many identifiers.
pub fn compile_delete(table: &str, ids: Ids, opts: &ExecOptions) -> Result<Statement> {
    let predicate = ids_predicate(ids)?;
    Ok(Statement::new(join_segments([
        Some(format!("DELETE FROM {table}")),
        opts.consistency_clause(false),
        Some(format!("WHERE {predicate}")),
    ])))
}

/// Wraps statements in `BEGIN BATCH .. APPLY BATCH`; the consistency clause
/// is always considered for the wrapper.
pub fn compile_batch(statements: &[Statement], opts: &ExecOptions) -> Result<Statement> {
    if statements.is_empty() {
        return Err(WidecolError::invalid("cannot apply an empty batch"));
    }
    let header = join_segments([Some("BEGIN BATCH".to_owned()), opts.consistency_clause(true)]);
    let mut lines = Vec::with_capacity(statements.len() + 2);
    lines.push(header.as_str());
    lines.extend(statements.iter().map(Statement::as_str));
    lines.push("APPLY BATCH");
    Ok(Statement::new(lines.join("\n")))
}
