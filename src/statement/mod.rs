#![forbid(unsafe_code)]

//! Statement compilation.
//!
//! Pure translation from query parts and write parameters into statement
//! text. Nothing here performs I/O; identical inputs always produce identical
//! text.

mod sanitize;
mod select;
mod write;

use std::fmt;

use crate::types::{Consistency, Ids, Result, KEY_COLUMN};

pub use sanitize::{quote_column, quote_literal, sanitize, Bind};
pub use select::{compile_select, SelectParts};
pub use write::{compile_batch, compile_delete, compile_write, StoredAttributes, WritePlan};

/// Compiled, self-contained statement text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Statement(String);

impl Statement {
    /// Wraps already-sanitised text.
    pub fn new(cql: impl Into<String>) -> Self {
        Statement(cql.into())
    }

    /// Borrows the statement text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the statement, returning its text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Statement {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Per-call execution options threaded into the compilers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Configured consistency level, if any.
    pub consistency: Option<Consistency>,
    /// Whether statements are currently being collected into a batch.
    pub batching: bool,
}

impl ExecOptions {
    /// `USING CONSISTENCY <level>` when a level is set and either no batch is
    /// active or inclusion is forced (batch wrappers always force it).
    pub fn consistency_clause(&self, force: bool) -> Option<String> {
        match self.consistency {
            Some(level) if force || !self.batching => Some(format!("USING CONSISTENCY {level}")),
            _ => None,
        }
    }
}

/// `KEY = ?` for one identifier, `KEY IN (?)` for several, already bound.
pub fn ids_predicate(ids: Ids) -> Result<String> {
    match ids.normalize()? {
        Ids::One(id) => sanitize(&format!("{KEY_COLUMN} = ?"), &[Bind::Text(id.0)]),
        Ids::Many(ids) => sanitize(
            &format!("{KEY_COLUMN} IN (?)"),
            &[Bind::List(ids.into_iter().map(|id| id.0).collect())],
        ),
    }
}

/// Joins non-empty segments with single spaces.
pub(crate) fn join_segments<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for segment in segments.into_iter().flatten() {
        let segment = segment.as_ref().trim();
        if segment.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(segment);
    }
    out
}
