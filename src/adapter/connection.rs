use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::types::{RecordId, Result, WidecolError};

/// One result row: ordered `(column, value)` pairs as returned by the driver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, Option<String>)>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column, builder style.
    pub fn with(mut self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        self.push(name, value.map(Into::into));
        self
    }

    /// Appends a column.
    pub fn push(&mut self, name: impl Into<String>, value: Option<String>) {
        self.columns.push((name.into(), value));
    }

    /// Value of the named column, if present and non-null.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Value at a column position.
    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.columns.get(index).and_then(|(_, value)| value.as_deref())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates over `(column, value)` pairs in driver order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    /// Consumes the row.
    pub fn into_columns(self) -> Vec<(String, Option<String>)> {
        self.columns
    }
}

/// Opaque pagination token for select-all iteration.
///
/// Wraps the driver's paging state; rendered as URL-safe base64 so it can be
/// handed to clients and returned later.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Builds a cursor from raw driver paging state.
    pub fn from_paging_state(state: &[u8]) -> Self {
        Cursor(URL_SAFE_NO_PAD.encode(state))
    }

    /// Recovers the raw driver paging state.
    pub fn paging_state(&self) -> Result<Vec<u8>> {
        URL_SAFE_NO_PAD
            .decode(&self.0)
            .map_err(|err| WidecolError::invalid(format!("malformed cursor: {err}")))
    }

    /// Token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(token: String) -> Self {
        Cursor(token)
    }
}

/// A page of candidate identifiers plus the cursor for the next page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyPage {
    /// Identifiers on this page.
    pub ids: Vec<RecordId>,
    /// Cursor for the following page; `None` once exhausted.
    pub next_cursor: Option<Cursor>,
}

/// Live connection to the store, provided by the external driver.
pub trait Connection {
    /// Executes statement text and returns its rows.
    fn execute(&mut self, cql: &str) -> Result<Vec<Row>>;

    /// Returns up to `page_size` distinct row keys of `table` following `cursor`.
    fn page_keys(
        &mut self,
        table: &str,
        page_size: Option<usize>,
        cursor: Option<&Cursor>,
    ) -> Result<KeyPage>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn execute(&mut self, cql: &str) -> Result<Vec<Row>> {
        (**self).execute(cql)
    }

    fn page_keys(
        &mut self,
        table: &str,
        page_size: Option<usize>,
        cursor: Option<&Cursor>,
    ) -> Result<KeyPage> {
        (**self).page_keys(table, page_size, cursor)
    }
}

/// Receives every statement before it is executed. Purely informational.
pub trait StatementObserver: Send + Sync {
    /// Called with the statement text about to run.
    fn statement(&self, cql: &str);
}
