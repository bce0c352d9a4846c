#![forbid(unsafe_code)]

//! Statement execution against a live connection.
//!
//! The [`Adapter`] owns the connection together with the consistency level
//! and batching state, and implements the write policy: non-null attributes
//! are upserted, null attributes become column-level deletes.

mod connection;
mod guard;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::config::ClusterConfig;
use crate::scope::Scope;
use crate::statement::{
    compile_batch, compile_delete, compile_select, compile_write, ExecOptions, Statement,
    StoredAttributes,
};
use crate::types::{Consistency, Ids, RecordId, Result, WidecolError, KEY_COLUMN};

pub use connection::{Connection, Cursor, KeyPage, Row, StatementObserver};
pub use guard::{BatchGuard, ConsistencyGuard};

/// Stored-form attributes of one fetched row, identifier stripped.
pub type RowAttributes = BTreeMap<String, Option<String>>;

/// Executes compiled statements over one connection.
pub struct Adapter<C: Connection> {
    connection: C,
    consistency: Option<Consistency>,
    batching: bool,
    pending: Vec<Statement>,
    observer: Option<Arc<dyn StatementObserver>>,
}

impl<C: Connection> Adapter<C> {
    /// Wraps a connection with no consistency level configured.
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            consistency: None,
            batching: false,
            pending: Vec::new(),
            observer: None,
        }
    }

    /// Wraps a connection, taking the default consistency from `config`.
    pub fn from_config(connection: C, config: &ClusterConfig) -> Self {
        let mut adapter = Self::new(connection);
        adapter.consistency = config.consistency;
        adapter
    }

    /// Attaches an observer that sees every statement before execution.
    pub fn with_observer(mut self, observer: Arc<dyn StatementObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Borrows the underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Mutably borrows the underlying connection.
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Releases the underlying connection.
    pub fn into_connection(self) -> C {
        self.connection
    }

    /// Identifier column name.
    pub fn primary_key_column(&self) -> &'static str {
        KEY_COLUMN
    }

    /// Configured consistency level.
    pub fn consistency(&self) -> Option<Consistency> {
        self.consistency
    }

    /// Replaces the configured consistency level.
    pub fn set_consistency(&mut self, level: Option<Consistency>) {
        self.consistency = level;
    }

    /// Applies `level` until the returned guard is dropped.
    pub fn with_consistency(&mut self, level: Consistency) -> ConsistencyGuard<'_, C> {
        ConsistencyGuard::new(self, Some(level))
    }

    /// True while a batch guard is collecting statements.
    pub fn is_batching(&self) -> bool {
        self.batching
    }

    /// Snapshot of the options the compilers see.
    pub fn options(&self) -> ExecOptions {
        ExecOptions {
            consistency: self.consistency,
            batching: self.batching,
        }
    }

    /// Runs a statement immediately.
    pub fn execute(&mut self, statement: &Statement) -> Result<Vec<Row>> {
        if let Some(observer) = &self.observer {
            observer.statement(statement.as_str());
        }
        let started = Instant::now();
        let rows = self.connection.execute(statement.as_str())?;
        debug!(
            cql = %statement,
            rows = rows.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "adapter.execute"
        );
        Ok(rows)
    }

    /// Runs a statement now, or defers it into the active batch.
    pub fn execute_batchable(&mut self, statement: Statement) -> Result<()> {
        if self.batching {
            trace!(cql = %statement, pending = self.pending.len() + 1, "adapter.batch.buffer");
            self.pending.push(statement);
            return Ok(());
        }
        self.execute(&statement).map(|_| ())
    }

    /// Upserts a record; identical to [`Adapter::write`].
    pub fn insert(&mut self, table: &str, id: &RecordId, attributes: &StoredAttributes) -> Result<()> {
        self.write(table, id, attributes)
    }

    /// Updates a record; identical to [`Adapter::write`].
    pub fn update(&mut self, table: &str, id: &RecordId, attributes: &StoredAttributes) -> Result<()> {
        self.write(table, id, attributes)
    }

    /// Upserts the non-null attributes and removes the null ones.
    ///
    /// An empty attribute map issues no statement.
    pub fn write(&mut self, table: &str, id: &RecordId, attributes: &StoredAttributes) -> Result<()> {
        let plan = compile_write(table, id, attributes, &self.options())?;
        for statement in plan.into_statements() {
            self.execute_batchable(statement)?;
        }
        Ok(())
    }

    /// Deletes whole rows by one or many identifiers.
    pub fn delete(&mut self, table: &str, ids: impl Into<Ids>) -> Result<()> {
        let statement = compile_delete(table, ids.into(), &self.options())?;
        self.execute_batchable(statement)
    }

    /// Wraps `statements` in one batch and executes it.
    pub fn execute_batch(&mut self, statements: &[Statement]) -> Result<()> {
        let batch = compile_batch(statements, &self.options())?;
        self.execute(&batch).map(|_| ())
    }

    /// Starts collecting writes into a batch; see [`BatchGuard`].
    pub fn begin_batch(&mut self) -> BatchGuard<'_, C> {
        BatchGuard::new(self)
    }

    /// Runs `f` with batching enabled and applies the batch if it succeeds.
    /// On error the collected statements are discarded.
    pub fn batch<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut BatchGuard<'_, C>) -> Result<T>,
    {
        let mut guard = self.begin_batch();
        let out = f(&mut guard)?;
        guard.apply()?;
        Ok(out)
    }

    /// Executes the scope's SELECT and returns rows with the identifier
    /// stripped; rows that carry nothing besides the identifier are skipped.
    pub fn select(&mut self, scope: &Scope) -> Result<Vec<(RecordId, RowAttributes)>> {
        let rows = self.select_rows(scope)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut key = None;
            let mut attributes = RowAttributes::new();
            for (name, value) in row.into_columns() {
                if name == KEY_COLUMN {
                    key = value;
                } else {
                    attributes.insert(name, value);
                }
            }
            let key = key.ok_or_else(|| WidecolError::invalid("result row has no KEY value"))?;
            if attributes.is_empty() {
                continue;
            }
            out.push((RecordId(key), attributes));
        }
        Ok(out)
    }

    /// Executes the scope's SELECT and returns the raw rows. A scope holding
    /// a rejected builder call fails before the connection is touched.
    pub fn select_rows(&mut self, scope: &Scope) -> Result<Vec<Row>> {
        scope.check()?;
        let statement = compile_select(&scope.select_parts(), &self.options())?;
        self.execute(&statement)
    }

    /// Fetches the next page of candidate identifiers for select-all iteration.
    pub fn pre_select(
        &mut self,
        table: &str,
        limit: Option<usize>,
        cursor: Option<&Cursor>,
    ) -> Result<KeyPage> {
        let page = self.connection.page_keys(table, limit, cursor)?;
        debug!(
            table,
            ids = page.ids.len(),
            exhausted = page.next_cursor.is_none(),
            "adapter.pre_select"
        );
        Ok(page)
    }
}
