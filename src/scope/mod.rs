#![forbid(unsafe_code)]

//! Query scopes and result assembly.
//!
//! A [`Scope`] accumulates select/where/limit/id constraints for one record
//! type. Executing it hands the scope to the record type's
//! [`LayoutStrategy`], which fetches and groups rows, and then folds them into
//! records, raw maps or one merged mapping.

mod context;
mod finder;
mod layout;
mod output;

use std::sync::Arc;

use crate::adapter::{Adapter, Connection, Cursor};
use crate::codec::Value;
use crate::model::{EntityDescriptor, Record};
use crate::statement::{quote_literal, SelectParts};
use crate::types::{Ids, RecordId, Result, WidecolError};

pub use context::{QueryContext, ScopeHelper};
pub use layout::{LayoutStrategy, Page, RowLayout, RowSource};
pub use output::{AttributeSet, QueryOutput, ResultItem, Results};

/// Accumulating query over one record type.
///
/// Builder methods consume and return the scope. Invalid combinations are
/// remembered and reported when the scope is executed.
#[derive(Clone, Debug)]
pub struct Scope {
    descriptor: Arc<EntityDescriptor>,
    limit: Option<usize>,
    select_columns: Vec<String>,
    where_clauses: Vec<String>,
    id_values: Vec<RecordId>,
    raw_response: bool,
    select_all: bool,
    next_cursor: Option<Cursor>,
    error: Option<String>,
}

impl Scope {
    /// Unconstrained scope over `descriptor`.
    pub fn new(descriptor: Arc<EntityDescriptor>) -> Self {
        Self {
            descriptor,
            limit: None,
            select_columns: Vec::new(),
            where_clauses: Vec::new(),
            id_values: Vec::new(),
            raw_response: false,
            select_all: false,
            next_cursor: None,
            error: None,
        }
    }

    /// Adds columns to the selection, keeping caller order.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            if !self.select_columns.contains(&column) {
                self.select_columns.push(column);
            }
        }
        self
    }

    /// Appends a precompiled predicate fragment.
    pub fn where_clause(mut self, fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        if fragment.trim().is_empty() {
            return self.fail("where fragment must not be empty");
        }
        self.where_clauses.push(fragment);
        self
    }

    /// Appends `<column> = '<value>'` with the value quoted.
    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        let stored = match self.descriptor.resolve_type(column) {
            Ok(ty) => ty.encode_nullable(&ty.typecast(value)),
            Err(err) => Err(err),
        };
        match stored {
            Ok(Some(stored)) => {
                let fragment = format!("{column} = {}", quote_literal(&stored));
                self.where_clause(fragment)
            }
            Ok(None) => self.fail(format!("cannot compare '{column}' with null")),
            Err(err) => self.fail(err.to_string()),
        }
    }

    /// Caps the number of records returned.
    pub fn limit(mut self, limit: usize) -> Self {
        if limit == 0 {
            return self.fail("limit must be positive");
        }
        self.limit = Some(limit);
        self
    }

    /// Constrains the scope to one or many identifiers.
    pub fn ids(mut self, ids: impl Into<Ids>) -> Self {
        if self.select_all {
            return self.fail("identifier constraints cannot be combined with select-all");
        }
        match ids.into() {
            Ids::One(id) => self.id_values = vec![id],
            Ids::Many(ids) if ids.is_empty() => {
                return self.fail("identifier list must not be empty")
            }
            Ids::Many(ids) => self.id_values = ids,
        }
        self
    }

    /// Returns raw stored forms instead of records.
    pub fn raw(mut self) -> Self {
        self.raw_response = true;
        self
    }

    /// Select-all mode: identifiers come from the key pager, one page per
    /// execution, and results are wrapped with the next cursor.
    pub fn all(mut self) -> Self {
        if !self.id_values.is_empty() {
            return self.fail("select-all cannot be combined with identifier constraints");
        }
        self.select_all = true;
        self
    }

    /// Resumes select-all iteration after `cursor`.
    pub fn after(mut self, cursor: Option<Cursor>) -> Self {
        self.next_cursor = cursor;
        self.all()
    }

    /// Record type.
    pub fn descriptor(&self) -> &Arc<EntityDescriptor> {
        &self.descriptor
    }

    /// Configured limit.
    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    /// Requested columns.
    pub fn select_values(&self) -> &[String] {
        &self.select_columns
    }

    /// Precompiled predicate fragments.
    pub fn where_values(&self) -> &[String] {
        &self.where_clauses
    }

    /// Identifier constraint.
    pub fn id_values(&self) -> &[RecordId] {
        &self.id_values
    }

    /// Raw response requested.
    pub fn is_raw(&self) -> bool {
        self.raw_response
    }

    /// Select-all mode active.
    pub fn is_all(&self) -> bool {
        self.select_all
    }

    /// Cursor the next select-all page starts from.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.next_cursor.as_ref()
    }

    /// Fails with [`WidecolError::Invalid`] when a builder call was rejected.
    pub fn check(&self) -> Result<()> {
        match &self.error {
            Some(message) => Err(WidecolError::Invalid(message.clone())),
            None => Ok(()),
        }
    }

    /// Statement inputs for the compiler.
    pub fn select_parts(&self) -> SelectParts<'_> {
        SelectParts {
            table: self.descriptor.table(),
            columns: &self.select_columns,
            wheres: &self.where_clauses,
            ids: &self.id_values,
            limit: self.limit,
        }
    }

    /// Fetches, limits and assembles one result set.
    pub fn execute<C: Connection>(&self, adapter: &mut Adapter<C>) -> Result<QueryOutput> {
        let strategy = self.descriptor.layout().strategy();
        let page = self.fetch(adapter, strategy)?;
        let results = strategy.assemble(page.records, self);
        if self.select_all {
            Ok(QueryOutput::Page {
                results,
                next_cursor: page.next_cursor,
            })
        } else {
            Ok(QueryOutput::Results(results))
        }
    }

    /// Fetches records and decodes each one, whatever the layout's result shape.
    pub fn to_records<C: Connection>(&self, adapter: &mut Adapter<C>) -> Result<Vec<Record>> {
        let strategy = self.descriptor.layout().strategy();
        let page = self.fetch(adapter, strategy)?;
        Ok(page
            .records
            .into_iter()
            .map(|(id, attributes)| self.descriptor.instantiate(id, attributes))
            .collect())
    }

    /// Runs an entity-specific helper with this scope installed as the
    /// current scope of a fresh [`QueryContext`].
    pub fn forward<C, H>(&self, adapter: &mut Adapter<C>, helper: &H) -> Result<H::Output>
    where
        C: Connection,
        H: ScopeHelper<C> + ?Sized,
    {
        let mut ctx = QueryContext::new(adapter);
        ctx.scoping(self.clone(), |ctx| helper.call(ctx))
    }

    fn fetch<C: Connection>(
        &self,
        adapter: &mut Adapter<C>,
        strategy: &dyn LayoutStrategy,
    ) -> Result<Page> {
        self.check()?;
        let mut page = strategy.fetch_page(adapter, self)?;
        if let Some(limit) = self.limit {
            page.records.truncate(limit);
        }
        Ok(page)
    }

    /// Copy used for the per-identifier cell fetch: grouping folds many
    /// cells into one record, so the limit is applied after grouping instead
    /// of in the statement.
    pub(crate) fn for_cell_fetch(&self, ids: Option<Vec<RecordId>>) -> Scope {
        let mut scope = self.clone();
        scope.limit = None;
        if let Some(ids) = ids {
            scope.id_values = ids;
        }
        scope
    }

    fn fail(mut self, message: impl Into<String>) -> Self {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
        self
    }
}
