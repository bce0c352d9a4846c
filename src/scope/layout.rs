use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::{Adapter, Connection, Cursor, KeyPage, Row, RowAttributes};
use crate::types::{RecordId, Result, KEY_COLUMN};

use super::output::{AttributeSet, ResultItem, Results};
use super::Scope;

/// Physical shape a record takes in the store. Fixed per record type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowLayout {
    /// One row per record; columns are the declared attributes.
    FixedSchema,
    /// One cell row `(KEY, column1, value)` per attribute of a record.
    DynamicAttribute,
    /// Same cells as [`RowLayout::DynamicAttribute`] without a declared
    /// schema; results merge into one identifier-to-attributes mapping.
    Schemaless,
}

impl RowLayout {
    /// Read strategy for this layout.
    pub fn strategy(self) -> &'static dyn LayoutStrategy {
        match self {
            RowLayout::FixedSchema => &FixedSchema,
            RowLayout::DynamicAttribute => &DynamicAttribute,
            RowLayout::Schemaless => &Schemaless,
        }
    }

    /// True for the cell-per-attribute layouts.
    pub fn is_cell_layout(self) -> bool {
        !matches!(self, RowLayout::FixedSchema)
    }
}

/// Read operations a layout strategy needs from the adapter.
pub trait RowSource {
    /// Rows of the scope's SELECT with the identifier stripped.
    fn select(&mut self, scope: &Scope) -> Result<Vec<(RecordId, RowAttributes)>>;
    /// Raw rows of the scope's SELECT.
    fn select_rows(&mut self, scope: &Scope) -> Result<Vec<Row>>;
    /// Next page of candidate identifiers.
    fn pre_select(&mut self, table: &str, limit: Option<usize>, cursor: Option<&Cursor>) -> Result<KeyPage>;
}

impl<C: Connection> RowSource for Adapter<C> {
    fn select(&mut self, scope: &Scope) -> Result<Vec<(RecordId, RowAttributes)>> {
        Adapter::select(self, scope)
    }

    fn select_rows(&mut self, scope: &Scope) -> Result<Vec<Row>> {
        Adapter::select_rows(self, scope)
    }

    fn pre_select(&mut self, table: &str, limit: Option<usize>, cursor: Option<&Cursor>) -> Result<KeyPage> {
        Adapter::pre_select(self, table, limit, cursor)
    }
}

/// Records of one fetch, grouped per identifier in arrival order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Stored attributes per identifier.
    pub records: Vec<(RecordId, RowAttributes)>,
    /// Cursor returned by the key pager, select-all only.
    pub next_cursor: Option<Cursor>,
}

/// Fetch and assembly behaviour of one row layout.
pub trait LayoutStrategy: Send + Sync {
    /// Fetches and groups the rows selected by `scope`.
    fn fetch_page(&self, source: &mut dyn RowSource, scope: &Scope) -> Result<Page>;

    /// Folds grouped records into the layout's result shape.
    fn assemble(&self, records: Vec<(RecordId, RowAttributes)>, scope: &Scope) -> Results;
}

struct FixedSchema;
struct DynamicAttribute;
struct Schemaless;

impl LayoutStrategy for FixedSchema {
    fn fetch_page(&self, source: &mut dyn RowSource, scope: &Scope) -> Result<Page> {
        Ok(Page {
            records: source.select(scope)?,
            next_cursor: None,
        })
    }

    fn assemble(&self, records: Vec<(RecordId, RowAttributes)>, scope: &Scope) -> Results {
        per_identifier(records, scope)
    }
}

impl LayoutStrategy for DynamicAttribute {
    fn fetch_page(&self, source: &mut dyn RowSource, scope: &Scope) -> Result<Page> {
        fetch_cells(source, scope)
    }

    fn assemble(&self, records: Vec<(RecordId, RowAttributes)>, scope: &Scope) -> Results {
        per_identifier(records, scope)
    }
}

impl LayoutStrategy for Schemaless {
    fn fetch_page(&self, source: &mut dyn RowSource, scope: &Scope) -> Result<Page> {
        fetch_cells(source, scope)
    }

    fn assemble(&self, records: Vec<(RecordId, RowAttributes)>, _scope: &Scope) -> Results {
        let merged: BTreeMap<RecordId, AttributeSet> = records
            .into_iter()
            .map(|(id, attributes)| (id, AttributeSet::from_stored(attributes)))
            .collect();
        Results::Merged(merged)
    }
}

fn per_identifier(records: Vec<(RecordId, RowAttributes)>, scope: &Scope) -> Results {
    let descriptor = scope.descriptor();
    let items = records
        .into_iter()
        .map(|(id, attributes)| {
            if scope.is_raw() {
                ResultItem::Raw {
                    id,
                    attributes: AttributeSet::from_stored(attributes),
                }
            } else {
                ResultItem::Record(descriptor.instantiate(id, attributes))
            }
        })
        .collect();
    Results::Items(items)
}

/// Cell layouts: in select-all mode the key pager picks the identifiers
/// first; an empty key page ends iteration without a cell fetch.
fn fetch_cells(source: &mut dyn RowSource, scope: &Scope) -> Result<Page> {
    if !scope.is_all() {
        let rows = source.select_rows(&scope.for_cell_fetch(None))?;
        return Ok(Page {
            records: group_cells(rows),
            next_cursor: None,
        });
    }

    let KeyPage { ids, next_cursor } =
        source.pre_select(scope.descriptor().table(), scope.limit_value(), scope.next_cursor())?;
    if ids.is_empty() {
        debug!(table = scope.descriptor().table(), "scope.select_all.exhausted");
        return Ok(Page {
            records: Vec::new(),
            next_cursor,
        });
    }
    let rows = source.select_rows(&scope.for_cell_fetch(Some(ids)))?;
    Ok(Page {
        records: group_cells(rows),
        next_cursor,
    })
}

/// Groups `(KEY, column1, value)` rows by key, preserving first-seen order.
fn group_cells(rows: Vec<Row>) -> Vec<(RecordId, RowAttributes)> {
    let mut grouped: Vec<(RecordId, RowAttributes)> = Vec::new();
    let mut index: FxHashMap<RecordId, usize> = FxHashMap::default();
    for row in rows {
        let key = row.get(KEY_COLUMN).or_else(|| row.value_at(0));
        let (Some(key), Some(name)) = (key, row.value_at(1)) else {
            continue;
        };
        let id = RecordId::from(key);
        let value = row.value_at(2).map(str::to_owned);
        let slot = *index.entry(id.clone()).or_insert_with(|| {
            grouped.push((id, RowAttributes::new()));
            grouped.len() - 1
        });
        grouped[slot].1.insert(name.to_owned(), value);
    }
    grouped
}
