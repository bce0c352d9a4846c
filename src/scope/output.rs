use std::collections::BTreeMap;

use crate::adapter::{Cursor, RowAttributes};
use crate::model::Record;
use crate::types::RecordId;

/// Attributes of one identifier in a raw or merged result.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeSet {
    /// Stored forms by attribute name.
    Values(RowAttributes),
    /// Only column names were fetched; stands in for "columns present".
    Names(Vec<String>),
}

impl AttributeSet {
    /// Names when every value is absent, stored forms otherwise.
    pub(crate) fn from_stored(attributes: RowAttributes) -> Self {
        if attributes.values().all(Option::is_none) {
            AttributeSet::Names(attributes.into_keys().collect())
        } else {
            AttributeSet::Values(attributes)
        }
    }

    /// Attribute names regardless of representation.
    pub fn names(&self) -> Vec<&str> {
        match self {
            AttributeSet::Values(values) => values.keys().map(String::as_str).collect(),
            AttributeSet::Names(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Stored form of `name`, if fetched.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            AttributeSet::Values(values) => values.get(name).and_then(|v| v.as_deref()),
            AttributeSet::Names(_) => None,
        }
    }
}

/// One per-identifier result.
#[derive(Clone, Debug, PartialEq)]
pub enum ResultItem {
    /// Decoded record.
    Record(Record),
    /// Raw response entry.
    Raw {
        /// Row key.
        id: RecordId,
        /// Stored forms or column names.
        attributes: AttributeSet,
    },
}

impl ResultItem {
    /// Row key of the item.
    pub fn id(&self) -> &RecordId {
        match self {
            ResultItem::Record(record) => record.id(),
            ResultItem::Raw { id, .. } => id,
        }
    }
}

/// Assembled results of one fetch.
#[derive(Clone, Debug, PartialEq)]
pub enum Results {
    /// Per-identifier results in fetch order.
    Items(Vec<ResultItem>),
    /// One mapping from identifier to its attributes.
    Merged(BTreeMap<RecordId, AttributeSet>),
}

impl Results {
    /// Number of identifiers covered.
    pub fn len(&self) -> usize {
        match self {
            Results::Items(items) => items.len(),
            Results::Merged(map) => map.len(),
        }
    }

    /// True when nothing was found.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The decoded records, skipping raw entries.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Results::Items(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    ResultItem::Record(record) => Some(record),
                    ResultItem::Raw { .. } => None,
                })
                .collect(),
            Results::Merged(_) => Vec::new(),
        }
    }

    /// Per-identifier items, if this is not a merged result.
    pub fn items(&self) -> Option<&[ResultItem]> {
        match self {
            Results::Items(items) => Some(items),
            Results::Merged(_) => None,
        }
    }

    /// Merged mapping, if this is a merged result.
    pub fn merged(&self) -> Option<&BTreeMap<RecordId, AttributeSet>> {
        match self {
            Results::Merged(map) => Some(map),
            Results::Items(_) => None,
        }
    }
}

/// Return envelope of [`Scope::execute`](super::Scope::execute).
///
/// Select-all scopes always answer with [`QueryOutput::Page`], carrying the
/// cursor for continuation; every other scope answers with the bare results.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryOutput {
    /// Bare results.
    Results(Results),
    /// Results of one select-all page.
    Page {
        /// Results of this page.
        results: Results,
        /// Cursor for the next page; `None` once exhausted.
        next_cursor: Option<Cursor>,
    },
}

impl QueryOutput {
    /// The results regardless of envelope.
    pub fn results(&self) -> &Results {
        match self {
            QueryOutput::Results(results) | QueryOutput::Page { results, .. } => results,
        }
    }

    /// Consumes the envelope.
    pub fn into_results(self) -> Results {
        match self {
            QueryOutput::Results(results) | QueryOutput::Page { results, .. } => results,
        }
    }

    /// Next cursor of a page envelope.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        match self {
            QueryOutput::Page { next_cursor, .. } => next_cursor.as_ref(),
            QueryOutput::Results(_) => None,
        }
    }

    /// True for the page envelope.
    pub fn is_page(&self) -> bool {
        matches!(self, QueryOutput::Page { .. })
    }
}
