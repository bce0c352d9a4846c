use tracing::debug;

use crate::adapter::{Adapter, Connection, Cursor};
use crate::model::Record;
use crate::types::{Ids, RecordId, Result, WidecolError};

use super::Scope;

impl Scope {
    /// Record with identifier `id`; [`WidecolError::NotFound`] when nothing is stored.
    pub fn find<C: Connection>(&self, adapter: &mut Adapter<C>, id: impl Into<RecordId>) -> Result<Record> {
        let id = id.into();
        self.find_by_id(adapter, id.clone())?.ok_or_else(|| {
            WidecolError::NotFound(format!("{} with KEY {id}", self.descriptor().table()))
        })
    }

    /// Record with identifier `id`, if stored.
    pub fn find_by_id<C: Connection>(
        &self,
        adapter: &mut Adapter<C>,
        id: impl Into<RecordId>,
    ) -> Result<Option<Record>> {
        let mut records = self.clone().ids(id.into()).to_records(adapter)?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        })
    }

    /// Records for `ids`, in fetch order; missing identifiers are skipped.
    pub fn find_many<C: Connection>(&self, adapter: &mut Adapter<C>, ids: impl Into<Ids>) -> Result<Vec<Record>> {
        self.clone().ids(ids).to_records(adapter)
    }

    /// First record of the scope.
    pub fn first<C: Connection>(&self, adapter: &mut Adapter<C>) -> Result<Option<Record>> {
        Ok(self.clone().limit(1).to_records(adapter)?.into_iter().next())
    }

    /// Walks the whole record type in pages of `batch_size` identifiers,
    /// calling `f` with each page's records until the key pager is exhausted.
    pub fn find_in_batches<C, F>(&self, adapter: &mut Adapter<C>, batch_size: usize, mut f: F) -> Result<()>
    where
        C: Connection,
        F: FnMut(Vec<Record>) -> Result<()>,
    {
        if batch_size == 0 {
            return Err(WidecolError::invalid("batch size must be positive"));
        }
        let table = self.descriptor().table().to_owned();
        let mut cursor: Option<Cursor> = None;
        let mut pages = 0usize;
        loop {
            let page = adapter.pre_select(&table, Some(batch_size), cursor.as_ref())?;
            if page.ids.is_empty() {
                break;
            }
            let records = self.clone().ids(page.ids).to_records(adapter)?;
            pages += 1;
            f(records)?;
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        debug!(table = %table, pages, "scope.find_in_batches.done");
        Ok(())
    }
}
