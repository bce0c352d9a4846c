use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::debug;

use crate::adapter::{Adapter, Connection};
use crate::codec::Value;
use crate::statement::StoredAttributes;
use crate::types::{RecordId, Result, WidecolError};

use super::descriptor::{CREATED_AT, UPDATED_AT};
use super::EntityDescriptor;

static NULL: Value = Value::Null;

/// `(before, after)` pairs keyed by attribute name.
pub type Changes = BTreeMap<String, (Value, Value)>;

/// A record instance with dirty tracking.
///
/// Assigned values are typecast through the attribute's codec before they are
/// compared with the persisted value, so `"5.01"` assigned over a stored
/// `5.01` float is not a change.
#[derive(Clone, Debug)]
pub struct Record {
    descriptor: Arc<EntityDescriptor>,
    id: RecordId,
    attributes: BTreeMap<String, Value>,
    changes: Changes,
    previous_changes: Changes,
    new_record: bool,
    destroyed: bool,
}

impl Record {
    pub(crate) fn new(descriptor: Arc<EntityDescriptor>, id: RecordId) -> Self {
        Self {
            descriptor,
            id,
            attributes: BTreeMap::new(),
            changes: Changes::new(),
            previous_changes: Changes::new(),
            new_record: true,
            destroyed: false,
        }
    }

    pub(crate) fn persisted(
        descriptor: Arc<EntityDescriptor>,
        id: RecordId,
        attributes: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            attributes,
            new_record: false,
            ..Self::new(descriptor, id)
        }
    }

    /// Row key.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Record type.
    pub fn descriptor(&self) -> &Arc<EntityDescriptor> {
        &self.descriptor
    }

    /// Current non-null attribute values.
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// True until the first successful save.
    pub fn is_new_record(&self) -> bool {
        self.new_record
    }

    /// True after `destroy`.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Saved and not destroyed.
    pub fn is_persisted(&self) -> bool {
        !self.new_record && !self.destroyed
    }

    /// Current value of `name`; [`Value::Null`] when unset.
    pub fn read_attribute(&self, name: &str) -> &Value {
        self.attributes.get(name).unwrap_or(&NULL)
    }

    /// Typecasts and assigns `value`, recording a change only when the
    /// canonical value differs from the persisted one.
    pub fn write_attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let ty = self.descriptor.resolve_type(name)?;
        let value = ty.typecast(value.into());
        let original = match self.changes.get(name) {
            Some((before, _)) => before.clone(),
            None => self.read_attribute(name).clone(),
        };
        if value == original {
            self.changes.remove(name);
        } else {
            self.changes.insert(name.to_owned(), (original, value.clone()));
        }
        if value.is_null() {
            self.attributes.remove(name);
        } else {
            self.attributes.insert(name.to_owned(), value);
        }
        Ok(())
    }

    /// Assigns several attributes.
    pub fn assign_attributes<I, K, V>(&mut self, attributes: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in attributes {
            let name = name.into();
            self.write_attribute(&name, value)?;
        }
        Ok(())
    }

    /// Any unsaved changes.
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Whether `name` has an unsaved change.
    pub fn attribute_changed(&self, name: &str) -> bool {
        self.changes.contains_key(name)
    }

    /// Names of changed attributes.
    pub fn changed_attributes(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// Unsaved changes.
    pub fn changes(&self) -> &Changes {
        &self.changes
    }

    /// Changes persisted by the most recent save.
    pub fn previous_changes(&self) -> &Changes {
        &self.previous_changes
    }

    /// Writes changed attributes: non-null ones are upserted, nulled ones are
    /// removed from the row. Clears the dirty state on success.
    ///
    /// Inside an active batch the write is only buffered, so the dirty state
    /// is kept: a discarded or failed batch leaves the record ready to be
    /// saved again. Call [`Record::mark_persisted`] once the batch applied.
    pub fn save<C: Connection>(&mut self, adapter: &mut Adapter<C>) -> Result<()> {
        if self.destroyed {
            return Err(WidecolError::invalid(format!("record {} was destroyed", self.id)));
        }
        if self.descriptor.has_timestamps() {
            self.touch_timestamps()?;
        }

        let mut stored = StoredAttributes::new();
        for (name, (_, value)) in &self.changes {
            let ty = self.descriptor.resolve_type(name)?;
            stored.insert(name.clone(), ty.encode_nullable(value)?);
        }
        adapter.write(self.descriptor.table(), &self.id, &stored)?;
        let buffered = adapter.is_batching();
        debug!(
            table = self.descriptor.table(),
            id = %self.id,
            attributes = stored.len(),
            new_record = self.new_record,
            buffered,
            "record.save"
        );

        if !buffered {
            self.mark_persisted();
        }
        Ok(())
    }

    /// Clears the dirty state after the write of a buffered save was applied.
    pub fn mark_persisted(&mut self) {
        self.previous_changes = mem::take(&mut self.changes);
        self.new_record = false;
    }

    /// Assigns `attributes` and saves.
    pub fn update_attributes<C, I, K, V>(&mut self, adapter: &mut Adapter<C>, attributes: I) -> Result<()>
    where
        C: Connection,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.assign_attributes(attributes)?;
        self.save(adapter)
    }

    /// Re-reads the record, discarding unsaved changes.
    pub fn reload<C: Connection>(&mut self, adapter: &mut Adapter<C>) -> Result<()> {
        let fresh = self.descriptor.scope().find(adapter, self.id.clone())?;
        self.attributes = fresh.attributes;
        self.changes.clear();
        self.new_record = false;
        Ok(())
    }

    /// Deletes the whole row.
    pub fn destroy<C: Connection>(&mut self, adapter: &mut Adapter<C>) -> Result<()> {
        adapter.delete(self.descriptor.table(), self.id.clone())?;
        self.destroyed = true;
        Ok(())
    }

    fn touch_timestamps(&mut self) -> Result<()> {
        let now = OffsetDateTime::now_utc();
        if self.new_record && self.read_attribute(CREATED_AT).is_null() {
            self.write_attribute(CREATED_AT, now)?;
        }
        let explicit = self.attribute_changed(UPDATED_AT) && !self.read_attribute(UPDATED_AT).is_null();
        if (self.new_record || self.changed()) && !explicit {
            self.write_attribute(UPDATED_AT, now)?;
        }
        Ok(())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.table() == other.descriptor.table()
            && self.id == other.id
            && self.attributes == other.attributes
    }
}
