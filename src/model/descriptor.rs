use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adapter::{Adapter, Connection, RowAttributes};
use crate::codec::{AttributeType, Value};
use crate::scope::{RowLayout, Scope};
use crate::types::{RecordId, Result, WidecolError};

use super::Record;

/// Attribute set by [`EntityDescriptorBuilder::timestamps`] on create.
pub const CREATED_AT: &str = "created_at";
/// Attribute refreshed by [`EntityDescriptorBuilder::timestamps`] on every changing save.
pub const UPDATED_AT: &str = "updated_at";

/// Record type metadata: column family, row layout and declared attributes.
#[derive(Debug)]
pub struct EntityDescriptor {
    table: String,
    layout: RowLayout,
    attributes: BTreeMap<String, AttributeType>,
    timestamps: bool,
}

impl EntityDescriptor {
    /// Starts a descriptor for `table` with the fixed-schema layout.
    pub fn builder(table: impl Into<String>) -> EntityDescriptorBuilder {
        EntityDescriptorBuilder {
            descriptor: EntityDescriptor {
                table: table.into(),
                layout: RowLayout::FixedSchema,
                attributes: BTreeMap::new(),
                timestamps: false,
            },
        }
    }

    /// Column family name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Physical row layout.
    pub fn layout(&self) -> RowLayout {
        self.layout
    }

    /// Whether `created_at`/`updated_at` are maintained.
    pub fn has_timestamps(&self) -> bool {
        self.timestamps
    }

    /// Declared attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, AttributeType)> {
        self.attributes.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Declared type of `name`, if any.
    pub fn attribute_type(&self, name: &str) -> Option<AttributeType> {
        self.attributes.get(name).copied()
    }

    /// Type used for `name` on read and write. Schemaless records accept any
    /// attribute and treat undeclared ones as strings.
    pub fn resolve_type(&self, name: &str) -> Result<AttributeType> {
        match self.attribute_type(name) {
            Some(ty) => Ok(ty),
            None if self.layout == RowLayout::Schemaless => Ok(AttributeType::String),
            None => Err(WidecolError::invalid(format!(
                "unknown attribute '{name}' for {}",
                self.table
            ))),
        }
    }

    /// Fresh query scope over this record type.
    pub fn scope(self: &Arc<Self>) -> Scope {
        Scope::new(Arc::clone(self))
    }

    /// Builds a persisted record from stored forms; null cells are dropped.
    pub fn instantiate(self: &Arc<Self>, id: RecordId, stored: RowAttributes) -> Record {
        let attributes = stored
            .into_iter()
            .filter_map(|(name, value)| {
                let value = value?;
                let ty = self.attribute_type(&name).unwrap_or(AttributeType::String);
                let decoded = ty.decode_lenient(&name, &value);
                Some((name, decoded))
            })
            .collect();
        Record::persisted(Arc::clone(self), id, attributes)
    }

    /// Unsaved record with a generated identifier and `attributes` assigned.
    pub fn new_record<I, K, V>(self: &Arc<Self>, attributes: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut record = Record::new(Arc::clone(self), RecordId::generate());
        record.assign_attributes(attributes)?;
        Ok(record)
    }

    /// Builds and saves a record.
    pub fn create<C, I, K, V>(self: &Arc<Self>, adapter: &mut Adapter<C>, attributes: I) -> Result<Record>
    where
        C: Connection,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut record = self.new_record(attributes)?;
        record.save(adapter)?;
        Ok(record)
    }
}

/// Builder returned by [`EntityDescriptor::builder`].
#[derive(Debug)]
pub struct EntityDescriptorBuilder {
    descriptor: EntityDescriptor,
}

impl EntityDescriptorBuilder {
    /// Sets the row layout.
    pub fn layout(mut self, layout: RowLayout) -> Self {
        self.descriptor.layout = layout;
        self
    }

    /// Declares an attribute.
    pub fn attribute(mut self, name: impl Into<String>, ty: AttributeType) -> Self {
        self.descriptor.attributes.insert(name.into(), ty);
        self
    }

    /// Declares and maintains `created_at` / `updated_at`.
    pub fn timestamps(mut self) -> Self {
        self.descriptor.timestamps = true;
        self.attribute(CREATED_AT, AttributeType::Time)
            .attribute(UPDATED_AT, AttributeType::Time)
    }

    /// Finishes the descriptor.
    pub fn build(self) -> Arc<EntityDescriptor> {
        Arc::new(self.descriptor)
    }
}
