//! Widecol maps application records onto a wide-column store.
//!
//! Records of one type live in one column family in one of three row
//! layouts ([`scope::RowLayout`]). Writes go through an [`adapter::Adapter`]
//! that upserts non-null attributes and deletes null ones, optionally
//! buffered into a single batch. Reads are described by a [`scope::Scope`]
//! and assembled per layout, with cursor pagination for select-all queries.
//! Attribute values pass through a per-type [`codec::TypeCodec`].

#![warn(missing_docs)]

pub mod adapter;
pub mod codec;
pub mod config;
pub mod model;
pub mod scope;
pub mod statement;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
pub mod types;

pub use adapter::{Adapter, Connection, Cursor, Row};
pub use codec::{AttributeType, Value};
pub use config::ClusterConfig;
pub use model::{EntityDescriptor, Record};
pub use scope::{QueryOutput, Results, RowLayout, Scope};
pub use types::{Consistency, Ids, RecordId, Result, WidecolError};
