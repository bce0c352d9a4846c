#![forbid(unsafe_code)]

//! Record types and record instances.

mod descriptor;
mod record;

pub use descriptor::{EntityDescriptor, EntityDescriptorBuilder, CREATED_AT, UPDATED_AT};
pub use record::{Changes, Record};
