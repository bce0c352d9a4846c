#![forbid(unsafe_code)]

//! Per-type attribute codecs.
//!
//! Every declared attribute type has a [`TypeCodec`] that converts between the
//! domain [`Value`] and the text form held by the store. Encoding is strict,
//! decoding is lenient, and `typecast` is the canonicaliser used both at
//! assignment time and for dirty comparison.

mod scalar;
mod structured;
mod temporal;
mod value;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::Result;

pub use scalar::{BooleanCodec, FloatCodec, IntegerCodec, StringCodec};
pub use structured::{ArrayCodec, JsonCodec};
pub use temporal::{DateCodec, TimeCodec};
pub use value::Value;

/// Outcome of decoding a stored form.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded {
    /// Stored form normalised into the declared type.
    Value(Value),
    /// Stored form could not be normalised; carried through unchanged.
    Raw(String),
}

impl Decoded {
    /// Lenient view: degraded input surfaces as a plain string.
    pub fn into_value(self) -> Value {
        match self {
            Decoded::Value(value) => value,
            Decoded::Raw(raw) => Value::String(raw),
        }
    }

    /// True when decoding fell back to the raw stored form.
    pub fn is_raw(&self) -> bool {
        matches!(self, Decoded::Raw(_))
    }
}

/// Conversion contract for one declared attribute type.
pub trait TypeCodec: Send + Sync {
    /// Type name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Converts a domain value into its stored text form.
    ///
    /// Fails with [`WidecolError::TypeMismatch`](crate::types::WidecolError::TypeMismatch)
    /// when `value` lies outside the type's domain.
    fn encode(&self, value: &Value) -> Result<String>;

    /// Converts a stored text form back into a domain value. Never fails.
    fn decode(&self, stored: &str) -> Decoded;

    /// Coerces arbitrary input into the canonical domain value, or
    /// [`Value::Null`] when it cannot be coerced.
    fn typecast(&self, value: Value) -> Value;
}

/// Declared attribute types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// [`StringCodec`]
    String,
    /// [`IntegerCodec`]
    Integer,
    /// [`FloatCodec`]
    Float,
    /// [`BooleanCodec`]
    Boolean,
    /// [`DateCodec`]
    Date,
    /// [`TimeCodec`]
    Time,
    /// [`JsonCodec`]
    Json,
    /// [`ArrayCodec`]
    Array,
}

impl AttributeType {
    /// Codec instance for this type.
    pub fn codec(self) -> &'static dyn TypeCodec {
        match self {
            AttributeType::String => &StringCodec,
            AttributeType::Integer => &IntegerCodec,
            AttributeType::Float => &FloatCodec,
            AttributeType::Boolean => &BooleanCodec,
            AttributeType::Date => &DateCodec,
            AttributeType::Time => &TimeCodec,
            AttributeType::Json => &JsonCodec,
            AttributeType::Array => &ArrayCodec,
        }
    }

    /// Encodes `value`, mapping [`Value::Null`] to `None` (column removal).
    pub fn encode_nullable(self, value: &Value) -> Result<Option<String>> {
        if value.is_null() {
            return Ok(None);
        }
        self.codec().encode(value).map(Some)
    }

    /// Decodes `stored`, reporting degraded input through tracing.
    pub fn decode_lenient(self, attribute: &str, stored: &str) -> Value {
        let decoded = self.codec().decode(stored);
        if decoded.is_raw() {
            warn!(
                attribute,
                attribute_type = self.codec().name(),
                stored,
                "codec.decode.degraded"
            );
        }
        decoded.into_value()
    }

    /// Typecasts `value` through this type's codec.
    pub fn typecast(self, value: Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        self.codec().typecast(value)
    }
}
