#![forbid(unsafe_code)]

//! Shared identifiers, consistency levels and the crate error type.

mod error;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use error::{DriverError, Result, WidecolError};

/// Name of the mandatory partition/row key column.
pub const KEY_COLUMN: &str = "KEY";

/// Row key every record is addressed by.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Generates a random 128-bit key rendered as lowercase hex.
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::random();
        RecordId(hex::encode(bytes))
    }

    /// Borrows the key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId(value.to_owned())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId(value)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId(value.to_string())
    }
}

/// Identifier argument for deletes and id-constrained selects: one key or a set of keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ids {
    /// Exactly one key.
    One(RecordId),
    /// A list of keys; a singleton list is collapsed to [`Ids::One`] when compiled.
    Many(Vec<RecordId>),
}

impl Ids {
    /// Collapses a singleton list and rejects the empty list.
    pub fn normalize(self) -> Result<Ids> {
        match self {
            Ids::One(id) => Ok(Ids::One(id)),
            Ids::Many(mut ids) => match ids.len() {
                0 => Err(WidecolError::invalid("identifier list must not be empty")),
                1 => Ok(Ids::One(ids.remove(0))),
                _ => Ok(Ids::Many(ids)),
            },
        }
    }
}

macro_rules! ids_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Ids {
                fn from(value: $ty) -> Self {
                    Ids::One(value.into())
                }
            }

            impl From<Vec<$ty>> for Ids {
                fn from(values: Vec<$ty>) -> Self {
                    Ids::Many(values.into_iter().map(Into::into).collect())
                }
            }
        )*
    };
}

ids_from!(&str, String, i64);

impl From<RecordId> for Ids {
    fn from(value: RecordId) -> Self {
        Ids::One(value)
    }
}

impl From<Vec<RecordId>> for Ids {
    fn from(values: Vec<RecordId>) -> Self {
        Ids::Many(values)
    }
}

impl From<&[RecordId]> for Ids {
    fn from(values: &[RecordId]) -> Self {
        Ids::Many(values.to_vec())
    }
}

/// Consistency level attached to statements via `USING CONSISTENCY`.
///
/// Deserialization goes through [`FromStr`], so `"QUORUM"` and `"local_quorum"`
/// are both accepted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Consistency {
    /// ANY
    Any,
    /// ONE
    One,
    /// TWO
    Two,
    /// THREE
    Three,
    /// QUORUM
    Quorum,
    /// ALL
    All,
    /// LOCAL_QUORUM
    LocalQuorum,
    /// EACH_QUORUM
    EachQuorum,
    /// LOCAL_ONE
    LocalOne,
}

impl Consistency {
    /// Keyword emitted into statement text.
    pub const fn as_str(self) -> &'static str {
        match self {
            Consistency::Any => "ANY",
            Consistency::One => "ONE",
            Consistency::Two => "TWO",
            Consistency::Three => "THREE",
            Consistency::Quorum => "QUORUM",
            Consistency::All => "ALL",
            Consistency::LocalQuorum => "LOCAL_QUORUM",
            Consistency::EachQuorum => "EACH_QUORUM",
            Consistency::LocalOne => "LOCAL_ONE",
        }
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Consistency {
    type Err = WidecolError;

    fn from_str(s: &str) -> Result<Self> {
        let level = match s.to_ascii_lowercase().as_str() {
            "any" => Consistency::Any,
            "one" => Consistency::One,
            "two" => Consistency::Two,
            "three" => Consistency::Three,
            "quorum" => Consistency::Quorum,
            "all" => Consistency::All,
            "local_quorum" => Consistency::LocalQuorum,
            "each_quorum" => Consistency::EachQuorum,
            "local_one" => Consistency::LocalOne,
            other => {
                return Err(WidecolError::Config(format!(
                    "unknown consistency level '{other}'"
                )))
            }
        };
        Ok(level)
    }
}

impl TryFrom<String> for Consistency {
    type Error = WidecolError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}
