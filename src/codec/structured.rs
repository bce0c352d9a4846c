use super::{Decoded, TypeCodec, Value};
use crate::types::{Result, WidecolError};

/// JSON documents, stored as compact JSON text.
pub struct JsonCodec;

impl TypeCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::Json(json) => serde_json::to_string(json)
                .map_err(|_| WidecolError::type_mismatch(self.name(), value)),
            other => Err(WidecolError::type_mismatch(self.name(), other)),
        }
    }

    fn decode(&self, stored: &str) -> Decoded {
        match serde_json::from_str(stored) {
            Ok(json) => Decoded::Value(Value::Json(json)),
            Err(_) => Decoded::Raw(stored.to_owned()),
        }
    }

    fn typecast(&self, value: Value) -> Value {
        match value {
            Value::Json(_) => value,
            Value::String(s) => match serde_json::from_str(&s) {
                Ok(json) => Value::Json(json),
                Err(_) => Value::Json(serde_json::Value::String(s)),
            },
            Value::Integer(i) => Value::Json(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map_or(Value::Null, |n| Value::Json(serde_json::Value::Number(n))),
            Value::Boolean(b) => Value::Json(b.into()),
            Value::Array(items) => Value::Json(items.into()),
            _ => Value::Null,
        }
    }
}

/// Lists of strings, stored as a JSON array.
pub struct ArrayCodec;

impl TypeCodec for ArrayCodec {
    fn name(&self) -> &'static str {
        "array"
    }

    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::Array(items) => serde_json::to_string(items)
                .map_err(|_| WidecolError::type_mismatch(self.name(), value)),
            other => Err(WidecolError::type_mismatch(self.name(), other)),
        }
    }

    fn decode(&self, stored: &str) -> Decoded {
        match serde_json::from_str::<Vec<String>>(stored) {
            Ok(items) => Decoded::Value(Value::Array(items)),
            Err(_) => Decoded::Raw(stored.to_owned()),
        }
    }

    fn typecast(&self, value: Value) -> Value {
        match value {
            Value::Array(_) => value,
            Value::String(s) => match serde_json::from_str::<Vec<String>>(&s) {
                Ok(items) => Value::Array(items),
                Err(_) => Value::Array(vec![s]),
            },
            Value::Json(json) => serde_json::from_value::<Vec<String>>(json)
                .map_or(Value::Null, Value::Array),
            _ => Value::Null,
        }
    }
}
