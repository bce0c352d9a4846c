use super::{DateCodec, Decoded, TimeCodec, TypeCodec, Value};
use crate::types::{Result, WidecolError};

/// UTF-8 strings, stored verbatim.
pub struct StringCodec;

impl TypeCodec for StringCodec {
    fn name(&self) -> &'static str {
        "string"
    }

    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(WidecolError::type_mismatch(self.name(), other)),
        }
    }

    fn decode(&self, stored: &str) -> Decoded {
        Decoded::Value(Value::String(stored.to_owned()))
    }

    fn typecast(&self, value: Value) -> Value {
        match value {
            Value::String(_) | Value::Null => value,
            Value::Integer(i) => Value::String(i.to_string()),
            Value::Float(f) => Value::String(f.to_string()),
            Value::Boolean(b) => Value::String(b.to_string()),
            Value::Date(_) => DateCodec.encode(&value).map_or(Value::Null, Value::String),
            Value::Time(_) => TimeCodec.encode(&value).map_or(Value::Null, Value::String),
            Value::Json(json) => Value::String(json.to_string()),
            Value::Array(items) => {
                serde_json::to_string(&items).map_or(Value::Null, Value::String)
            }
        }
    }
}

/// Signed integers, stored as decimal text.
pub struct IntegerCodec;

impl TypeCodec for IntegerCodec {
    fn name(&self) -> &'static str {
        "integer"
    }

    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::Integer(i) => Ok(i.to_string()),
            other => Err(WidecolError::type_mismatch(self.name(), other)),
        }
    }

    fn decode(&self, stored: &str) -> Decoded {
        match stored.trim().parse::<i64>() {
            Ok(i) => Decoded::Value(Value::Integer(i)),
            Err(_) => Decoded::Raw(stored.to_owned()),
        }
    }

    fn typecast(&self, value: Value) -> Value {
        match value {
            Value::Integer(_) => value,
            Value::Float(f) if f.is_finite() => Value::Integer(f.trunc() as i64),
            Value::Boolean(b) => Value::Integer(i64::from(b)),
            Value::String(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    Value::Integer(i)
                } else {
                    match s.parse::<f64>() {
                        Ok(f) if f.is_finite() => Value::Integer(f.trunc() as i64),
                        _ => Value::Null,
                    }
                }
            }
            _ => Value::Null,
        }
    }
}

/// 64-bit floats, stored as the shortest round-tripping decimal text.
pub struct FloatCodec;

impl TypeCodec for FloatCodec {
    fn name(&self) -> &'static str {
        "float"
    }

    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::Float(f) => Ok(f.to_string()),
            other => Err(WidecolError::type_mismatch(self.name(), other)),
        }
    }

    fn decode(&self, stored: &str) -> Decoded {
        match stored.trim().parse::<f64>() {
            Ok(f) => Decoded::Value(Value::Float(f)),
            Err(_) => Decoded::Raw(stored.to_owned()),
        }
    }

    fn typecast(&self, value: Value) -> Value {
        match value {
            Value::Float(_) => value,
            Value::Integer(i) => Value::Float(i as f64),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_or(Value::Null, Value::Float),
            _ => Value::Null,
        }
    }
}

/// Booleans, stored as `"1"` / `"0"`.
pub struct BooleanCodec;

const TRUE_WORDS: &[&str] = &["1", "t", "true", "y", "yes", "on"];
const FALSE_WORDS: &[&str] = &["0", "f", "false", "n", "no", "off"];

fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim().to_ascii_lowercase();
    if TRUE_WORDS.contains(&text.as_str()) {
        Some(true)
    } else if FALSE_WORDS.contains(&text.as_str()) {
        Some(false)
    } else {
        None
    }
}

impl TypeCodec for BooleanCodec {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::Boolean(true) => Ok("1".to_owned()),
            Value::Boolean(false) => Ok("0".to_owned()),
            other => Err(WidecolError::type_mismatch(self.name(), other)),
        }
    }

    fn decode(&self, stored: &str) -> Decoded {
        match stored {
            "1" | "true" => Decoded::Value(Value::Boolean(true)),
            "0" | "false" => Decoded::Value(Value::Boolean(false)),
            _ => Decoded::Raw(stored.to_owned()),
        }
    }

    fn typecast(&self, value: Value) -> Value {
        match value {
            Value::Boolean(_) => value,
            Value::Integer(0) => Value::Boolean(false),
            Value::Integer(1) => Value::Boolean(true),
            Value::String(s) => parse_bool(&s).map_or(Value::Null, Value::Boolean),
            _ => Value::Null,
        }
    }
}
