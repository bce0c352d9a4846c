use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time, UtcOffset};

use super::{Decoded, TypeCodec, Value};
use crate::types::{Result, WidecolError};

const DATE_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Calendar dates, stored as `YYYY-MM-DD`.
pub struct DateCodec;

impl TypeCodec for DateCodec {
    fn name(&self) -> &'static str {
        "date"
    }

    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::Date(date) => date
                .format(DATE_FORMAT)
                .map_err(|_| WidecolError::type_mismatch(self.name(), value)),
            other => Err(WidecolError::type_mismatch(self.name(), other)),
        }
    }

    fn decode(&self, stored: &str) -> Decoded {
        match Date::parse(stored, DATE_FORMAT) {
            Ok(date) => Decoded::Value(Value::Date(date)),
            Err(_) => Decoded::Raw(stored.to_owned()),
        }
    }

    fn typecast(&self, value: Value) -> Value {
        match value {
            Value::Date(_) => value,
            Value::Time(t) => Value::Date(t.date()),
            Value::String(s) => {
                let s = s.trim();
                Date::parse(s, DATE_FORMAT)
                    .ok()
                    .or_else(|| OffsetDateTime::parse(s, &Rfc3339).ok().map(|t| t.date()))
                    .map_or(Value::Null, Value::Date)
            }
            _ => Value::Null,
        }
    }
}

/// Instants, stored as RFC 3339 text.
pub struct TimeCodec;

impl TypeCodec for TimeCodec {
    fn name(&self) -> &'static str {
        "time"
    }

    fn encode(&self, value: &Value) -> Result<String> {
        match value {
            Value::Time(t) => t
                .format(&Rfc3339)
                .map_err(|_| WidecolError::type_mismatch(self.name(), value)),
            other => Err(WidecolError::type_mismatch(self.name(), other)),
        }
    }

    fn decode(&self, stored: &str) -> Decoded {
        match OffsetDateTime::parse(stored, &Rfc3339) {
            Ok(t) => Decoded::Value(Value::Time(t)),
            Err(_) => Decoded::Raw(stored.to_owned()),
        }
    }

    fn typecast(&self, value: Value) -> Value {
        match value {
            Value::Time(_) => value,
            Value::Date(date) => Value::Time(
                date.with_time(Time::MIDNIGHT)
                    .assume_offset(UtcOffset::UTC),
            ),
            Value::Integer(secs) => OffsetDateTime::from_unix_timestamp(secs)
                .map_or(Value::Null, Value::Time),
            Value::String(s) => OffsetDateTime::parse(s.trim(), &Rfc3339)
                .map_or(Value::Null, Value::Time),
            _ => Value::Null,
        }
    }
}
