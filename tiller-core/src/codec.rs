use crate::{MapperError, Result, Value};
use std::fmt::{self, Debug};
use time::{
    Date, PrimitiveDateTime, Time, format_description::BorrowedFormatItem,
    macros::format_description,
};

/// Pair of conversions attached to a declared field.
///
/// `decode` turns the value read from storage into the domain value assigned to the field,
/// `encode` turns the field value back into something that can be escaped into SQL. Both must
/// let `Value::Null` through.
#[derive(Clone, Copy)]
pub struct Codec {
    pub name: &'static str,
    pub decode: fn(Value) -> Result<Value>,
    pub encode: fn(Value) -> Result<Value>,
}

impl Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").field("name", &self.name).finish()
    }
}

impl PartialEq for Codec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

fn invalid(codec: &str, reason: impl ToString) -> crate::Error {
    MapperError::InvalidValue {
        target: format!("{codec} codec"),
        reason: reason.to_string(),
    }
    .into()
}

/// `YYYY-MM-DD` text column to [`Value::Date`].
pub const DATE: Codec = Codec {
    name: "date",
    decode: |value| match value {
        Value::Text(v) if v.is_empty() => Ok(Value::Null),
        Value::Text(v) => {
            // Accept timestamps stored in a date column, keep the date part
            let date = v.get(..10).unwrap_or(&v);
            Date::parse(date, DATE_FORMAT)
                .map(Value::Date)
                .map_err(|e| invalid("date", format!("`{v}`: {e}")))
        }
        Value::Null | Value::Date(..) => Ok(value),
        v => Err(invalid("date", format!("cannot decode {}", v.kind()))),
    },
    encode: |value| match value {
        Value::Date(v) => v
            .format(DATE_FORMAT)
            .map(Value::Text)
            .map_err(|e| invalid("date", e)),
        Value::Null | Value::Text(..) => Ok(value),
        v => Err(invalid("date", format!("cannot encode {}", v.kind()))),
    },
};

/// `HH:MM:SS` text column to [`Value::Time`].
pub const TIME: Codec = Codec {
    name: "time",
    decode: |value| match value {
        Value::Text(v) if v.is_empty() => Ok(Value::Null),
        Value::Text(v) => Time::parse(v.get(..8).unwrap_or(&v), TIME_FORMAT)
            .map(Value::Time)
            .map_err(|e| invalid("time", format!("`{v}`: {e}"))),
        Value::Null | Value::Time(..) => Ok(value),
        v => Err(invalid("time", format!("cannot decode {}", v.kind()))),
    },
    encode: |value| match value {
        Value::Time(v) => v
            .format(TIME_FORMAT)
            .map(Value::Text)
            .map_err(|e| invalid("time", e)),
        Value::Null | Value::Text(..) => Ok(value),
        v => Err(invalid("time", format!("cannot encode {}", v.kind()))),
    },
};

/// `YYYY-MM-DD HH:MM:SS` text column to [`Value::Timestamp`].
pub const TIMESTAMP: Codec = Codec {
    name: "timestamp",
    decode: |value| match value {
        Value::Text(v) if v.is_empty() => Ok(Value::Null),
        Value::Text(v) => {
            let normalized = v.replacen('T', " ", 1);
            PrimitiveDateTime::parse(
                normalized.get(..19).unwrap_or(&normalized),
                TIMESTAMP_FORMAT,
            )
            .map(Value::Timestamp)
            .map_err(|e| invalid("timestamp", format!("`{v}`: {e}")))
        }
        Value::Null | Value::Timestamp(..) => Ok(value),
        v => Err(invalid("timestamp", format!("cannot decode {}", v.kind()))),
    },
    encode: |value| match value {
        Value::Timestamp(v) => v
            .format(TIMESTAMP_FORMAT)
            .map(Value::Text)
            .map_err(|e| invalid("timestamp", e)),
        Value::Null | Value::Text(..) => Ok(value),
        v => Err(invalid("timestamp", format!("cannot encode {}", v.kind()))),
    },
};

fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(v) => Value::Boolean(v),
        serde_json::Value::Number(v) => match v.as_i64() {
            Some(v) => Value::Integer(v),
            None => Value::Float(v.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(v) => Value::Text(v),
        serde_json::Value::Array(v) => Value::List(v.into_iter().map(json_to_value).collect()),
        v @ serde_json::Value::Object(..) => Value::Json(v),
    }
}

fn value_to_json(value: Value) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(v) => v.into(),
        Value::Integer(v) => v.into(),
        Value::Float(v) => v.into(),
        Value::Text(v) => v.into(),
        Value::List(v) => serde_json::Value::Array(
            v.into_iter()
                .map(value_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Json(v) => v,
        v => return Err(invalid("array", format!("cannot encode {}", v.kind()))),
    })
}

/// JSON array stored as text to [`Value::List`]. An empty column decodes to an empty list and an
/// empty list encodes to `NULL`.
pub const ARRAY: Codec = Codec {
    name: "array",
    decode: |value| match value {
        Value::Null => Ok(Value::List(Vec::new())),
        Value::Text(v) if v.is_empty() => Ok(Value::List(Vec::new())),
        Value::Text(v) => match serde_json::from_str(&v) {
            Ok(serde_json::Value::Array(items)) => {
                Ok(Value::List(items.into_iter().map(json_to_value).collect()))
            }
            Ok(..) => Err(invalid("array", format!("`{v}` is not a JSON array"))),
            Err(e) => Err(invalid("array", e)),
        },
        Value::List(..) => Ok(value),
        v => Err(invalid("array", format!("cannot decode {}", v.kind()))),
    },
    encode: |value| match value {
        Value::Null => Ok(Value::Null),
        Value::List(v) if v.is_empty() => Ok(Value::Null),
        Value::List(v) => serde_json::to_string(&value_to_json(Value::List(v))?)
            .map(Value::Text)
            .map_err(|e| invalid("array", e)),
        v => Err(invalid("array", format!("cannot encode {}", v.kind()))),
    },
};

/// JSON object stored as text to [`Value::Json`].
pub const OBJECT: Codec = Codec {
    name: "object",
    decode: |value| match value {
        Value::Text(v) if v.is_empty() => Ok(Value::Null),
        Value::Text(v) => serde_json::from_str(&v)
            .map(Value::Json)
            .map_err(|e| invalid("object", e)),
        Value::Null | Value::Json(..) => Ok(value),
        v => Err(invalid("object", format!("cannot decode {}", v.kind()))),
    },
    encode: |value| match value {
        Value::Json(serde_json::Value::Null) | Value::Null => Ok(Value::Null),
        Value::Json(v) => serde_json::to_string(&v)
            .map(Value::Text)
            .map_err(|e| invalid("object", e)),
        v => Err(invalid("object", format!("cannot encode {}", v.kind()))),
    },
};

/// Applies an optional codec in the decoding direction.
pub fn decode_with(codec: Option<&Codec>, value: Value) -> Result<Value> {
    match codec {
        Some(codec) => (codec.decode)(value),
        None => Ok(value),
    }
}

/// Applies an optional codec in the encoding direction.
pub fn encode_with(codec: Option<&Codec>, value: Value) -> Result<Value> {
    match codec {
        Some(codec) => (codec.encode)(value),
        None => Ok(value),
    }
}
