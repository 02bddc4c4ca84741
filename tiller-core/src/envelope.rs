use crate::{MapperError, Result, Value};

/// Statement level error reported by the remote endpoint.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub code: String,
    pub message: String,
}

/// Typed cell as transmitted by the endpoint: a type tag plus a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct WireValue {
    pub kind: String,
    pub value: serde_json::Value,
}

impl WireValue {
    pub fn new(kind: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn null() -> Self {
        Self::new("null", serde_json::Value::Null)
    }

    pub fn integer(value: i64) -> Self {
        // Integers travel as strings to preserve 64 bit precision
        Self::new("integer", value.to_string())
    }

    pub fn float(value: f64) -> Self {
        Self::new("float", value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new("text", value.into())
    }

    pub fn boolean(value: bool) -> Self {
        Self::new("boolean", value)
    }

    /// Decodes the cell into a [`Value`], `column` is only used for error reporting.
    pub fn decode(&self, column: &str) -> Result<Value> {
        let invalid = || -> crate::Error {
            MapperError::InvalidValue {
                target: column.into(),
                reason: format!("`{}` is not a valid {} payload", self.value, self.kind),
            }
            .into()
        };
        let value = &self.value;
        Ok(match self.kind.to_ascii_lowercase().as_str() {
            "null" => Value::Null,
            "integer" => match value {
                serde_json::Value::Number(v) => Value::Integer(v.as_i64().ok_or_else(invalid)?),
                serde_json::Value::String(v) => Value::Integer(v.parse().map_err(|_| invalid())?),
                serde_json::Value::Bool(v) => Value::Integer(*v as i64),
                serde_json::Value::Null => Value::Null,
                _ => return Err(invalid()),
            },
            "double" | "float" | "real" => match value {
                serde_json::Value::Number(v) => Value::Float(v.as_f64().ok_or_else(invalid)?),
                serde_json::Value::String(v) => Value::Float(v.parse().map_err(|_| invalid())?),
                serde_json::Value::Null => Value::Null,
                _ => return Err(invalid()),
            },
            "boolean" => match value {
                serde_json::Value::Bool(v) => Value::Boolean(*v),
                serde_json::Value::Number(v) => Value::Boolean(v.as_f64() != Some(0.0)),
                serde_json::Value::String(v) => match v.as_str() {
                    "1" | "true" | "TRUE" => Value::Boolean(true),
                    "0" | "false" | "FALSE" | "" => Value::Boolean(false),
                    _ => return Err(invalid()),
                },
                serde_json::Value::Null => Value::Null,
                _ => return Err(invalid()),
            },
            "string" | "text" | "blob" => match value {
                serde_json::Value::String(v) => Value::Text(v.clone()),
                serde_json::Value::Null => Value::Null,
                v => Value::Text(v.to_string()),
            },
            _ => {
                return Err(MapperError::UnknownWireType {
                    tag: self.kind.clone(),
                    column: column.into(),
                }
                .into());
            }
        })
    }
}

/// Raw response of one statement execution.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Envelope {
    pub error: Option<RemoteError>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<WireValue>>,
    pub affected_row_count: Option<u64>,
    pub last_insert_id: Option<i64>,
}

impl Envelope {
    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: Some(RemoteError {
                code: code.into(),
                message: message.into(),
            }),
            ..Default::default()
        }
    }

    pub fn affected(count: u64, last_insert_id: Option<i64>) -> Self {
        Self {
            affected_row_count: Some(count),
            last_insert_id,
            ..Default::default()
        }
    }

    pub fn rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: impl IntoIterator<Item = Vec<WireValue>>,
    ) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: rows.into_iter().collect(),
            affected_row_count: Some(0),
            ..Default::default()
        }
    }
}
