use crate::{Error, MapperError, Result, Value};
use std::any;
use time::{Date, PrimitiveDateTime, Time};

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// Entity fields declared through [`crate::entity!`] must implement it: reading a field produces
/// `as_value`, assigning a decoded column goes through `try_from_value`.
///
/// # Examples
/// ```rust
/// use tiller_core::{AsValue, Value};
/// let v = 42i64.as_value();
/// assert_eq!(v, Value::Integer(42));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.into())
    }
}

fn mismatch<T>(value: &Value) -> Error {
    MapperError::InvalidValue {
        target: any::type_name::<T>().into(),
        reason: format!("unexpected {} value `{}`", value.kind(), value),
    }
    .into()
}

macro_rules! impl_as_integer {
    ($($source:ty),+ $(,)?) => {
        $(
            impl AsValue for $source {
                fn as_value(self) -> Value {
                    Value::Integer(self as i64)
                }
                fn try_from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::Integer(v) => <$source>::try_from(v).map_err(|_| {
                            MapperError::InvalidValue {
                                target: stringify!($source).into(),
                                reason: format!("{v} is out of range"),
                            }
                            .into()
                        }),
                        Value::Boolean(v) => Ok(v as _),
                        _ => Err(mismatch::<Self>(&value)),
                    }
                }
            }
        )+
    };
}
impl_as_integer!(i8, i16, i32, i64, u8, u16, u32);

impl AsValue for bool {
    fn as_value(self) -> Value {
        Value::Boolean(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(v) => Ok(v),
            // SQLite has no boolean storage class
            Value::Integer(v) => Ok(v != 0),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for f64 {
    fn as_value(self) -> Value {
        Value::Float(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Integer(v) => Ok(v as _),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for f32 {
    fn as_value(self) -> Value {
        Value::Float(self as _)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        f64::try_from_value(value).map(|v| v as _)
    }
}

impl AsValue for String {
    fn as_value(self) -> Value {
        Value::Text(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(v) => Ok(v),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

macro_rules! impl_as_domain {
    ($source:ty, $variant:path) => {
        impl AsValue for $source {
            fn as_value(self) -> Value {
                $variant(self)
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $variant(v) => Ok(v),
                    _ => Err(mismatch::<Self>(&value)),
                }
            }
        }
    };
}
impl_as_domain!(Date, Value::Date);
impl_as_domain!(Time, Value::Time);
impl_as_domain!(PrimitiveDateTime, Value::Timestamp);
impl_as_domain!(serde_json::Value, Value::Json);

impl<T: AsValue> AsValue for Option<T> {
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => Value::Null,
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::try_from_value(v).map(Some),
        }
    }
}

impl<T: AsValue> AsValue for Vec<T> {
    fn as_value(self) -> Value {
        Value::List(self.into_iter().map(AsValue::as_value).collect())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(v) => v.into_iter().map(T::try_from_value).collect(),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}
