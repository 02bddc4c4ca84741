use crate::{AsValue, Result, Value, WireValue};

/// Field level access shared by raw rows and typed entities.
pub trait Record {
    /// Names of the fields, in declaration (or column) order.
    fn field_names(&self) -> Vec<&str>;

    /// Current value of `field`, `None` when the field is unknown or was never assigned.
    fn get(&self, field: &str) -> Option<Value>;

    /// Assigns `field`, converting the value into the field type.
    fn set(&mut self, field: &str, value: Value) -> Result<()>;

    /// Reads `field` converted into `T`, a missing field reads as `NULL`.
    fn get_as<T: AsValue>(&self, field: &str) -> Result<T>
    where
        Self: Sized,
    {
        T::try_from_value(self.get(field).unwrap_or_default())
    }
}

/// Untyped row, as returned by ad hoc queries.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct RawRecord {
    values: Vec<(String, Value)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Default::default()
    }

    /// Decodes a wire row, `columns` and `row` are matched positionally.
    pub fn from_row(columns: &[String], row: &[WireValue]) -> Result<Self> {
        Ok(Self {
            values: columns
                .iter()
                .zip(row)
                .map(|(column, wire)| Ok((column.clone(), wire.decode(column)?)))
                .collect::<Result<_>>()?,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Record for RawRecord {
    fn field_names(&self) -> Vec<&str> {
        self.values.iter().map(|(k, _)| k.as_str()).collect()
    }

    fn get(&self, field: &str) -> Option<Value> {
        self.values
            .iter()
            .find_map(|(k, v)| (k == field).then(|| v.clone()))
    }

    fn set(&mut self, field: &str, value: Value) -> Result<()> {
        match self.values.iter_mut().find(|(k, _)| k == field) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((field.into(), value)),
        }
        Ok(())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut record = RawRecord::new();
        for (k, v) in iter {
            // Later duplicates overwrite earlier ones
            let _ = record.set(&k.into(), v);
        }
        record
    }
}
