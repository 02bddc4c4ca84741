use crate::{Codec, MapperError, Order, Result, normalize_name};
use std::collections::HashMap;

/// Declared field of an entity type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    pub codec: Option<Codec>,
}

/// Static description of an entity type, generated by [`crate::entity!`].
#[derive(Debug, PartialEq)]
pub struct EntitySchema {
    /// Rust type name, used in error messages.
    pub name: &'static str,
    pub table: &'static str,
    /// Declared fields, in declaration order.
    pub fields: &'static [FieldDef],
    /// Fields uniquely identifying a row.
    pub identity: &'static [&'static str],
    /// Default sort applied when a lookup does not specify one.
    pub order: &'static [(&'static str, Order)],
    /// Read only derived properties.
    pub computed: &'static [&'static str],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|v| v.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn codec(&self, name: &str) -> Option<&'static Codec> {
        self.field(name).and_then(|v| v.codec.as_ref())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|v| v.name)
    }

    pub fn is_identity(&self, name: &str) -> bool {
        self.identity.iter().any(|v| *v == name)
    }

    pub(crate) fn unknown_field(&self, field: &str) -> MapperError {
        MapperError::UnknownField {
            entity: self.name.into(),
            field: field.into(),
        }
    }
}

/// Bidirectional association between live columns and declared fields of one entity type.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Mapping {
    columns: Vec<(String, &'static str)>,
    to_column: HashMap<String, String>,
}

impl Mapping {
    /// Field stored in `column`.
    pub fn field(&self, column: &str) -> Option<&'static str> {
        self.columns
            .iter()
            .find_map(|(c, f)| (c == column).then_some(*f))
    }

    /// Column storing `field`, the first matching column wins when several normalize the same way.
    pub fn column(&self, field: &str) -> Option<&str> {
        self.to_column.get(field).map(String::as_str)
    }

    /// Field to column translation, as consumed by [`crate::Query::map`].
    pub fn fields_to_columns(&self) -> &HashMap<String, String> {
        &self.to_column
    }

    /// `(column, field)` pairs in live column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.columns.iter().map(|(c, f)| (c.as_str(), *f))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Matches every live column to a declared field of `schema`.
///
/// Names are compared after dropping non alphanumeric characters and lowercasing, so `first_name`,
/// `FirstName` and `firstName` all match each other. A column without a field is a
/// [`MapperError::SchemaMismatch`], a field without a column is fine. The first declared field
/// matching a column wins.
pub fn map_fields<S: AsRef<str>>(schema: &EntitySchema, columns: &[S]) -> Result<Mapping> {
    let fields = schema
        .fields
        .iter()
        .map(|v| (normalize_name(v.name), v.name))
        .collect::<Vec<_>>();
    let mut mapping = Mapping::default();
    let mut unmatched = Vec::new();
    for column in columns {
        let column = column.as_ref();
        let normalized = normalize_name(column);
        match fields.iter().find(|(n, _)| *n == normalized) {
            Some((_, field)) => {
                mapping.columns.push((column.into(), *field));
                mapping
                    .to_column
                    .entry((*field).into())
                    .or_insert_with(|| column.into());
            }
            None => unmatched.push(column.to_string()),
        }
    }
    if !unmatched.is_empty() {
        return Err(MapperError::SchemaMismatch {
            entity: schema.name,
            table: schema.table,
            columns: unmatched,
        }
        .into());
    }
    Ok(mapping)
}
