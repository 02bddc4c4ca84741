use crate::{
    Entity, Envelope, IdentityMap, MapperError, RawRecord, RemoteError, Result, Shared,
    WireValue, map_fields, shared,
};
use std::{slice, vec};

/// Outcome of one statement: the SQL that was sent and the envelope received back.
///
/// Remote errors are kept inside the result, [`ResultSet::check`] turns them into a
/// [`MapperError::RemoteStatement`].
#[derive(Default, Debug, Clone, PartialEq)]
pub struct ResultSet {
    sql: String,
    envelope: Envelope,
}

impl ResultSet {
    pub fn new(sql: String, envelope: Envelope) -> Self {
        Self { sql, envelope }
    }

    /// Result of a statement that was never sent.
    pub fn empty() -> Self {
        Self::new(String::new(), Envelope::affected(0, None))
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn error(&self) -> Option<&RemoteError> {
        self.envelope.error.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.envelope.error.is_some()
    }

    pub fn check(self) -> Result<Self> {
        match &self.envelope.error {
            Some(RemoteError { code, message }) => Err(MapperError::RemoteStatement {
                code: code.clone(),
                message: message.clone(),
                sql: self.sql.clone(),
            }
            .into()),
            None => Ok(self),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.envelope.columns
    }

    pub fn rows(&self) -> &[Vec<WireValue>] {
        &self.envelope.rows
    }

    /// Number of rows, always zero for a failed statement.
    pub fn len(&self) -> usize {
        if self.is_error() {
            0
        } else {
            self.envelope.rows.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn affected_rows(&self) -> Option<u64> {
        self.envelope.affected_row_count
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        self.envelope.last_insert_id
    }

    /// Row `index` decoded into a [`RawRecord`].
    pub fn record(&self, index: usize) -> Result<Option<RawRecord>> {
        if index >= self.len() {
            return Ok(None);
        }
        RawRecord::from_row(&self.envelope.columns, &self.envelope.rows[index]).map(Some)
    }

    pub fn records(&self) -> Result<Vec<RawRecord>> {
        (0..self.len())
            .map(|i| RawRecord::from_row(&self.envelope.columns, &self.envelope.rows[i]))
            .collect()
    }

    /// Materializes every row as an `E`, going through `identities` so that a row whose identity
    /// is already live yields that same instance.
    pub fn of<E: Entity>(self, identities: &mut IdentityMap) -> Result<Records<E>> {
        let mut entities = Vec::with_capacity(self.len());
        if self.len() > 0 {
            let mapping = map_fields(E::schema(), &self.envelope.columns)?;
            for row in &self.envelope.rows {
                let mut entity = E::blank();
                entity.initialize(
                    mapping
                        .iter()
                        .zip(row)
                        .map(|((_, field), wire)| (field, wire)),
                    true,
                )?;
                entities.push(identities.register(shared(entity)));
            }
        }
        Ok(Records {
            result: self,
            entities,
        })
    }
}

/// Typed view over a [`ResultSet`], every row materialized once.
#[derive(Debug)]
pub struct Records<E: Entity> {
    result: ResultSet,
    entities: Vec<Shared<E>>,
}

impl<E: Entity> Clone for Records<E> {
    fn clone(&self) -> Self {
        Self {
            result: self.result.clone(),
            entities: self.entities.clone(),
        }
    }
}

impl<E: Entity> Records<E> {
    pub(crate) fn from_parts(result: ResultSet, entities: Vec<Shared<E>>) -> Self {
        Self { result, entities }
    }

    pub fn result(&self) -> &ResultSet {
        &self.result
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Shared<E>> {
        self.entities.get(index)
    }

    pub fn first(&self) -> Option<&Shared<E>> {
        self.entities.first()
    }

    pub fn iter(&self) -> slice::Iter<'_, Shared<E>> {
        self.entities.iter()
    }

    pub fn into_vec(self) -> Vec<Shared<E>> {
        self.entities
    }
}

impl<E: Entity> IntoIterator for Records<E> {
    type Item = Shared<E>;
    type IntoIter = vec::IntoIter<Shared<E>>;
    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'a, E: Entity> IntoIterator for &'a Records<E> {
    type Item = &'a Shared<E>;
    type IntoIter = slice::Iter<'a, Shared<E>>;
    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}
