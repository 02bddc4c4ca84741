use crate::{
    Context, Database, Entity, FieldValues, MapperError, Mapping, Order, Query, Records, Result,
    ResultSet, Shared, Transport, Value, decode_with, encode_with,
    expr::{assign, eq, sort},
    shared,
    statement::{DeleteQuery, InsertQuery, SelectQuery, UpdateQuery},
};
use std::{marker::PhantomData, sync::Arc};

/// Argument of [`Repository::find`]: either a scalar identity value (single field identities
/// only) or explicit `field = value` criteria.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Id(Value),
    Criteria(Vec<(String, Value)>),
}

macro_rules! impl_lookup_id {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for Lookup {
                fn from(value: $source) -> Self {
                    Lookup::Id(value.into())
                }
            }
        )+
    };
}
impl_lookup_id!(i64, i32, u32, &str, String, Value);

impl<S: Into<String>> From<Vec<(S, Value)>> for Lookup {
    fn from(value: Vec<(S, Value)>) -> Self {
        Lookup::Criteria(value.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[(S, Value); N]> for Lookup {
    fn from(value: [(S, Value); N]) -> Self {
        Lookup::Criteria(value.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Persistence operations for one entity type.
///
/// Queries are written in terms of field names, they are translated into the live column names
/// right before rendering.
pub struct Repository<'d, T: Transport, E: Entity> {
    db: &'d mut Database<T>,
    mapping: Arc<Mapping>,
    _entity: PhantomData<fn() -> E>,
}

impl<'d, T: Transport, E: Entity> Repository<'d, T, E> {
    pub(crate) fn new(db: &'d mut Database<T>, mapping: Arc<Mapping>) -> Self {
        Self {
            db,
            mapping,
            _entity: PhantomData,
        }
    }

    pub fn database(&mut self) -> &mut Database<T> {
        self.db
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// New unsaved entity with the given field values.
    pub fn create<S: AsRef<str>>(
        &self,
        values: impl IntoIterator<Item = (S, Value)>,
    ) -> Result<Shared<E>> {
        let schema = E::schema();
        let values = values.into_iter().collect::<Vec<_>>();
        let unknown = values
            .iter()
            .map(|(k, _)| k.as_ref())
            .filter(|k| !schema.has_field(k))
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            return Err(MapperError::UnknownField {
                entity: schema.name.into(),
                field: unknown.join(", "),
            }
            .into());
        }
        let mut entity = E::blank();
        for (field, value) in values {
            entity.set(field.as_ref(), value)?;
        }
        Ok(shared(entity))
    }

    /// Inserts the initialized fields of `entity`.
    ///
    /// A single field identity left empty is filled with the id generated by the endpoint. On
    /// success the entity becomes clean and is registered in the identity map.
    pub async fn insert(&mut self, entity: &Shared<E>) -> Result<ResultSet> {
        let schema = E::schema();
        let values = entity.read().diff()?;
        let mut query = InsertQuery::new(schema.table);
        query
            .values(values.iter().map(|(f, v)| (*f, v.clone())))
            .map(self.mapping.fields_to_columns());
        let result = self
            .db
            .execute(query.query())
            .await?
            .check()
            .with_context(|| format!("While inserting `{}`", schema.name))?;
        {
            let mut entity = entity.write();
            entity.state_mut().commit(&values);
            if let [identity] = schema.identity {
                let provided = values
                    .iter()
                    .any(|(f, v)| f == identity && !v.is_null());
                if let (false, Some(id)) = (provided, result.last_insert_id()) {
                    let id = decode_with(schema.codec(identity), Value::Integer(id))?;
                    entity.set(identity, id)?;
                    entity.reset()?;
                }
            }
        }
        self.db.identities_mut().register(entity.clone());
        Ok(result)
    }

    /// Writes the changed fields of `entity`, identified by its stored identity.
    ///
    /// Nothing is sent when no field changed. The entity becomes clean only once the statement
    /// succeeded.
    pub async fn update(&mut self, entity: &Shared<E>) -> Result<ResultSet> {
        let schema = E::schema();
        let (changes, conditions, old_hash) = {
            let entity = entity.read();
            let changes = entity.diff()?;
            if changes.is_empty() {
                log::debug!("`{}` has no changes, skipping the update", schema.name);
                return Ok(ResultSet::empty());
            }
            let stored = entity.dump(Some(schema.identity));
            let conditions = identity_conditions::<E>(&[&stored, &changes], "update")?;
            (changes, conditions, entity.identity_hash())
        };
        let mut query = UpdateQuery::new(schema.table);
        query
            .set(changes.iter().map(|(f, v)| assign(f, v.clone())))
            .r#where(conditions)
            .map(self.mapping.fields_to_columns());
        let result = self
            .db
            .execute(query.query())
            .await?
            .check()
            .with_context(|| format!("While updating `{}`", schema.name))?;
        entity.write().state_mut().commit(&changes);
        self.db.identities_mut().rehash(entity, old_hash);
        Ok(result)
    }

    /// Deletes the row of `entity`. Every identity field must be stored, otherwise nothing is
    /// sent. The associations resolved from `entity` are dropped from its cache.
    pub async fn delete(&mut self, entity: &Shared<E>) -> Result<ResultSet> {
        let schema = E::schema();
        let conditions = {
            let stored = entity.read().dump(Some(schema.identity));
            identity_conditions::<E>(&[&stored], "delete")?
        };
        let mut query = DeleteQuery::new(schema.table);
        query
            .r#where(conditions)
            .map(self.mapping.fields_to_columns());
        let result = self
            .db
            .execute(query.query())
            .await?
            .check()
            .with_context(|| format!("While deleting `{}`", schema.name))?;
        self.db.identities_mut().forget(entity);
        entity.write().state_mut().clear_cache();
        Ok(result)
    }

    /// Single entity by identity, `None` when nothing matches.
    ///
    /// A scalar id is only accepted for single field identities. More than one match is a
    /// [`MapperError::AmbiguousIdentity`].
    pub async fn find(&mut self, lookup: impl Into<Lookup>) -> Result<Option<Shared<E>>> {
        let schema = E::schema();
        let criteria = match lookup.into() {
            Lookup::Id(value) => match schema.identity {
                [identity] => vec![(identity.to_string(), value)],
                _ => {
                    return Err(MapperError::InsufficientIdentity {
                        entity: schema.name,
                        operation: "find",
                    }
                    .into());
                }
            },
            Lookup::Criteria(criteria) => criteria,
        };
        let criteria = criteria
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect::<Vec<_>>();
        let records = self.find_by(&criteria, &[], Some(2), None).await?;
        if records.len() > 1 {
            return Err(MapperError::AmbiguousIdentity {
                entity: schema.name,
            }
            .into());
        }
        Ok(records.first().cloned())
    }

    /// Entities whose fields equal `criteria`, sorted by `order` (or the default order of the
    /// entity when empty). `page` starts at 1 and is only meaningful along with `limit`.
    pub async fn find_by(
        &mut self,
        criteria: &[(&str, Value)],
        order: &[(&str, Order)],
        limit: Option<u64>,
        page: Option<u64>,
    ) -> Result<Records<E>> {
        let schema = E::schema();
        let mut conditions = Vec::with_capacity(criteria.len());
        for (field, value) in criteria {
            let Some(def) = schema.field(field) else {
                return Err(schema.unknown_field(field).into());
            };
            conditions.push(eq(def.name, encode_with(def.codec.as_ref(), value.clone())?));
        }
        let order = if order.is_empty() { schema.order } else { order };
        let mut sorts = Vec::with_capacity(order.len());
        for (field, direction) in order {
            let Some(def) = schema.field(field) else {
                return Err(schema.unknown_field(field).into());
            };
            sorts.push(sort(def.name, *direction));
        }
        let limit = limit.map(|v| row_count("limit", v)).transpose()?;
        let offset = match (limit, page) {
            (Some(limit), Some(page)) => {
                let offset = page.saturating_sub(1).checked_mul(limit).ok_or_else(|| {
                    MapperError::InvalidValue {
                        target: "offset".into(),
                        reason: format!("page {page} of {limit} rows is out of range"),
                    }
                })?;
                Some(row_count("offset", offset)?)
            }
            _ => None,
        };
        self.select(
            |query| {
                query
                    .r#where(conditions)
                    .order(sorts)
                    .limit(limit)
                    .offset(offset);
            },
            None,
        )
        .await
    }

    /// Every entity, sorted by `order` (or the default order of the entity when empty).
    pub async fn find_all(&mut self, order: &[(&str, Order)]) -> Result<Records<E>> {
        self.find_by(&[], order, None, None).await
    }

    /// Runs a custom select built on top of `SELECT * FROM <table>`.
    ///
    /// When `total` is given it receives the number of rows matching the same query without its
    /// order, limit and offset.
    pub async fn select(
        &mut self,
        builder: impl FnOnce(&mut SelectQuery),
        total: Option<&mut u64>,
    ) -> Result<Records<E>> {
        let schema = E::schema();
        let mut query = SelectQuery::new(schema.table);
        builder(&mut query);
        query.map(self.mapping.fields_to_columns());
        let result = self
            .db
            .execute(query.query())
            .await?
            .check()
            .with_context(|| format!("While selecting `{}`", schema.name))?;
        let records = self.db.materialize::<E>(result)?;
        if let Some(total) = total {
            query
                .fetch("COUNT(*) AS total")
                .order(std::iter::empty::<Query>())
                .limit(None)
                .offset(None);
            let result = self
                .db
                .execute(query.query())
                .await?
                .check()
                .with_context(|| format!("While counting `{}`", schema.name))?;
            *total = match result.record(0)? {
                Some(record) => record
                    .iter()
                    .next()
                    .and_then(|(_, v)| v.as_i64())
                    .unwrap_or_default() as u64,
                None => 0,
            };
        }
        Ok(records)
    }
}

/// `LIMIT` and `OFFSET` are signed 64 bit integers on the endpoint, negative ones mean no limit.
fn row_count(target: &str, value: u64) -> Result<u64> {
    if i64::try_from(value).is_err() {
        return Err(MapperError::InvalidValue {
            target: target.into(),
            reason: format!("{value} is larger than {}", i64::MAX),
        }
        .into());
    }
    Ok(value)
}

/// `field = value` conditions over the identity of `E`, each value taken from the first source
/// holding a non null value for it.
fn identity_conditions<E: Entity>(
    sources: &[&FieldValues],
    operation: &'static str,
) -> Result<Vec<Query>> {
    let schema = E::schema();
    schema
        .identity
        .iter()
        .map(|id| {
            sources
                .iter()
                .find_map(|values| {
                    values
                        .iter()
                        .find(|(f, v)| f == id && !v.is_null())
                        .map(|(f, v)| eq(f, v.clone()))
                })
                .ok_or_else(|| {
                    MapperError::InsufficientIdentity {
                        entity: schema.name,
                        operation,
                    }
                    .into()
                })
        })
        .collect()
}
