use crate::{
    Context, Database, Entity, MapperError, Query, Records, Result, ResultSet, Shared, Transport,
    Value, encode_with,
    expr::{assign, eq},
    statement::UpdateQuery,
};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Weak};

/// Field pairs relating a source entity to a target entity.
///
/// Without a join table the link holds a single `(source field, target field)` pair. With a join
/// table (see [`Link::through`]) it holds two pairs: `(source field, join column pointing at the
/// source)` followed by `(join column pointing at the target, target field)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pairs: Vec<(String, String)>,
    through: Option<String>,
}

impl Link {
    pub fn new<L: Into<String>, R: Into<String>>(pairs: impl IntoIterator<Item = (L, R)>) -> Self {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(l, r)| (l.into(), r.into()))
                .collect(),
            through: None,
        }
    }

    pub fn through(mut self, table: impl Into<String>) -> Self {
        self.through = Some(table.into());
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn join_table(&self) -> Option<&str> {
        self.through.as_deref()
    }

    /// Cache key of the association resolved through this link.
    fn signature(&self, kind: &str, target: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(b"\x1e");
        hasher.update(target.as_bytes());
        hasher.update(b"\x1e");
        hasher.update(self.through.as_deref().unwrap_or_default().as_bytes());
        for (l, r) in &self.pairs {
            hasher.update(b"\x1e");
            hasher.update(l.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(r.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    fn first(&self) -> Result<(&str, &str)> {
        let expected = if self.through.is_some() { 2 } else { 1 };
        if self.pairs.len() != expected {
            return Err(MapperError::InvalidValue {
                target: "link".into(),
                reason: format!(
                    "expected {expected} field pair(s), got {}",
                    self.pairs.len()
                ),
            }
            .into());
        }
        let (l, r) = &self.pairs[0];
        Ok((l, r))
    }
}

/// Association cache entry. Entities are held weakly so that a source and what it resolved (a
/// parent and its children, a self link) never keep each other alive.
struct Resolved<E: Entity> {
    result: ResultSet,
    entities: Vec<Weak<RwLock<E>>>,
}

impl<E: Entity> Resolved<E> {
    fn new<'a>(result: ResultSet, entities: impl IntoIterator<Item = &'a Shared<E>>) -> Self {
        Self {
            result,
            entities: entities.into_iter().map(Arc::downgrade).collect(),
        }
    }

    /// The cached records, `None` once any of them was dropped.
    fn upgrade(&self) -> Option<Records<E>> {
        let entities = self
            .entities
            .iter()
            .map(Weak::upgrade)
            .collect::<Option<Vec<_>>>()?;
        Some(Records::from_parts(self.result.clone(), entities))
    }
}

fn check_declared<E: Entity>(field: &str) -> Result<&'static str> {
    E::schema()
        .field(field)
        .map(|v| v.name)
        .ok_or_else(|| E::schema().unknown_field(field).into())
}

fn cached_records<S: Entity, E: Entity>(source: &Shared<S>, key: &str) -> Option<Records<E>> {
    source
        .read()
        .state()
        .cached::<Resolved<E>>(key)
        .and_then(Resolved::upgrade)
}

/// Current value of `field` on `entity`, encoded for a statement.
fn linked_value<E: Entity>(entity: &Shared<E>, field: &'static str) -> Result<Value> {
    let current = entity.read().get(field);
    let Some(current) = current else {
        return Err(MapperError::UninitializedField {
            entity: E::schema().name,
            field: field.into(),
        }
        .into());
    };
    encode_with(E::schema().codec(field), current)
}

impl<T: Transport> Database<T> {
    /// Resolves the single `E` related to `source`.
    ///
    /// The first resolution is cached on the source instance, later calls return the cached
    /// entity unless `refresh` is set or the cached entity was dropped in the meantime.
    pub async fn has_one<S: Entity, E: Entity>(
        &mut self,
        source: &Shared<S>,
        link: &Link,
        refresh: bool,
    ) -> Result<Option<Shared<E>>> {
        let key = link.signature("one", E::schema().table);
        if !refresh {
            let cached = cached_records::<S, E>(source, &key);
            if let Some(cached) = cached {
                return Ok(cached.first().cloned());
            }
        }
        let records = self.resolve::<S, E>(source, link).await?;
        let found = records.first().cloned();
        source.write().state_mut().cache(
            key,
            Resolved::new(records.result().clone(), found.as_ref()),
        );
        Ok(found)
    }

    /// Resolves every `E` related to `source`, cached like [`Database::has_one`].
    pub async fn has_many<S: Entity, E: Entity>(
        &mut self,
        source: &Shared<S>,
        link: &Link,
        refresh: bool,
    ) -> Result<Records<E>> {
        let key = link.signature("many", E::schema().table);
        if !refresh {
            let cached = cached_records::<S, E>(source, &key);
            if let Some(cached) = cached {
                return Ok(cached);
            }
        }
        let records = self.resolve::<S, E>(source, link).await?;
        source
            .write()
            .state_mut()
            .cache(key, Resolved::new(records.result().clone(), &records));
        Ok(records)
    }

    /// Relates `source` to `target` by copying the linked value onto the side that owns the
    /// foreign key, that is the side whose linked field is not part of its identity.
    ///
    /// When the owner is already stored, the new foreign key is written immediately with an
    /// `UPDATE` on that single column. The has one cache of `source` is replaced by `target`.
    pub async fn change_one<S: Entity, E: Entity>(
        &mut self,
        source: &Shared<S>,
        target: &Shared<E>,
        link: &Link,
    ) -> Result<Shared<E>> {
        if link.join_table().is_some() {
            return Err(MapperError::InvalidValue {
                target: "link".into(),
                reason: "cannot change an association going through a join table".into(),
            }
            .into());
        }
        let (source_field, target_field) = link.first()?;
        let source_field = check_declared::<S>(source_field)?;
        let target_field = check_declared::<E>(target_field)?;
        if !S::schema().is_identity(source_field) {
            let value = target.read().get(target_field).ok_or_else(|| {
                MapperError::UninitializedField {
                    entity: E::schema().name,
                    field: target_field.into(),
                }
            })?;
            self.reassign(source, source_field, value).await?;
        } else if !E::schema().is_identity(target_field) {
            let value = source.read().get(source_field).ok_or_else(|| {
                MapperError::UninitializedField {
                    entity: S::schema().name,
                    field: source_field.into(),
                }
            })?;
            self.reassign(target, target_field, value).await?;
        } else {
            return Err(MapperError::InvalidValue {
                target: "link".into(),
                reason: format!(
                    "both `{}.{source_field}` and `{}.{target_field}` are identity fields",
                    S::schema().name,
                    E::schema().name
                ),
            }
            .into());
        }
        source.write().state_mut().cache(
            link.signature("one", E::schema().table),
            Resolved::new(ResultSet::empty(), [target]),
        );
        Ok(target.clone())
    }

    async fn resolve<S: Entity, E: Entity>(
        &mut self,
        source: &Shared<S>,
        link: &Link,
    ) -> Result<Records<E>> {
        let (source_field, right) = link.first()?;
        let source_field = check_declared::<S>(source_field)?;
        let value = linked_value(source, source_field)?;
        if value.is_null() {
            log::debug!(
                "`{}.{source_field}` is null, no `{}` to resolve",
                S::schema().name,
                E::schema().name
            );
            return self.materialize::<E>(ResultSet::empty());
        }
        let mapping = self.mapping::<E>().await?;
        let table = E::schema().table;
        let mut query = match link.join_table() {
            None => {
                check_declared::<E>(right)?;
                Query::new("SELECT * FROM @table WHERE @column = {value}")
                    .raw("table", table)
                    .name("column", right)
                    .var("value", value)
            }
            Some(through) => {
                let (link_column, target_field) = &link.pairs()[1];
                check_declared::<E>(target_field)?;
                Query::new(
                    "SELECT * FROM @table WHERE @column IN \
                    (SELECT @link FROM @through WHERE @local = {value})",
                )
                .raw("table", table)
                .name("column", target_field)
                .raw("link", link_column)
                .raw("through", through)
                .raw("local", right)
                .var("value", value)
            }
        };
        query.map(mapping.fields_to_columns());
        let result = self.execute(&query).await?.check().with_context(|| {
            format!(
                "While resolving `{}` from `{}`",
                E::schema().name,
                S::schema().name
            )
        })?;
        self.materialize::<E>(result)
    }

    /// Assigns `field` of `owner` and, when the owner identity is stored, persists that single
    /// column.
    async fn reassign<O: Entity>(
        &mut self,
        owner: &Shared<O>,
        field: &'static str,
        value: Value,
    ) -> Result<()> {
        let schema = O::schema();
        let (assignment, conditions, encoded) = {
            let mut owner = owner.write();
            owner.set(field, value)?;
            let encoded = linked_value_of(&*owner, field)?;
            let stored = owner.dump(Some(schema.identity));
            let conditions = schema
                .identity
                .iter()
                .map(|id| {
                    stored
                        .iter()
                        .find(|(f, v)| f == id && !v.is_null())
                        .map(|(f, v)| eq(f, v.clone()))
                })
                .collect::<Option<Vec<_>>>();
            let Some(conditions) = conditions else {
                log::debug!(
                    "`{}` is not stored yet, `{field}` will be written with the entity",
                    schema.name
                );
                return Ok(());
            };
            (assign(field, encoded.clone()), conditions, encoded)
        };
        let mapping = self.mapping::<O>().await?;
        let mut query = UpdateQuery::new(schema.table);
        query
            .set([assignment])
            .r#where(conditions)
            .map(mapping.fields_to_columns());
        self.execute(query.query())
            .await?
            .check()
            .with_context(|| format!("While updating `{field}` of `{}`", schema.name))?;
        owner.write().state_mut().commit_one(field, encoded);
        Ok(())
    }
}

fn linked_value_of<E: Entity>(entity: &E, field: &'static str) -> Result<Value> {
    encode_with(E::schema().codec(field), entity.get(field).unwrap_or_default())
}
