use crate::{
    Context, Entity, IdentityMap, Mapping, Query, Records, Repository, Result, ResultSet,
    Transport, map_fields, truncate_long,
};
use std::{any::TypeId, collections::HashMap, sync::Arc};

/// Unit of work over one endpoint.
///
/// Owns the transport, the identity map and the per type column mappings. Everything goes through
/// `&mut self`, a database is meant to be used by one task at a time.
pub struct Database<T: Transport> {
    transport: T,
    identities: IdentityMap,
    mappings: HashMap<TypeId, Arc<Mapping>>,
}

impl<T: Transport> Database<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            identities: IdentityMap::new(),
            mappings: HashMap::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn identities(&self) -> &IdentityMap {
        &self.identities
    }

    pub fn identities_mut(&mut self) -> &mut IdentityMap {
        &mut self.identities
    }

    /// Renders and sends the query.
    ///
    /// A statement rejected by the endpoint still yields `Ok`, its error is carried by the result
    /// (see [`ResultSet::check`]). Rendering and transport failures are returned as `Err`.
    pub async fn execute(&mut self, query: &Query) -> Result<ResultSet> {
        let sql = query.render()?;
        self.execute_sql(sql).await
    }

    /// Sends a SQL statement verbatim.
    pub async fn execute_sql(&mut self, sql: impl Into<String>) -> Result<ResultSet> {
        let sql = sql.into();
        log::debug!("{}", truncate_long!(sql));
        let envelope = self.transport.execute(sql.clone()).await?;
        let result = ResultSet::new(sql, envelope);
        if let Some(error) = result.error() {
            log::error!(
                "Statement failed with code {}: {}\n  {}",
                error.code,
                error.message,
                truncate_long!(result.sql())
            );
        }
        Ok(result)
    }

    /// Column mapping of `E`, introspected from the live table on first use.
    pub async fn mapping<E: Entity>(&mut self) -> Result<Arc<Mapping>> {
        let type_id = TypeId::of::<E>();
        if let Some(mapping) = self.mappings.get(&type_id) {
            return Ok(mapping.clone());
        }
        let schema = E::schema();
        let query = Query::new("SELECT * FROM @table LIMIT 0").raw("table", schema.table);
        let result = self.execute(&query).await?.check().with_context(|| {
            format!(
                "While introspecting table `{}` of `{}`",
                schema.table, schema.name
            )
        })?;
        let mapping = Arc::new(map_fields(schema, result.columns())?);
        log::trace!(
            "Mapped {} columns of `{}` to `{}`",
            mapping.len(),
            schema.table,
            schema.name
        );
        self.mappings.insert(type_id, mapping.clone());
        Ok(mapping)
    }

    /// Drops the cached mapping of `E`, the next use introspects the table again.
    pub fn forget_mapping<E: Entity>(&mut self) {
        self.mappings.remove(&TypeId::of::<E>());
    }

    /// Materializes the rows of `result` as `E`, see [`ResultSet::of`].
    pub fn materialize<E: Entity>(&mut self, result: ResultSet) -> Result<Records<E>> {
        result.of::<E>(&mut self.identities)
    }

    /// Repository of `E` bound to this database.
    pub async fn repository<E: Entity>(&mut self) -> Result<Repository<'_, T, E>> {
        let mapping = self.mapping::<E>().await?;
        Ok(Repository::new(self, mapping))
    }
}
