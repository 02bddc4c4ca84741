use crate::{Query, Raw, Result, Value};
use std::collections::HashMap;

fn where_clause(conditions: Vec<Query>) -> Option<Query> {
    if conditions.is_empty() {
        return None;
    }
    Some(
        Query::new("WHERE @conditions")
            .bind(" AND ", false)
            .raw("conditions", conditions),
    )
}

macro_rules! impl_statement {
    ($statement:ident) => {
        impl $statement {
            pub fn query(&self) -> &Query {
                &self.query
            }

            pub fn into_query(self) -> Query {
                self.query
            }

            /// Translates field names into column names.
            pub fn map(&mut self, mapping: &HashMap<String, String>) -> &mut Self {
                self.query.map(mapping);
                self
            }

            pub fn render(&self) -> Result<String> {
                self.query.render()
            }
        }

        impl From<$statement> for Query {
            fn from(value: $statement) -> Self {
                value.query
            }
        }
    };
}

macro_rules! impl_where {
    ($statement:ident) => {
        impl $statement {
            /// Replaces the `WHERE` clause with the given conditions joined by `AND`. No condition
            /// removes the clause.
            pub fn r#where(&mut self, conditions: impl IntoIterator<Item = Query>) -> &mut Self {
                match where_clause(conditions.into_iter().collect()) {
                    Some(clause) => self.query.set_raw("where", clause),
                    None => self.query.unset_raw("where"),
                };
                self
            }
        }
    };
}

/// `SELECT @cols FROM @table @where @order @limit @offset`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    query: Query,
}

impl SelectQuery {
    pub fn new(table: &str) -> Self {
        Self {
            query: Query::new("SELECT @cols FROM @table @where @order @limit @offset")
                .raw("table", table)
                .raw("cols", "*"),
        }
    }

    /// Sets the projection verbatim, like `*` or `COUNT(*) AS total`.
    pub fn fetch(&mut self, columns: &str) -> &mut Self {
        self.query.set_raw("cols", columns);
        self
    }

    /// Sets the projection to a list of field names.
    pub fn cols<S: AsRef<str>>(&mut self, names: impl IntoIterator<Item = S>) -> &mut Self {
        let names = names
            .into_iter()
            .map(|v| Raw::from(v.as_ref()))
            .collect::<Vec<_>>();
        self.query.set_raw(
            "cols",
            Query::new("@names")
                .bind(", ", false)
                .name("names", Raw::List(names)),
        );
        self
    }

    /// Replaces the `ORDER BY` clause, no sort removes it.
    pub fn order(&mut self, sorts: impl IntoIterator<Item = Query>) -> &mut Self {
        let sorts = sorts.into_iter().collect::<Vec<_>>();
        if sorts.is_empty() {
            self.query.unset_raw("order");
        } else {
            self.query.set_raw(
                "order",
                Query::new("ORDER BY @sorts")
                    .bind(", ", false)
                    .raw("sorts", sorts),
            );
        }
        self
    }

    pub fn limit(&mut self, limit: Option<u64>) -> &mut Self {
        match limit {
            Some(v) => self.query.set_raw(
                "limit",
                Query::new("LIMIT @limit").raw("limit", itoa::Buffer::new().format(v)),
            ),
            None => self.query.unset_raw("limit"),
        };
        self
    }

    pub fn offset(&mut self, offset: Option<u64>) -> &mut Self {
        match offset {
            Some(v) => self.query.set_raw(
                "offset",
                Query::new("OFFSET @offset").raw("offset", itoa::Buffer::new().format(v)),
            ),
            None => self.query.unset_raw("offset"),
        };
        self
    }
}
impl_statement!(SelectQuery);
impl_where!(SelectQuery);

/// `INSERT INTO @table @names VALUES @values`
#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    query: Query,
}

impl InsertQuery {
    pub fn new(table: &str) -> Self {
        Self {
            query: Query::new("INSERT INTO @table DEFAULT VALUES").raw("table", table),
        }
    }

    /// Field names and values of the row, in column order.
    pub fn values<N: AsRef<str>>(
        &mut self,
        values: impl IntoIterator<Item = (N, Value)>,
    ) -> &mut Self {
        let (names, values): (Vec<_>, Vec<_>) = values
            .into_iter()
            .map(|(name, value)| {
                (
                    Raw::from(name.as_ref()),
                    Raw::from(Query::new("{value}").var("value", value)),
                )
            })
            .unzip();
        let table = self.query.get_raw("table").cloned();
        self.query = if names.is_empty() {
            Query::new("INSERT INTO @table DEFAULT VALUES")
        } else {
            Query::new("INSERT INTO @table @names VALUES @values")
                .name("names", names)
                .raw("values", values)
        };
        if let Some(table) = table {
            self.query.set_raw("table", table);
        }
        self
    }
}
impl_statement!(InsertQuery);

/// `UPDATE @table SET @assignments @where`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    query: Query,
}

impl UpdateQuery {
    pub fn new(table: &str) -> Self {
        Self {
            query: Query::new("UPDATE @table SET @assignments @where").raw("table", table),
        }
    }

    /// Sets the `SET` clause from assignment fragments, see [`crate::expr::assign`].
    pub fn set(&mut self, assignments: impl IntoIterator<Item = Query>) -> &mut Self {
        let assignments = assignments.into_iter().collect::<Vec<_>>();
        self.query.set_raw(
            "assignments",
            Query::new("@assignments")
                .bind(", ", false)
                .raw("assignments", assignments),
        );
        self
    }
}
impl_statement!(UpdateQuery);
impl_where!(UpdateQuery);

/// `DELETE FROM @table @where`
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    query: Query,
}

impl DeleteQuery {
    pub fn new(table: &str) -> Self {
        Self {
            query: Query::new("DELETE FROM @table @where").raw("table", table),
        }
    }
}
impl_statement!(DeleteQuery);
impl_where!(DeleteQuery);
