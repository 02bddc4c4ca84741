//! Condition and sort fragments.
//!
//! Every builder returns a plain [`Query`], the column argument is registered as a name so that
//! [`Query::map`] can translate it into the storage column.

use crate::{MapperError, Query, Raw, Value};
use std::{fmt, str::FromStr};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

impl FromStr for Order {
    type Err = MapperError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Order::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Order::Desc)
        } else {
            Err(MapperError::InvalidValue {
                target: "order".into(),
                reason: format!("`{s}` is neither asc nor desc"),
            })
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// `@name @operator {value}`
pub fn cmp(name: &str, operator: &'static str, value: impl Into<Value>) -> Query {
    Query::new("@name @operator {value}")
        .name("name", name)
        .raw("operator", operator)
        .var("value", value)
}

/// Equality, `NULL` turns into `IS NULL`.
pub fn eq(name: &str, value: impl Into<Value>) -> Query {
    let value = value.into();
    if value.is_null() {
        Query::new("@name IS NULL").name("name", name)
    } else {
        cmp(name, "=", value)
    }
}

/// Inequality that also matches `NULL` columns, `NULL` turns into `IS NOT NULL`.
pub fn neq(name: &str, value: impl Into<Value>) -> Query {
    let value = value.into();
    if value.is_null() {
        Query::new("@name IS NOT NULL").name("name", name)
    } else {
        Query::new("(@name <> {value} OR @name IS NULL)")
            .name("name", name)
            .var("value", value)
    }
}

pub fn gt(name: &str, value: impl Into<Value>) -> Query {
    cmp(name, ">", value)
}

pub fn gte(name: &str, value: impl Into<Value>) -> Query {
    cmp(name, ">=", value)
}

pub fn lt(name: &str, value: impl Into<Value>) -> Query {
    cmp(name, "<", value)
}

pub fn lte(name: &str, value: impl Into<Value>) -> Query {
    cmp(name, "<=", value)
}

pub fn like(name: &str, value: impl Into<Value>) -> Query {
    cmp(name, "LIKE", value)
}

pub fn not_like(name: &str, value: impl Into<Value>) -> Query {
    cmp(name, "NOT LIKE", value)
}

pub fn is_in<V: Into<Value>>(name: &str, values: impl IntoIterator<Item = V>) -> Query {
    cmp(
        name,
        "IN",
        Value::List(values.into_iter().map(Into::into).collect()),
    )
}

pub fn not_in<V: Into<Value>>(name: &str, values: impl IntoIterator<Item = V>) -> Query {
    cmp(
        name,
        "NOT IN",
        Value::List(values.into_iter().map(Into::into).collect()),
    )
}

/// Conditions joined by `AND`, parenthesized.
pub fn all(conditions: impl IntoIterator<Item = Query>) -> Query {
    group(" AND ", "TRUE", conditions)
}

/// Conditions joined by `OR`, parenthesized.
pub fn any(conditions: impl IntoIterator<Item = Query>) -> Query {
    group(" OR ", "FALSE", conditions)
}

fn group(
    separator: &'static str,
    neutral: &'static str,
    conditions: impl IntoIterator<Item = Query>,
) -> Query {
    let conditions = conditions.into_iter().map(Raw::from).collect::<Vec<_>>();
    if conditions.is_empty() {
        return Query::new(neutral);
    }
    Query::new("@conditions")
        .bind(separator, true)
        .raw("conditions", Raw::List(conditions))
}

/// `@name ASC|DESC`
pub fn sort(name: &str, order: Order) -> Query {
    Query::new("@name @direction")
        .name("name", name)
        .raw("direction", order.as_sql())
}

/// `@column = {value}`, used by `SET` clauses.
pub fn assign(name: &str, value: impl Into<Value>) -> Query {
    Query::new("@column = {value}")
        .name("column", name)
        .var("value", value)
}
