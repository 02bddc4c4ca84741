use crate::{AsValue, Value};
use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    fmt::{self, Debug},
    sync::Arc,
};

/// Field slot of an entity, distinguishing a field that was never assigned from one holding a
/// value (possibly `None` for nullable fields).
#[derive(Debug, Default)]
pub enum Passive<T: AsValue> {
    Set(T),
    #[default]
    NotSet,
}

impl<T: AsValue> Passive<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Set(v) => Some(v),
            Self::NotSet => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Set(v) => Some(v),
            Self::NotSet => None,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(..))
    }

    pub fn set(&mut self, value: T) {
        *self = Self::Set(value);
    }

    pub fn take(&mut self) -> Option<T> {
        match std::mem::replace(self, Self::NotSet) {
            Self::Set(v) => Some(v),
            Self::NotSet => None,
        }
    }

    /// Current value as a [`Value`], `None` when the field was never assigned.
    pub fn value(&self) -> Option<Value>
    where
        T: Clone,
    {
        self.get().cloned().map(AsValue::as_value)
    }
}

impl<T: AsValue + PartialEq> PartialEq for Passive<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Set(lhs), Self::Set(rhs)) => lhs == rhs,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl<T: AsValue + Clone> Clone for Passive<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Set(v) => Self::Set(v.clone()),
            Self::NotSet => Self::NotSet,
        }
    }
}

impl<T: AsValue> From<T> for Passive<T> {
    fn from(value: T) -> Self {
        Self::Set(value)
    }
}

pub type FieldValues = Vec<(&'static str, Value)>;

/// Bookkeeping carried by every entity instance.
///
/// The snapshot holds the encoded value of each field as last synchronized with storage, a field
/// is absent from the snapshot when it was never loaded nor persisted. The association cache holds
/// resolved related entities, keyed by the signature of the link that produced them.
#[derive(Default, Clone)]
pub struct EntityState {
    snapshot: BTreeMap<&'static str, Value>,
    associations: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl EntityState {
    pub fn snapshot(&self, field: &str) -> Option<&Value> {
        self.snapshot.get(field)
    }

    pub fn is_loaded(&self) -> bool {
        !self.snapshot.is_empty()
    }

    /// Records `values` as the state known to storage.
    pub fn commit<'a>(&mut self, values: impl IntoIterator<Item = &'a (&'static str, Value)>) {
        for (field, value) in values {
            self.snapshot.insert(*field, value.clone());
        }
    }

    pub fn commit_one(&mut self, field: &'static str, value: Value) {
        self.snapshot.insert(field, value);
    }

    pub fn cached<T: 'static>(&self, key: &str) -> Option<&T> {
        self.associations.get(key)?.downcast_ref::<T>()
    }

    pub fn cache<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.associations.insert(key.into(), Arc::new(value));
    }

    /// Drops every resolved association, the next resolution queries again.
    pub fn clear_cache(&mut self) {
        self.associations.clear();
    }
}

impl Debug for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityState")
            .field("snapshot", &self.snapshot)
            .field("associations", &self.associations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PartialEq for EntityState {
    /// Only the snapshots are compared.
    fn eq(&self, other: &Self) -> bool {
        self.snapshot == other.snapshot
    }
}
