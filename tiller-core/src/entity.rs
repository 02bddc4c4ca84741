use crate::{
    Context, EntitySchema, EntityState, FieldValues, Record, Result, Value, WireValue,
    decode_with, encode_with,
};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Entity instance shared between the caller, the identity map and association caches.
pub type Shared<E> = Arc<RwLock<E>>;

pub fn shared<E: Entity>(entity: E) -> Shared<E> {
    Arc::new(RwLock::new(entity))
}

/// Typed record mapped to a table.
///
/// Implemented through [`crate::entity!`], the provided methods carry the change tracking logic.
pub trait Entity: Record + Send + Sync + Sized + 'static {
    fn schema() -> &'static EntitySchema;

    /// Instance with every field unset and an empty snapshot.
    fn blank() -> Self;

    fn state(&self) -> &EntityState;

    fn state_mut(&mut self) -> &mut EntityState;

    /// Read only derived property, `None` when `name` is not a computed property.
    fn computed(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Assigns the declared fields present in `row` from their wire values.
    ///
    /// Each value goes through the field codec before being assigned. When `from_storage` is set,
    /// the encoded form of every assigned field is recorded as the snapshot, so the entity starts
    /// clean. Names that are not declared fields are skipped.
    fn initialize<'r>(
        &mut self,
        row: impl IntoIterator<Item = (&'r str, &'r WireValue)>,
        from_storage: bool,
    ) -> Result<()> {
        let schema = Self::schema();
        for (field, wire) in row {
            let Some(def) = schema.field(field) else {
                continue;
            };
            let value = decode_with(def.codec.as_ref(), wire.decode(field)?).with_context(|| {
                format!("While decoding field `{}` of `{}`", def.name, schema.name)
            })?;
            self.set(def.name, value)?;
            if from_storage {
                let stored = self.get(def.name).unwrap_or_default();
                let encoded = encode_with(def.codec.as_ref(), stored)?;
                self.state_mut().commit_one(def.name, encoded);
            }
        }
        Ok(())
    }

    /// Initialized fields whose encoded value differs from the snapshot, in declaration order.
    fn diff(&self) -> Result<FieldValues> {
        let state = self.state();
        let mut changes = Vec::new();
        for def in Self::schema().fields {
            let Some(current) = self.get(def.name) else {
                continue;
            };
            let encoded = encode_with(def.codec.as_ref(), current)?;
            if state.snapshot(def.name) != Some(&encoded) {
                changes.push((def.name, encoded));
            }
        }
        Ok(changes)
    }

    /// Same as [`Entity::diff`], then records the changes into the snapshot.
    fn reset(&mut self) -> Result<FieldValues> {
        let changes = self.diff()?;
        self.state_mut().commit(&changes);
        Ok(changes)
    }

    /// Snapshot values, restricted to `fields` when given.
    fn dump(&self, fields: Option<&[&str]>) -> FieldValues {
        let state = self.state();
        Self::schema()
            .fields
            .iter()
            .filter(|def| fields.map_or(true, |v| v.contains(&def.name)))
            .filter_map(|def| state.snapshot(def.name).map(|v| (def.name, v.clone())))
            .collect()
    }

    /// Stable hash of the snapshot identity values, `None` unless every identity field has a
    /// stored non null value.
    fn identity_hash(&self) -> Option<String> {
        let schema = Self::schema();
        if schema.identity.is_empty() {
            return None;
        }
        let state = self.state();
        let mut hasher = Sha256::new();
        hasher.update(schema.table.as_bytes());
        for field in schema.identity {
            let value = state.snapshot(field).filter(|v| !v.is_null())?;
            hasher.update(b"\x1e");
            hasher.update(field.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(format!("{value:?}").as_bytes());
        }
        Some(hex::encode(hasher.finalize()))
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __codec {
    () => {
        None
    };
    ($codec:expr) => {
        Some($codec)
    };
}

/// Declares an entity type mapped to a table.
///
/// Every field is stored as a [`crate::Passive`], the field type must implement
/// [`crate::AsValue`] and `Clone`. A field may name a [`crate::Codec`] after `=`.
///
/// ```rust
/// use tiller_core::{Entity, Record, codec, entity};
/// use time::Date;
///
/// entity! {
///     #[derive(Debug)]
///     pub struct User {
///         pub id: i64,
///         pub first_name: String,
///         pub last_name: String,
///         pub died: Option<Date> = codec::DATE,
///     }
///     table = "users",
///     identity = [id],
///     order = [last_name => Asc],
///     computed = [full_name => User::full_name],
/// }
///
/// impl User {
///     fn full_name(&self) -> String {
///         format!(
///             "{} {}",
///             self.first_name.get().map_or("", |v| v.as_str()),
///             self.last_name.get().map_or("", |v| v.as_str()),
///         )
///     }
/// }
///
/// let mut user = User::blank();
/// user.set("first_name", "John".into()).unwrap();
/// assert_eq!(User::schema().table, "users");
/// assert_eq!(user.computed("full_name"), Some("John ".into()));
/// ```
#[macro_export]
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $field_type:ty $(= $codec:expr)?
            ),* $(,)?
        }
        table = $table:literal,
        identity = [$($identity:ident),* $(,)?]
        $(, order = [$($order_field:ident => $order_dir:ident),* $(,)?])?
        $(, computed = [$($computed:ident => $computed_fn:expr),* $(,)?])?
        $(,)?
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $crate::Passive<$field_type>,
            )*
            #[doc(hidden)]
            pub __state: $crate::EntityState,
        }

        impl $crate::Record for $name {
            fn field_names(&self) -> Vec<&str> {
                vec![$(stringify!($field)),*]
            }

            fn get(&self, field: &str) -> Option<$crate::Value> {
                match field {
                    $(stringify!($field) => self.$field.value(),)*
                    _ => None,
                }
            }

            fn set(&mut self, field: &str, value: $crate::Value) -> $crate::Result<()> {
                match field {
                    $(
                        stringify!($field) => {
                            let value = $crate::Context::with_context(
                                <$field_type as $crate::AsValue>::try_from_value(value),
                                || format!(
                                    "While assigning field `{}` of `{}`",
                                    stringify!($field),
                                    stringify!($name),
                                ),
                            )?;
                            self.$field = $crate::Passive::Set(value);
                            Ok(())
                        }
                    )*
                    _ => Err($crate::MapperError::UnknownField {
                        entity: stringify!($name).into(),
                        field: field.into(),
                    }
                    .into()),
                }
            }
        }

        impl $crate::Entity for $name {
            fn schema() -> &'static $crate::EntitySchema {
                static SCHEMA: $crate::EntitySchema = $crate::EntitySchema {
                    name: stringify!($name),
                    table: $table,
                    fields: &[
                        $($crate::FieldDef {
                            name: stringify!($field),
                            codec: $crate::__codec!($($codec)?),
                        }),*
                    ],
                    identity: &[$(stringify!($identity)),*],
                    order: &[$($((stringify!($order_field), $crate::Order::$order_dir)),*)?],
                    computed: &[$($(stringify!($computed)),*)?],
                };
                &SCHEMA
            }

            fn blank() -> Self {
                Self {
                    $($field: $crate::Passive::NotSet,)*
                    __state: ::std::default::Default::default(),
                }
            }

            fn state(&self) -> &$crate::EntityState {
                &self.__state
            }

            fn state_mut(&mut self) -> &mut $crate::EntityState {
                &mut self.__state
            }

            fn computed(&self, name: &str) -> Option<$crate::Value> {
                match name {
                    $($(
                        stringify!($computed) => {
                            Some($crate::AsValue::as_value(($computed_fn)(self)))
                        }
                    )*)?
                    _ => None,
                }
            }
        }
    };
}
