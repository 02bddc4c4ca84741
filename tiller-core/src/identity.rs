use crate::{Entity, Shared};
use parking_lot::RwLock;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, Weak},
};

type Slot = Weak<dyn Any + Send + Sync>;

/// Dead slots are swept once the map holds this many entries (or twice the live count after the
/// previous sweep, whichever is larger).
const PRUNE_THRESHOLD: usize = 64;

/// Registry guaranteeing at most one live instance per `(entity type, identity)`.
///
/// Instances are held weakly: once every caller dropped an entity, its slot is overwritten by the
/// next registration for the same identity or swept when the map grows past its threshold.
#[derive(Default)]
pub struct IdentityMap {
    entries: HashMap<(TypeId, String), Slot>,
    prune_at: usize,
}

impl IdentityMap {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the instance already registered for the identity of `entity` when there is one,
    /// otherwise registers `entity` and returns it. Entities without a resolvable identity are
    /// returned as they are.
    pub fn register<E: Entity>(&mut self, entity: Shared<E>) -> Shared<E> {
        let hash = entity.read().identity_hash();
        let Some(hash) = hash else {
            return entity;
        };
        let key = (TypeId::of::<E>(), hash);
        if let Some(existing) = self.lookup::<E>(&key) {
            if !Arc::ptr_eq(&existing, &entity) {
                log::trace!(
                    "Identity of `{}` already registered, reusing the live instance",
                    E::schema().name
                );
            }
            return existing;
        }
        self.insert(key, downgrade(&entity));
        entity
    }

    /// Instance registered for `hash`, if still alive.
    pub fn get<E: Entity>(&self, hash: &str) -> Option<Shared<E>> {
        self.lookup::<E>(&(TypeId::of::<E>(), hash.to_string()))
    }

    /// Moves `entity` from `old_hash` to its current identity hash. Nothing happens when the hash
    /// did not change.
    pub fn rehash<E: Entity>(&mut self, entity: &Shared<E>, old_hash: Option<String>) {
        let hash = entity.read().identity_hash();
        if hash == old_hash {
            return;
        }
        let type_id = TypeId::of::<E>();
        if let Some(old) = old_hash {
            let key = (type_id, old);
            if self.lookup::<E>(&key).is_some_and(|v| Arc::ptr_eq(&v, entity)) {
                self.entries.remove(&key);
            }
        }
        if let Some(hash) = hash {
            log::trace!("Identity of `{}` changed, rehashing", E::schema().name);
            self.insert((type_id, hash), downgrade(entity));
        }
    }

    /// Drops the registration of `entity`, typically after it was deleted.
    pub fn forget<E: Entity>(&mut self, entity: &Shared<E>) {
        let hash = entity.read().identity_hash();
        if let Some(hash) = hash {
            let key = (TypeId::of::<E>(), hash);
            if self.lookup::<E>(&key).is_some_and(|v| Arc::ptr_eq(&v, entity)) {
                self.entries.remove(&key);
            }
        }
    }

    /// Removes the slots whose instance was dropped.
    pub fn prune(&mut self) {
        self.entries.retain(|_, v| v.strong_count() > 0);
    }

    /// Number of slots, including the ones whose instance was dropped and not swept yet.
    pub fn slots(&self) -> usize {
        self.entries.len()
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|v| v.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn insert(&mut self, key: (TypeId, String), slot: Slot) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.prune_at {
            self.prune();
            self.prune_at = (self.entries.len() * 2).max(PRUNE_THRESHOLD);
            log::trace!(
                "Swept the identity map, {} live slots, next sweep at {}",
                self.entries.len(),
                self.prune_at
            );
        }
        self.entries.insert(key, slot);
    }

    fn lookup<E: Entity>(&self, key: &(TypeId, String)) -> Option<Shared<E>> {
        self.entries
            .get(key)?
            .upgrade()?
            .downcast::<RwLock<E>>()
            .ok()
    }
}

fn downgrade<E: Entity>(entity: &Shared<E>) -> Slot {
    let erased: Arc<dyn Any + Send + Sync> = entity.clone();
    Arc::downgrade(&erased)
}
