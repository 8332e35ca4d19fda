//! [`Params`]: a type-keyed bag of values, the engine's sole means of
//! passing data between rules.

use std::any::Any;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::signature::TypeKey;

/// A value a rule can accept or return. Any `'static + Send + Sync + Hash`
/// type qualifies automatically — `Hash` is required so the engine's
/// caches can key on a `Params` set's content, not just its shape.
pub trait RuleValue: Any + Send + Sync {
    fn dyn_hash(&self, state: &mut dyn Hasher);
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync + Hash> RuleValue for T {
    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A type-indexed, insertion-ordered set of values: at most one value per
/// concrete type. Used both as the free-standing "subjects" of an engine
/// and as the accumulated inputs/outputs threaded through a resolution.
#[derive(Clone, Default)]
pub struct Params {
    entries: IndexMap<TypeKey, Arc<dyn RuleValue>>,
}

impl Params {
    pub fn new() -> Self {
        Params::default()
    }

    pub fn with<T: RuleValue>(mut self, value: T) -> Self {
        self.entries.insert(TypeKey::of::<T>(), Arc::new(value));
        self
    }

    pub(crate) fn insert_dyn(&mut self, key: TypeKey, value: Arc<dyn RuleValue>) {
        self.entries.insert(key, value);
    }

    pub(crate) fn get_dyn(&self, key: TypeKey) -> Option<Arc<dyn RuleValue>> {
        self.entries.get(&key).cloned()
    }

    pub fn contains(&self, key: TypeKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get<T: RuleValue + Clone>(&self) -> Option<T> {
        self.entries
            .get(&TypeKey::of::<T>())
            .and_then(|v| v.as_any().downcast_ref::<T>())
            .cloned()
    }

    pub fn types(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges two parameter sets; `other`'s values win on overlapping types.
    pub fn merge(&self, other: &Params) -> Params {
        let mut merged = self.clone();
        for (key, value) in &other.entries {
            merged.entries.insert(*key, Arc::clone(value));
        }
        merged
    }

    /// Keeps only the entries whose type is in `types`. Types absent from
    /// `self` are silently skipped (a non-total filter).
    pub fn filter(&self, types: &BTreeSet<TypeKey>) -> Params {
        let mut filtered = Params::new();
        for key in types {
            if let Some(value) = self.entries.get(key) {
                filtered.entries.insert(*key, Arc::clone(value));
            }
        }
        filtered
    }

    /// A deterministic hash of this parameter set's *content* — used as
    /// (part of) a rule cache key. Two `Params` with the same types and
    /// equal-hashing values hash equally regardless of insertion order.
    pub fn content_hash(&self) -> u64 {
        let mut hashes: Vec<u64> = self
            .entries
            .values()
            .map(|value| {
                let mut hasher = ahash::AHasher::default();
                value.dyn_hash(&mut hasher);
                hasher.finish()
            })
            .collect();
        hashes.sort_unstable();
        let mut combined = ahash::AHasher::default();
        hashes.hash(&mut combined);
        combined.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_round_trips() {
        let params = Params::new().with(42i32).with("hello".to_string());
        assert_eq!(params.get::<i32>(), Some(42));
        assert_eq!(params.get::<String>(), Some("hello".to_string()));
        assert_eq!(params.get::<u8>(), None);
    }

    #[test]
    fn merge_prefers_right_hand_side() {
        let a = Params::new().with(1i32);
        let b = Params::new().with(2i32);
        let merged = a.merge(&b);
        assert_eq!(merged.get::<i32>(), Some(2));
    }

    #[test]
    fn content_hash_ignores_insertion_order() {
        let a = Params::new().with(1i32).with("x".to_string());
        let b = Params::new().with("x".to_string()).with(1i32);
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn content_hash_distinguishes_values() {
        let a = Params::new().with(1i32);
        let b = Params::new().with(2i32);
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
