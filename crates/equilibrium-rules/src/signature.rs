//! Type-level keys used throughout the engine instead of runtime
//! reflection: a [`TypeKey`] names a Rust type once and is then used
//! purely as an opaque, hashable, orderable token.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// A type, identified for the engine's purposes. Two `TypeKey`s compare
/// equal iff they denote the same concrete Rust type.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: Any + ?Sized>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The type's fully qualified name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Ordered by name rather than `TypeId` so error messages and iteration
/// order are stable and human-readable.
impl PartialOrd for TypeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for TypeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(other.name).then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.rsplit("::").next().unwrap_or(self.name))
    }
}

/// The shape of a request to the engine: the types already on hand, and
/// the type ultimately wanted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub inputs: BTreeSet<TypeKey>,
    pub output_type: TypeKey,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<String> = self.inputs.iter().map(|t| t.to_string()).collect();
        write!(f, "{{{}}} -> {}", inputs.join(", "), self.output_type)
    }
}
