#![forbid(unsafe_code)]

//! Tokens and the lazy selector registry.
//!
//! A [`Token`] pairs a lookup key (`kind`) with the template its resources
//! default against. The [`SelectorRegistry`] maps kinds to factories and runs
//! the factory on every lookup; keeping one entity per token is the caller's
//! job (see [`ResourceScope`](crate::binding::ResourceScope)).
//!
//! Registries are plain values. Build one per application or test scope.

use std::fmt;
use std::hash::Hash;

use ahash::AHashMap;

use crate::value::Handle;

/// Lookup key plus defaulting template for a resource.
///
/// Registry lookup goes by `kind` value, so two distinct tokens with equal
/// kinds resolve to the same factory. Callers that need identity semantics
/// keep tokens in an `Rc` and compare with `Rc::ptr_eq`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<K> {
    kind: K,
    model: Option<Handle>,
}

impl<K> Token<K> {
    pub fn new(kind: K, model: Option<Handle>) -> Self {
        Self { kind, model }
    }

    /// A token with no template; derived values pass through unchanged.
    pub fn without_model(kind: K) -> Self {
        Self { kind, model: None }
    }

    #[must_use]
    pub fn kind(&self) -> &K {
        &self.kind
    }

    #[must_use]
    pub fn model(&self) -> Option<&Handle> {
        self.model.as_ref()
    }
}

type Factory<E> = Box<dyn Fn() -> E>;

/// Map from token kinds to zero-argument entity factories.
pub struct SelectorRegistry<K, E> {
    factories: AHashMap<K, Factory<E>>,
}

impl<K, E> Default for SelectorRegistry<K, E> {
    fn default() -> Self {
        Self {
            factories: AHashMap::default(),
        }
    }
}

impl<K: fmt::Debug, E> fmt::Debug for SelectorRegistry<K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K, E> SelectorRegistry<K, E>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `token.kind` with `factory`. A later registration for the
    /// same kind replaces the earlier one.
    pub fn register(&mut self, token: &Token<K>, factory: impl Fn() -> E + 'static) {
        let replaced = self
            .factories
            .insert(token.kind.clone(), Box::new(factory))
            .is_some();
        if replaced {
            tracing::debug!(kind = ?token.kind, "selector factory replaced");
        }
    }

    /// Build a fresh entity for `token.kind`, or `None` if nothing is
    /// registered for it.
    #[must_use]
    pub fn get_entity(&self, token: &Token<K>) -> Option<E> {
        match self.factories.get(&token.kind) {
            Some(factory) => Some(factory()),
            None => {
                tracing::debug!(kind = ?token.kind, "no selector registered");
                None
            }
        }
    }

    /// Remove the factory for `token.kind`. Returns whether one existed.
    pub fn unregister(&mut self, token: &Token<K>) -> bool {
        self.factories.remove(&token.kind).is_some()
    }

    #[must_use]
    pub fn contains(&self, token: &Token<K>) -> bool {
        self.factories.contains_key(&token.kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
