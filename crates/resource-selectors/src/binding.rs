#![forbid(unsafe_code)]

//! Render-loop consumption of resources.
//!
//! A render loop re-runs a view function on every frame or state change and
//! rebuilds its parameter objects each time. Passing those fresh objects
//! straight into [`NotifierSubscription::read_with`] would force a derivation
//! on every pass, since parameters are compared by handle identity. This
//! module closes that gap:
//!
//! - [`ParameterStabilizer`] swaps a freshly built parameter object for the
//!   previous one when the two are shallowly equal.
//! - [`ResourceBinding`] owns a resource, a stabilizer and a change
//!   subscription that calls back into the host (typically "schedule a
//!   re-render").
//! - [`ResourceScope`] resolves each token once per token identity and hands
//!   back the same entity afterwards.

use std::fmt;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use ahash::AHashMap;

use crate::error::Result;
use crate::notifier::{Notifier, Unsubscribe};
use crate::registry::{SelectorRegistry, Token};
use crate::subscription::NotifierSubscription;
use crate::value::{Handle, ShallowEq};

/// Keeps parameter identity stable across shallowly-equal rebuilds.
#[derive(Debug)]
pub struct ParameterStabilizer<P> {
    current: Option<Rc<P>>,
}

impl<P> Default for ParameterStabilizer<P> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<P: ShallowEq> ParameterStabilizer<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stored parameters if `pending` is shallowly equal to them,
    /// otherwise adopt and return `pending`.
    ///
    /// The stored handle is the one last returned, so a run of equal rebuilds
    /// keeps yielding the first handle of the run.
    pub fn stabilize(&mut self, pending: Rc<P>) -> Rc<P> {
        match &self.current {
            Some(current) if current.shallow_eq(&pending) => Rc::clone(current),
            _ => {
                self.current = Some(Rc::clone(&pending));
                pending
            }
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&Rc<P>> {
        self.current.as_ref()
    }
}

/// A resource bound to one consumer.
///
/// Dropping the binding detaches its change subscription.
pub struct ResourceBinding<N: Notifier, P> {
    resource: NotifierSubscription<N, P>,
    parameters: ParameterStabilizer<P>,
    subscription: Unsubscribe,
}

impl<N, P> ResourceBinding<N, P>
where
    N: Notifier + 'static,
    P: ShallowEq + 'static,
{
    /// Subscribe `on_change` to `resource` and start with no parameters.
    pub fn bind(resource: NotifierSubscription<N, P>, on_change: impl Fn() + 'static) -> Result<Self> {
        let subscription = resource.subscribe(on_change)?;
        Ok(Self {
            resource,
            parameters: ParameterStabilizer::new(),
            subscription,
        })
    }

    /// Read with `pending`, substituting the previous parameters when they
    /// are shallowly equal.
    pub fn read(&mut self, pending: Rc<P>) -> Result<Option<Handle>> {
        let parameters = self.parameters.stabilize(pending);
        self.resource.read_with(parameters)
    }

    /// Read with whatever parameters the resource saw last.
    pub fn read_current(&self) -> Result<Option<Handle>> {
        self.resource.read()
    }

    #[must_use]
    pub fn resource(&self) -> &NotifierSubscription<N, P> {
        &self.resource
    }

    /// Detach from the resource now instead of on drop.
    pub fn unbind(&self) {
        self.subscription.unsubscribe();
    }
}

impl<N: Notifier, P> fmt::Debug for ResourceBinding<N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBinding")
            .field("resource", &self.resource)
            .field("subscription", &self.subscription)
            .finish()
    }
}

type Resolver<K, E> = Box<dyn Fn(&Token<K>) -> Option<E>>;

/// One entity per token identity.
///
/// Entries are keyed by the token's `Rc` address and validated against a weak
/// reference, so a dropped token never aliases a new one that reuses its
/// address. Entries for dropped tokens are evicted on the next resolution.
/// Failed resolutions are not cached.
pub struct ResourceScope<K, E> {
    resolve: Resolver<K, E>,
    entries: AHashMap<*const Token<K>, (Weak<Token<K>>, E)>,
}

impl<K: 'static, E: Clone + 'static> ResourceScope<K, E> {
    pub fn new(resolve: impl Fn(&Token<K>) -> Option<E> + 'static) -> Self {
        Self {
            resolve: Box::new(resolve),
            entries: AHashMap::default(),
        }
    }

    /// Resolve through `registry`.
    pub fn from_registry(registry: SelectorRegistry<K, E>) -> Self
    where
        K: Eq + Hash + Clone + fmt::Debug,
    {
        Self::new(move |token| registry.get_entity(token))
    }

    /// The entity for `token`, resolving it on first use.
    pub fn get(&mut self, token: &Rc<Token<K>>) -> Option<E> {
        let key = Rc::as_ptr(token);
        if let Some((weak, entity)) = self.entries.get(&key) {
            if weak.upgrade().is_some_and(|live| Rc::ptr_eq(&live, token)) {
                return Some(entity.clone());
            }
        }
        let entity = (self.resolve)(token)?;
        self.prune();
        self.entries
            .insert(key, (Rc::downgrade(token), entity.clone()));
        Some(entity)
    }

    /// Forget entries whose tokens have been dropped. Also runs before every
    /// new entry is stored, so the map never outgrows the live tokens it has
    /// seen since the last resolution.
    pub fn prune(&mut self) {
        self.entries.retain(|_, (weak, _)| weak.strong_count() > 0);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
