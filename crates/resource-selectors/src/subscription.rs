#![forbid(unsafe_code)]

//! Age-gated, change-filtered resources over an external [`Notifier`].
//!
//! # Design
//!
//! [`NotifierSubscription`] binds a notifier, a token's model and a derivation
//! function. Each read compares the notifier age and the parameter handle
//! against the previous read:
//!
//! - same age, same parameters: return the cached handle, O(1);
//! - otherwise: re-run the [`ModelSelector`], which itself skips defaulting
//!   when the raw derived handle did not change.
//!
//! Age alone is not enough: parameters can change without the source being
//! mutated, so a new parameter handle always forces a fresh derivation.
//!
//! Subscribers are woken only when a notification changes the derived handle.
//! A notifier that fires for unrelated mutations costs one derivation and no
//! subscriber work.
//!
//! # Invariants
//!
//! 1. For an unchanged (age, parameters) pair, `read` returns a handle
//!    pointer-equal to the previous one.
//! 2. The derivation function runs at most once per (age, parameters) pair.
//! 3. `notify` is called only when the derived handle changed identity.
//! 4. No internal borrow is held while the derivation function, the notifier
//!    or `notify` runs, except the selector's own borrow around derivation.
//!
//! # Failure Modes
//!
//! - **`age()` fails**: `read` returns the error and the cached state is left
//!   untouched, so a retry with the same parameters still derives afresh.
//! - **`subscribe()` fails**: returned unchanged to the caller.
//! - **`age()` fails inside a notification**: logged at `WARN` and the
//!   notification is dropped, since a listener has nowhere to return it.
//! - **All resource handles dropped**: listeners already registered become
//!   inert; they hold only a weak reference.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::ResourceConfig;
use crate::error::Result;
use crate::notifier::{Listener, Notifier, Unsubscribe};
use crate::registry::Token;
use crate::selector::ModelSelector;
use crate::value::{Handle, same_handle};

/// Cached read state. Mutated only by `refresh`.
struct ReadState<A, P> {
    last_parameters: Option<Rc<P>>,
    last_value: Option<Handle>,
    last_age: Option<A>,
    /// Reads that went past the fast path.
    recomputations: u64,
}

struct Inner<N: Notifier, P> {
    notifier: N,
    selector: RefCell<ModelSelector<P>>,
    state: RefCell<ReadState<N::Age, P>>,
    config: ResourceConfig,
}

/// A readable, subscribable resource derived from a notifier.
///
/// Cloning creates a new handle to the **same** cache, so every consumer of a
/// resource shares one derivation.
pub struct NotifierSubscription<N: Notifier, P = ()> {
    inner: Rc<Inner<N, P>>,
}

impl<N: Notifier, P> Clone for NotifierSubscription<N, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<N: Notifier, P> fmt::Debug for NotifierSubscription<N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("NotifierSubscription")
            .field("name", &self.inner.config.name)
            .field("last_age", &state.last_age)
            .field("last_value", &state.last_value)
            .field("recomputations", &state.recomputations)
            .finish()
    }
}

fn same_parameters<P>(a: Option<&Rc<P>>, b: Option<&Rc<P>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

impl<N, P> NotifierSubscription<N, P>
where
    N: Notifier + 'static,
    P: 'static,
{
    /// Create a resource for `token`, defaulting derived values against the
    /// token's model.
    pub fn new<K>(
        notifier: N,
        token: &Token<K>,
        derive: impl Fn(Option<&P>) -> Option<Handle> + 'static,
    ) -> Self {
        Self::with_config(notifier, token, derive, ResourceConfig::default())
    }

    /// Like [`new`](Self::new) with an explicit configuration.
    pub fn with_config<K>(
        notifier: N,
        token: &Token<K>,
        derive: impl Fn(Option<&P>) -> Option<Handle> + 'static,
        config: ResourceConfig,
    ) -> Self {
        Self::from_model(notifier, token.model().cloned(), derive, config)
    }

    /// Create a resource from a bare model, without a token.
    pub fn from_model(
        notifier: N,
        model: Option<Handle>,
        derive: impl Fn(Option<&P>) -> Option<Handle> + 'static,
        config: ResourceConfig,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                notifier,
                selector: RefCell::new(ModelSelector::new(derive, model)),
                state: RefCell::new(ReadState {
                    last_parameters: None,
                    last_value: None,
                    last_age: None,
                    recomputations: 0,
                }),
                config,
            }),
        }
    }

    /// Read with the last supplied parameters (none before the first
    /// [`read_with`](Self::read_with)).
    pub fn read(&self) -> Result<Option<Handle>> {
        refresh(&self.inner, None)
    }

    /// Read with `parameters`. A parameter handle that is not pointer-equal
    /// to the previous one forces a fresh derivation.
    pub fn read_with(&self, parameters: Rc<P>) -> Result<Option<Handle>> {
        refresh(&self.inner, Some(parameters))
    }

    /// Call `notify` whenever a notification changes the derived value.
    ///
    /// The returned guard detaches the listener from the notifier; see
    /// [`Unsubscribe`].
    pub fn subscribe(&self, notify: impl Fn() + 'static) -> Result<Unsubscribe> {
        let weak: Weak<Inner<N, P>> = Rc::downgrade(&self.inner);
        let listener: Listener = Rc::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let previous = inner.state.borrow().last_value.clone();
            match refresh(&inner, None) {
                Ok(next) if same_handle(previous.as_ref(), next.as_ref()) => {
                    tracing::trace!(resource = %inner.config.name, "notification filtered");
                }
                Ok(_) => {
                    tracing::debug!(resource = %inner.config.name, "derived value changed");
                    drop(inner);
                    notify();
                }
                Err(err) => {
                    tracing::warn!(
                        resource = %inner.config.name,
                        error = %err,
                        "read failed during notification"
                    );
                }
            }
        });
        self.inner.notifier.subscribe(listener)
    }
}

impl<N: Notifier, P> NotifierSubscription<N, P> {
    /// Last value handed out by a read, without touching the notifier.
    #[must_use]
    pub fn last_value(&self) -> Option<Handle> {
        self.inner.state.borrow().last_value.clone()
    }

    /// Parameters of the last read.
    #[must_use]
    pub fn last_parameters(&self) -> Option<Rc<P>> {
        self.inner.state.borrow().last_parameters.clone()
    }

    /// Number of reads that missed the fast path.
    #[must_use]
    pub fn recomputations(&self) -> u64 {
        self.inner.state.borrow().recomputations
    }

    /// Number of defaulting passes run by the underlying selector.
    #[must_use]
    pub fn defaulting_passes(&self) -> u64 {
        self.inner.selector.borrow().version()
    }

    #[must_use]
    pub fn config(&self) -> &ResourceConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn notifier(&self) -> &N {
        &self.inner.notifier
    }

    /// Whether two handles share one cache.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// The read algorithm. `supplied = None` reuses the last parameters.
fn refresh<N: Notifier, P>(inner: &Inner<N, P>, supplied: Option<Rc<P>>) -> Result<Option<Handle>> {
    let age = inner.notifier.age()?;

    let parameters = {
        let mut state = inner.state.borrow_mut();
        let parameters = supplied.or_else(|| state.last_parameters.clone());
        let expired = !same_parameters(parameters.as_ref(), state.last_parameters.as_ref());
        state.last_parameters = parameters.clone();
        if !expired && state.last_age.as_ref() == Some(&age) {
            if inner.config.trace_reads {
                tracing::trace!(resource = %inner.config.name, age = ?age, "read hit");
            }
            return Ok(state.last_value.clone());
        }
        tracing::debug!(resource = %inner.config.name, age = ?age, expired, "recomputing");
        parameters
    };

    inner.state.borrow_mut().last_age = Some(age);

    let value = inner.selector.borrow_mut().call(parameters.as_deref());

    let mut state = inner.state.borrow_mut();
    state.last_value = value.clone();
    state.recomputations += 1;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
