#![forbid(unsafe_code)]

//! The external change-notifier contract.
//!
//! This crate never implements a notifier. Hosts supply one that reports a
//! monotonically non-decreasing age and calls listeners after mutations.
//!
//! # Contract
//!
//! 1. `age()` is cheap, and equal ages imply no relevant mutation happened
//!    between the two observations.
//! 2. Ages never decrease.
//! 3. Listeners may be invoked at any point the host chooses, including from
//!    inside another listener.
//! 4. The detach closure handed to [`Unsubscribe::new`] must tolerate the
//!    notifier being gone (hold weak references).

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;

/// Callback registered with a [`Notifier`].
pub type Listener = Rc<dyn Fn()>;

/// An external source of change notifications.
pub trait Notifier {
    /// Version counter. Only equality is used.
    type Age: PartialEq + fmt::Debug;

    /// Current age of the source.
    fn age(&self) -> Result<Self::Age>;

    /// Register `listener`; it stays attached until the returned guard is
    /// unsubscribed or dropped.
    fn subscribe(&self, listener: Listener) -> Result<Unsubscribe>;
}

impl<N: Notifier + ?Sized> Notifier for Rc<N> {
    type Age = N::Age;

    fn age(&self) -> Result<Self::Age> {
        (**self).age()
    }

    fn subscribe(&self, listener: Listener) -> Result<Unsubscribe> {
        (**self).subscribe(listener)
    }
}

/// Capability to detach a listener from a notifier.
///
/// Detaching happens at most once: [`unsubscribe`](Self::unsubscribe) is
/// idempotent and dropping the guard detaches as well. Use
/// [`forget`](Self::forget) to leave the listener attached.
#[must_use = "dropping an Unsubscribe detaches the listener"]
pub struct Unsubscribe {
    detach: Cell<Option<Box<dyn FnOnce()>>>,
}

impl Unsubscribe {
    /// Wrap the notifier-specific detach action.
    pub fn new(detach: impl FnOnce() + 'static) -> Self {
        Self {
            detach: Cell::new(Some(Box::new(detach))),
        }
    }

    /// A guard with nothing to detach.
    pub fn noop() -> Self {
        Self {
            detach: Cell::new(None),
        }
    }

    /// Detach the listener. Later calls do nothing.
    pub fn unsubscribe(&self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    /// Whether the listener has already been detached.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        let detach = self.detach.take();
        let detached = detach.is_none();
        self.detach.set(detach);
        detached
    }

    /// Keep the listener attached for the notifier's lifetime.
    pub fn forget(self) {
        self.detach.take();
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("detached", &self.is_detached())
            .finish()
    }
}
