//! Shared test notifier: a mutable source value with an age counter.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use resource_selectors::{Error, Handle, Listener, Notifier, Result, Unsubscribe};

/// A hand-driven store. Every `set` bumps the age and fires all listeners.
#[derive(Default)]
pub struct Store {
    value: RefCell<Option<Handle>>,
    age: Cell<u64>,
    listeners: Rc<RefCell<Vec<(u64, Listener)>>>,
    next_id: Cell<u64>,
    reject_subscribe: Cell<bool>,
    torn_down: Cell<bool>,
}

impl Store {
    pub fn new(value: Handle) -> Rc<Self> {
        let store = Self::default();
        *store.value.borrow_mut() = Some(value);
        Rc::new(store)
    }

    pub fn get(&self) -> Option<Handle> {
        self.value.borrow().clone()
    }

    pub fn set(&self, value: Handle) {
        *self.value.borrow_mut() = Some(value);
        self.touch();
    }

    /// Bump the age and notify without changing the value, as an unrelated
    /// mutation elsewhere in a larger store would.
    pub fn touch(&self) {
        self.age.set(self.age.get() + 1);
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn reject_subscriptions(&self) {
        self.reject_subscribe.set(true);
    }

    /// Drop every listener and fail all further age and subscribe calls.
    pub fn tear_down(&self) {
        self.torn_down.set(true);
        self.listeners.borrow_mut().clear();
    }
}

impl Notifier for Store {
    type Age = u64;

    fn age(&self) -> Result<u64> {
        if self.torn_down.get() {
            return Err(Error::TornDown);
        }
        Ok(self.age.get())
    }

    fn subscribe(&self, listener: Listener) -> Result<Unsubscribe> {
        if self.torn_down.get() {
            return Err(Error::TornDown);
        }
        if self.reject_subscribe.get() {
            return Err(Error::subscribe("store closed"));
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, listener));
        let weak = Rc::downgrade(&self.listeners);
        Ok(Unsubscribe::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners.borrow_mut().retain(|(i, _)| *i != id);
            }
        }))
    }
}

/// Counter shared between a closure and the test body.
pub fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
    let c = Rc::new(Cell::new(0));
    (Rc::clone(&c), c)
}
