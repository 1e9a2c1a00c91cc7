#![forbid(unsafe_code)]

//! Identity-gated defaulting of a derivation function's output.
//!
//! # Design
//!
//! [`ModelSelector`] keeps two cache levels: the last raw handle returned by
//! the derivation function and the normalized handle produced from it by
//! [`apply_model`]. Defaulting allocates, so it only runs when the raw handle
//! changes identity. An unchanged raw handle always yields the identical
//! normalized handle.
//!
//! # Invariants
//!
//! 1. The derivation function runs on every [`call`](ModelSelector::call);
//!    staleness gating belongs to the caller.
//! 2. The first call always applies the model, even for an absent raw value.
//! 3. `version` increments by exactly 1 per defaulting pass.

use std::fmt;

use crate::model::apply_model;
use crate::value::{Handle, same_handle};

/// Last raw/normalized pair seen by a selector.
struct Memo {
    raw: Option<Handle>,
    normalized: Option<Handle>,
}

/// A derivation function wrapped with raw-identity-gated defaulting.
pub struct ModelSelector<P> {
    derive: Box<dyn Fn(Option<&P>) -> Option<Handle>>,
    model: Option<Handle>,
    /// `None` until the first call.
    memo: Option<Memo>,
    version: u64,
}

impl<P> fmt::Debug for ModelSelector<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSelector")
            .field("model", &self.model)
            .field("normalized", &self.memo.as_ref().map(|m| &m.normalized))
            .field("version", &self.version)
            .finish()
    }
}

impl<P> ModelSelector<P> {
    /// Wrap `derive`, defaulting its output against `model`.
    pub fn new(
        derive: impl Fn(Option<&P>) -> Option<Handle> + 'static,
        model: Option<Handle>,
    ) -> Self {
        Self {
            derive: Box::new(derive),
            model,
            memo: None,
            version: 0,
        }
    }

    /// Run the derivation and return the normalized value.
    ///
    /// Returns the previously cached normalized handle when the derivation
    /// hands back the same raw handle as last time.
    pub fn call(&mut self, params: Option<&P>) -> Option<Handle> {
        let next = (self.derive)(params);

        if let Some(memo) = &self.memo {
            if same_handle(next.as_ref(), memo.raw.as_ref()) {
                return memo.normalized.clone();
            }
        }

        let normalized = apply_model(next.as_ref(), self.model.as_ref());
        self.version += 1;
        self.memo = Some(Memo {
            raw: next,
            normalized: normalized.clone(),
        });
        normalized
    }

    /// The template this selector defaults against.
    #[must_use]
    pub fn model(&self) -> Option<&Handle> {
        self.model.as_ref()
    }

    /// Number of defaulting passes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn xy_model() -> Option<Handle> {
        Some(Value::record([("x", 0), ("y", 0)]).handle())
    }

    #[test]
    fn same_raw_handle_skips_defaulting() {
        let source = Rc::new(RefCell::new(Value::record([("x", 1)]).handle()));
        let s = Rc::clone(&source);
        let mut selector = ModelSelector::<()>::new(move |_| Some(Rc::clone(&s.borrow())), xy_model());

        let first = selector.call(None).unwrap();
        let second = selector.call(None).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(selector.version(), 1);
        assert_eq!(*first, Value::record([("x", 1), ("y", 0)]));

        *source.borrow_mut() = Value::record([("x", 1), ("y", 5)]).handle();
        let third = selector.call(None).unwrap();
        assert!(!Rc::ptr_eq(&second, &third));
        assert_eq!(*third, Value::record([("x", 1), ("y", 5)]));
        assert_eq!(selector.version(), 2);
    }

    #[test]
    fn derivation_runs_every_call() {
        let calls = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&calls);
        let raw = Value::from(3).handle();
        let mut selector = ModelSelector::<()>::new(
            move |_| {
                c.set(c.get() + 1);
                Some(Rc::clone(&raw))
            },
            None,
        );

        for _ in 0..4 {
            let _ = selector.call(None);
        }
        assert_eq!(calls.get(), 4);
        assert_eq!(selector.version(), 1);
    }

    #[test]
    fn absent_first_value_still_gets_model() {
        let mut selector = ModelSelector::<()>::new(|_| None, xy_model());
        let first = selector.call(None).unwrap();
        assert_eq!(*first, Value::record([("x", 0), ("y", 0)]));

        // Absent again is the same raw state: cached copy, not a new one.
        let second = selector.call(None).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn parameters_reach_derivation() {
        let mut selector = ModelSelector::<u32>::new(
            |p| p.map(|n| Value::from(*n).handle()),
            Some(Value::from(-1).handle()),
        );
        assert_eq!(selector.call(Some(&7)).and_then(|v| v.as_number()), Some(7.0));
        assert_eq!(selector.call(None).and_then(|v| v.as_number()), Some(-1.0));
    }

    #[test]
    fn debug_format() {
        let mut selector = ModelSelector::<()>::new(|_| Some(Value::from(42).handle()), None);
        let _ = selector.call(None);
        let dbg = format!("{selector:?}");
        assert!(dbg.contains("ModelSelector"));
        assert!(dbg.contains("42"));
    }
}
