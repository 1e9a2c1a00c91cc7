#![forbid(unsafe_code)]

//! Age-gated, change-filtered resources derived from external notifiers.
//!
//! This crate turns an external change notifier plus a pure derivation
//! function into a memoized, subscribable resource:
//!
//! - [`Value`] / [`Handle`]: a dynamic value behind `Rc` handles. Handles are
//!   the unit of reference identity throughout the crate.
//! - [`apply_model`]: one-level structural defaulting against a template that
//!   hands back the input handle whenever no defaulting was needed.
//! - [`ModelSelector`]: gates defaulting on raw-output identity.
//! - [`NotifierSubscription`]: skips recomputation while the notifier age and
//!   the parameters are unchanged, and only wakes subscribers when the derived
//!   handle actually changes.
//! - [`SelectorRegistry`]: lazy factories keyed by token kind.
//! - [`binding`]: parameter stabilization and per-token memoization for
//!   render-loop consumers.
//!
//! # Invariants
//!
//! 1. For an unchanged (age, parameters) pair, `read` returns a handle
//!    pointer-equal to the previous one.
//! 2. The derivation function runs at most once per (age, parameters) pair.
//! 3. Defaulting runs only when the raw derived handle changes.
//! 4. A subscriber is notified only when the derived handle changes.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use resource_selectors::{apply_model, Value};
//!
//! let model = Value::record([("x", Value::from(0)), ("y", Value::from(0))]).handle();
//! let raw = Value::record([("x", Value::from(1))]).handle();
//!
//! let out = apply_model(Some(&raw), Some(&model)).unwrap();
//! assert_eq!(out.get("x").and_then(|v| v.as_number()), Some(1.0));
//! assert_eq!(out.get("y").and_then(|v| v.as_number()), Some(0.0));
//! assert!(!Rc::ptr_eq(&out, &raw));
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod model;
pub mod notifier;
pub mod registry;
pub mod selector;
pub mod subscription;
pub mod value;

pub use config::ResourceConfig;
pub use error::{Error, Result};
pub use model::apply_model;
pub use notifier::{Listener, Notifier, Unsubscribe};
pub use registry::{SelectorRegistry, Token};
pub use selector::ModelSelector;
pub use subscription::NotifierSubscription;
pub use value::{Handle, IntoHandle, ShallowEq, Value, ValueKind, same_handle};
