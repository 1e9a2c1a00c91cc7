#![forbid(unsafe_code)]

//! Shallow structural defaulting against a template ("model").
//!
//! [`apply_model`] fills the gaps of a derived value from a template. Whenever
//! no defaulting is needed it returns the input handle itself, so downstream
//! identity checks see "unchanged". It allocates only when it actually builds
//! a copy or a merged record.
//!
//! # Rules
//!
//! | model       | result                    | output                         |
//! |-------------|---------------------------|--------------------------------|
//! | absent/null | anything                  | result                         |
//! | any         | null                      | result                         |
//! | primitive   | absent or different kind  | model                          |
//! | primitive   | same kind                 | result                         |
//! | list        | absent or not a list      | shallow copy of model          |
//! | list        | list                      | result                         |
//! | record      | absent or not a record    | shallow copy of model          |
//! | record      | record                    | model keys, result values first|
//!
//! Merging is one level deep. Keys present only in the result are dropped.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::{Handle, Value};

/// Normalize `result` against `model`.
///
/// Absent inputs are `None`. The output is `None` only when `result` is
/// absent and there is no model to fall back to.
#[must_use]
pub fn apply_model(result: Option<&Handle>, model: Option<&Handle>) -> Option<Handle> {
    let model = match model {
        Some(model) if !model.is_null() => model,
        _ => return result.cloned(),
    };
    if result.is_some_and(|r| r.is_null()) {
        return result.cloned();
    }

    match &**model {
        Value::Bool(_) | Value::Number(_) | Value::String(_) => match result {
            Some(result) if result.kind() == model.kind() => Some(Rc::clone(result)),
            _ => Some(Rc::clone(model)),
        },
        Value::List(items) => match result {
            Some(result) if matches!(**result, Value::List(_)) => Some(Rc::clone(result)),
            _ => Some(Value::List(items.clone()).handle()),
        },
        Value::Record(defaults) => match result.and_then(|r| r.as_record()) {
            Some(fields) => Some(merge_record(fields, defaults).handle()),
            None => Some(Value::Record(defaults.clone()).handle()),
        },
        // Filtered out above.
        Value::Null => result.cloned(),
    }
}

fn merge_record(fields: &IndexMap<String, Handle>, defaults: &IndexMap<String, Handle>) -> Value {
    Value::Record(
        defaults
            .iter()
            .map(|(key, default)| {
                let value = fields.get(key).unwrap_or(default);
                (key.clone(), Rc::clone(value))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(v: impl Into<Value>) -> Handle {
        v.into().handle()
    }

    fn ab() -> Handle {
        Value::record([("a", 1), ("b", 2)]).handle()
    }

    #[test]
    fn absent_model_passes_result_through() {
        let result = h(5);
        let out = apply_model(Some(&result), None).unwrap();
        assert!(Rc::ptr_eq(&out, &result));
        assert!(apply_model(None, None).is_none());

        let null_model = Value::Null.handle();
        let out = apply_model(Some(&result), Some(&null_model)).unwrap();
        assert!(Rc::ptr_eq(&out, &result));
        assert!(apply_model(None, Some(&null_model)).is_none());
    }

    #[test]
    fn null_result_is_terminal() {
        let null = Value::Null.handle();
        for model in [h("default"), Value::list([9]).handle(), ab()] {
            let out = apply_model(Some(&null), Some(&model)).unwrap();
            assert!(Rc::ptr_eq(&out, &null));
        }
    }

    #[test]
    fn primitive_model() {
        let model = h("default");

        let x = h("x");
        let out = apply_model(Some(&x), Some(&model)).unwrap();
        assert!(Rc::ptr_eq(&out, &x));

        let five = h(5);
        let out = apply_model(Some(&five), Some(&model)).unwrap();
        assert!(Rc::ptr_eq(&out, &model));

        let out = apply_model(None, Some(&model)).unwrap();
        assert!(Rc::ptr_eq(&out, &model));

        let flag = h(true);
        let out = apply_model(Some(&flag), Some(&h(false))).unwrap();
        assert!(Rc::ptr_eq(&out, &flag));
    }

    #[test]
    fn list_model() {
        let model = Value::list([9]).handle();

        let result = Value::list([1, 2]).handle();
        let out = apply_model(Some(&result), Some(&model)).unwrap();
        assert!(Rc::ptr_eq(&out, &result));

        let out = apply_model(None, Some(&model)).unwrap();
        assert_eq!(out, model);
        assert!(!Rc::ptr_eq(&out, &model));
        // Elements are shared, not cloned.
        assert!(Rc::ptr_eq(&out.as_list().unwrap()[0], &model.as_list().unwrap()[0]));

        let out = apply_model(Some(&h("nope")), Some(&model)).unwrap();
        assert_eq!(out, model);
        assert!(!Rc::ptr_eq(&out, &model));
    }

    #[test]
    fn record_model_absent_result_copies() {
        let model = ab();
        let out = apply_model(None, Some(&model)).unwrap();
        assert_eq!(out, model);
        assert!(!Rc::ptr_eq(&out, &model));
    }

    #[test]
    fn record_model_merges_and_drops_extra_keys() {
        let model = ab();
        let result = Value::record([("a", 5), ("extra", 7)]).handle();
        let out = apply_model(Some(&result), Some(&model)).unwrap();

        assert_eq!(*out, Value::record([("a", 5), ("b", 2)]));
        assert!(Rc::ptr_eq(out.get("a").unwrap(), result.get("a").unwrap()));
        assert!(Rc::ptr_eq(out.get("b").unwrap(), model.get("b").unwrap()));
        assert!(out.get("extra").is_none());
    }

    #[test]
    fn record_model_keeps_model_key_order() {
        let model = Value::record([("y", 0), ("x", 0)]).handle();
        let result = Value::record([("x", 1), ("y", 2)]).handle();
        let out = apply_model(Some(&result), Some(&model)).unwrap();
        let keys: Vec<&str> = out.as_record().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["y", "x"]);
    }

    #[test]
    fn record_model_keeps_null_fields() {
        let model = ab();
        let result = Value::record([("a", Value::Null)]).handle();
        let out = apply_model(Some(&result), Some(&model)).unwrap();
        assert!(out.get("a").unwrap().is_null());
        assert_eq!(out.get("b").and_then(|v| v.as_number()), Some(2.0));
    }

    #[test]
    fn record_model_rejects_non_record_result() {
        let model = ab();
        for result in [h(5), h("str"), h(true), Value::list([1]).handle()] {
            let out = apply_model(Some(&result), Some(&model)).unwrap();
            assert_eq!(out, model);
            assert!(!Rc::ptr_eq(&out, &model));
        }
    }

    #[test]
    fn record_merge_always_allocates() {
        // Even a result that already matches the model gets a fresh record;
        // identity preservation across calls is the selector's job.
        let model = ab();
        let result = ab();
        let out = apply_model(Some(&result), Some(&model)).unwrap();
        assert_eq!(out, result);
        assert!(!Rc::ptr_eq(&out, &result));
    }
}
