#![forbid(unsafe_code)]

//! Dynamic values held behind reference-counted handles.
//!
//! Every derived value in this crate travels as a [`Handle`] (`Rc<Value>`).
//! Caches compare handles with [`Rc::ptr_eq`], never by content, so a handle
//! that comes back pointer-equal means "nothing changed" and a fresh
//! allocation means "something may have changed".
//!
//! An absent value is `Option::<Handle>::None`. [`Value::Null`] is a present,
//! intentional null and is never defaulted.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

/// Shared, identity-comparable handle to a [`Value`].
pub type Handle = Rc<Value>;

/// A dynamic, JSON-like value.
///
/// `PartialEq` is structural (it recurses through child handles). Identity
/// checks go through [`same_handle`] or [`Rc::ptr_eq`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Handle>),
    /// Keyed structure. Key order is insertion order.
    Record(IndexMap<String, Handle>),
}

/// Runtime type of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    List,
    Record,
}

impl ValueKind {
    /// Bool, number and string are primitives; everything else is not.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        matches!(self, Self::Bool | Self::Number | Self::String)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::List => "list",
            Self::Record => "record",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Build a record from `(key, value)` pairs, keeping their order.
    pub fn record<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoHandle,
    {
        Self::Record(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into_handle()))
                .collect(),
        )
    }

    /// Build a list from values or handles.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: IntoHandle,
    {
        Self::List(items.into_iter().map(IntoHandle::into_handle).collect())
    }

    /// Move this value into a fresh handle.
    #[must_use]
    pub fn handle(self) -> Handle {
        Rc::new(self)
    }

    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Number(_) => ValueKind::Number,
            Self::String(_) => ValueKind::String,
            Self::List(_) => ValueKind::List,
            Self::Record(_) => ValueKind::Record,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        self.kind().is_primitive()
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Handle]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&IndexMap<String, Handle>> {
        match self {
            Self::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Field lookup on a record. `None` for missing keys and non-records.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Handle> {
        self.as_record().and_then(|fields| fields.get(key))
    }
}

/// Reference identity over optional handles. Two absent values are identical.
#[must_use]
pub fn same_handle(a: Option<&Handle>, b: Option<&Handle>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

// Integer conversions stop at 32 bits, where `f64` is still exact. Wider
// integers go through an explicit `as f64` at the call site.
impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// Anything that can become a child [`Handle`] of a list or record.
///
/// Passing an existing handle shares it instead of allocating.
pub trait IntoHandle {
    fn into_handle(self) -> Handle;
}

impl IntoHandle for Handle {
    fn into_handle(self) -> Handle {
        self
    }
}

impl IntoHandle for &Handle {
    fn into_handle(self) -> Handle {
        Rc::clone(self)
    }
}

macro_rules! into_handle_via_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoHandle for $ty {
                fn into_handle(self) -> Handle {
                    Rc::new(Value::from(self))
                }
            }
        )*
    };
}

impl IntoHandle for Value {
    fn into_handle(self) -> Handle {
        Rc::new(self)
    }
}

into_handle_via_value!(bool, f64, i32, u32, &str, String);

#[cfg(feature = "json")]
impl Value {
    /// Convert from a `serde_json` value. Numbers become `f64`.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Self::String(s.clone()),
            Json::Array(items) => Self::List(items.iter().map(|v| Self::from_json(v).handle()).collect()),
            Json::Object(fields) => Self::Record(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v).handle()))
                    .collect(),
            ),
        }
    }

    /// Convert to a `serde_json` value. Non-finite numbers become `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Self::String(s) => Json::String(s.clone()),
            Self::List(items) => Json::Array(items.iter().map(|v| v.to_json()).collect()),
            Self::Record(fields) => Json::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Shallow equality
// ---------------------------------------------------------------------------

/// One-level equality, used to decide whether two parameter objects carry
/// the same content.
///
/// For [`Value`], scalars compare by value and children of lists/records
/// compare by handle identity (scalar children also compare by value).
pub trait ShallowEq {
    fn shallow_eq(&self, other: &Self) -> bool;
}

fn child_eq(a: &Handle, b: &Handle) -> bool {
    Rc::ptr_eq(a, b) || (a.is_primitive() && a == b) || (a.is_null() && b.is_null())
}

impl ShallowEq for Value {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| child_eq(x, y))
            }
            (Self::Record(a), Self::Record(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, x)| b.get(k).is_some_and(|y| child_eq(x, y)))
            }
            _ => self == other,
        }
    }
}

impl<T: ShallowEq + ?Sized> ShallowEq for Rc<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || (**self).shallow_eq(&**other)
    }
}

impl<T: ShallowEq> ShallowEq for Option<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.shallow_eq(b),
            _ => false,
        }
    }
}

macro_rules! shallow_eq_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ShallowEq for $ty {
                fn shallow_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

shallow_eq_by_value!((), bool, char, i32, i64, u32, u64, usize, f64, str, String);
