#![forbid(unsafe_code)]

//! Errors surfaced by resources.
//!
//! Defaulting, selection and registry lookups are total. The only failures
//! come from the external [`Notifier`](crate::Notifier), and they propagate
//! unchanged to the caller of `read` or `subscribe`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("notifier failed to report its age: {reason}")]
    Age { reason: String },

    #[error("notifier rejected listener: {reason}")]
    Subscribe { reason: String },

    #[error("notifier has been torn down")]
    TornDown,
}

impl Error {
    #[must_use]
    pub fn age(reason: impl Into<String>) -> Self {
        Self::Age {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn subscribe(reason: impl Into<String>) -> Self {
        Self::Subscribe {
            reason: reason.into(),
        }
    }
}
