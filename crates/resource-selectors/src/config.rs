#![forbid(unsafe_code)]

//! Per-resource configuration.

use std::borrow::Cow;

/// Configuration for a [`NotifierSubscription`](crate::NotifierSubscription).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceConfig {
    /// Name attached as the `resource` field of every log event.
    /// Default: `"resource"`.
    pub name: Cow<'static, str>,

    /// Emit a `TRACE` event for every fast-path read.
    /// Reads are hot, so this is off unless asked for.
    /// Default: false.
    pub trace_reads: bool,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("resource"),
            trace_reads: false,
        }
    }
}

impl ResourceConfig {
    /// Default configuration with a custom name.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_trace_reads(mut self, enabled: bool) -> Self {
        self.trace_reads = enabled;
        self
    }
}
