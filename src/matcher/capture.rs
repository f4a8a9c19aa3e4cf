use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::value::Value;

/// Shared storage for values recorded by capturing matchers.
///
/// Clones share the same storage, so a test keeps one handle and gives another to
/// the matcher.
///
/// # Example
///
/// ```rust
/// use mockkit::matcher::CaptureSink;
///
/// let sink = CaptureSink::new();
/// assert!(sink.last().is_none());
/// ```
#[derive(Clone, Default)]
pub struct CaptureSink {
    values: Arc<Mutex<Vec<Value>>>,
}

impl CaptureSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured values, oldest first.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.values.lock().clone()
    }

    /// The most recently captured value.
    #[must_use]
    pub fn last(&self) -> Option<Value> {
        self.values.lock().last().cloned()
    }

    /// Number of captured values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Whether nothing was captured yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    /// Drop every captured value.
    pub fn clear(&self) {
        self.values.lock().clear();
    }

    pub(crate) fn push(&self, value: Value) {
        self.values.lock().push(value);
    }
}

impl PartialEq for CaptureSink {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

impl fmt::Debug for CaptureSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSink")
            .field("values", &*self.values.lock())
            .finish()
    }
}
