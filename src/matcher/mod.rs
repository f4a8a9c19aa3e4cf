//! Argument matchers.
//!
//! This module provides the matchers a call template keeps per parameter:
//!
//! - [`ArgMatcher`] - the closed set of matcher shapes the engine understands
//! - [`Matcher`] trait for custom predicates
//! - [`Composite`] - matchers built from other matchers (`not`, `and`, `or`, varargs)
//! - [`CompositeVarArgMatcher`] - positional prefix / wildcard / suffix vararg pattern
//! - [`CaptureSink`] - storage filled by capturing matchers
//!
//! # Example
//!
//! ```rust
//! use mockkit::matcher::{ArgMatcher, CompositeVarArgMatcher};
//! use mockkit::Value;
//!
//! let m = ArgMatcher::eq(42);
//! assert!(m.matches(&Value::from(42)));
//!
//! let varargs = CompositeVarArgMatcher::default()
//!     .compose(ArgMatcher::eq(3))
//!     .and_then(|c| c.compose(ArgMatcher::any_varargs()))
//!     .and_then(|c| c.compose(ArgMatcher::eq(1)))
//!     .unwrap();
//! assert!(varargs.matches(&Value::from(vec![1, 2, 2, 3])));
//! ```

mod capture;
mod composer;
mod vararg;

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::value::Value;

pub use capture::CaptureSink;
pub(crate) use composer::ArgMatchersComposer;
pub use vararg::{CompositeVarArgMatcher, VarArgWildcard};

/// A predicate over one argument value.
///
/// # Implementing Custom Matchers
///
/// ```rust
/// use mockkit::matcher::{ArgMatcher, Matcher};
/// use mockkit::Value;
///
/// struct IsEven;
///
/// impl Matcher for IsEven {
///     fn matches(&self, value: &Value) -> bool {
///         value.as_int().is_some_and(|v| v % 2 == 0)
///     }
///
///     fn describe(&self) -> String {
///         "isEven()".to_string()
///     }
/// }
///
/// let m = ArgMatcher::custom(IsEven);
/// assert!(m.matches(&Value::from(4)));
/// assert!(!m.matches(&Value::from(3)));
/// ```
pub trait Matcher: Send + Sync {
    /// Check if the value matches.
    fn matches(&self, value: &Value) -> bool;

    /// Describe what this matcher expects.
    fn describe(&self) -> String;
}

/// Matcher built from a closure and a description.
struct FnMatcher<F> {
    predicate: F,
    description: String,
}

impl<F> Matcher for FnMatcher<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn matches(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Shared handle to a custom matcher. Equality is identity.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Matcher>);

impl Predicate {
    /// Wrap a custom matcher.
    pub fn new(matcher: impl Matcher + 'static) -> Self {
        Self(Arc::new(matcher))
    }

    /// Build a predicate from a closure.
    pub fn from_fn<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::new(FnMatcher {
            predicate,
            description: description.into(),
        })
    }

    /// Check if the value matches.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        self.0.matches(value)
    }

    /// Describe what the predicate expects.
    #[must_use]
    pub fn describe(&self) -> String {
        self.0.describe()
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Matcher that accepts what its inner matcher accepts and records the matched value.
#[derive(Clone, Debug, PartialEq)]
pub struct Capture {
    sink: CaptureSink,
    inner: Box<ArgMatcher>,
}

impl Capture {
    /// The sink receiving matched values.
    #[must_use]
    pub fn sink(&self) -> &CaptureSink {
        &self.sink
    }

    /// Record `value` into the sink.
    pub fn capture(&self, value: Value) {
        self.sink.push(value);
    }
}

/// Matcher assembled from other matchers recorded before it.
#[derive(Clone, Debug, PartialEq)]
pub enum Composite {
    /// Negation of one matcher.
    Not(Option<Box<ArgMatcher>>),
    /// All operands must match.
    And {
        /// Number of operands expected.
        arity: usize,
        /// Operands collected so far, in call order.
        operands: Vec<ArgMatcher>,
    },
    /// At least one operand must match.
    Or {
        /// Number of operands expected.
        arity: usize,
        /// Operands collected so far, in call order.
        operands: Vec<ArgMatcher>,
    },
    /// Positional vararg pattern.
    VarArg(CompositeVarArgMatcher),
}

impl Composite {
    /// Check if the value matches.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Not(inner) => inner.as_ref().is_some_and(|m| !m.matches(value)),
            Self::And { operands, .. } => operands.iter().all(|m| m.matches(value)),
            Self::Or { operands, .. } => operands.iter().any(|m| m.matches(value)),
            Self::VarArg(varargs) => varargs.matches(value),
        }
    }

    /// Add one operand. Operands arrive newest first.
    pub fn compose(self, matcher: ArgMatcher) -> Result<Self> {
        Ok(match self {
            Self::Not(_) => Self::Not(Some(Box::new(matcher))),
            Self::And {
                arity,
                mut operands,
            } => {
                operands.insert(0, matcher);
                Self::And { arity, operands }
            }
            Self::Or {
                arity,
                mut operands,
            } => {
                operands.insert(0, matcher);
                Self::Or { arity, operands }
            }
            Self::VarArg(varargs) => Self::VarArg(varargs.compose(matcher)?),
        })
    }

    /// Whether every operand position is bound.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        match self {
            Self::Not(inner) => inner.is_some(),
            Self::And { arity, operands } | Self::Or { arity, operands } => {
                operands.len() >= *arity
            }
            Self::VarArg(varargs) => varargs.is_filled(),
        }
    }
}

impl fmt::Display for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Not(Some(inner)) => write!(f, "not({inner})"),
            Self::Not(None) => f.write_str("not(?)"),
            Self::And { operands, .. } => write!(f, "and({})", join(operands)),
            Self::Or { operands, .. } => write!(f, "or({})", join(operands)),
            Self::VarArg(varargs) => write!(f, "{varargs}"),
        }
    }
}

/// Matcher over a single argument.
#[derive(Clone, PartialEq)]
pub enum ArgMatcher {
    /// Equal to the literal value.
    Equals(Value),
    /// Accepts everything.
    Any,
    /// Custom predicate.
    Predicate(Predicate),
    /// Capturing matcher.
    Capture(Capture),
    /// Matcher built from other matchers.
    Composite(Composite),
    /// Vararg wildcard consuming the middle run of a vararg pattern.
    Wildcard(VarArgWildcard),
}

impl ArgMatcher {
    /// Equality matcher.
    pub fn eq(value: impl Into<Value>) -> Self {
        Self::Equals(value.into())
    }

    /// Matcher accepting any value.
    #[must_use]
    pub fn any() -> Self {
        Self::Any
    }

    /// Matcher from a closure.
    pub fn matching<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Predicate::from_fn(description, predicate))
    }

    /// Matcher from a custom [`Matcher`] implementation.
    pub fn custom(matcher: impl Matcher + 'static) -> Self {
        Self::Predicate(Predicate::new(matcher))
    }

    /// Capturing matcher accepting any value.
    #[must_use]
    pub fn capture(sink: &CaptureSink) -> Self {
        Self::capture_matching(sink, Self::Any)
    }

    /// Capturing matcher accepting what `inner` accepts.
    #[must_use]
    pub fn capture_matching(sink: &CaptureSink, inner: ArgMatcher) -> Self {
        Self::Capture(Capture {
            sink: sink.clone(),
            inner: Box::new(inner),
        })
    }

    /// Unfilled negation, completed by the composer.
    #[must_use]
    pub fn not() -> Self {
        Self::Composite(Composite::Not(None))
    }

    /// Unfilled conjunction of `arity` operands, completed by the composer.
    #[must_use]
    pub fn and(arity: usize) -> Self {
        Self::Composite(Composite::And {
            arity,
            operands: Vec::with_capacity(arity),
        })
    }

    /// Unfilled disjunction of `arity` operands, completed by the composer.
    #[must_use]
    pub fn or(arity: usize) -> Self {
        Self::Composite(Composite::Or {
            arity,
            operands: Vec::with_capacity(arity),
        })
    }

    /// Wildcard accepting any middle run.
    #[must_use]
    pub fn any_varargs() -> Self {
        Self::Wildcard(VarArgWildcard::Any)
    }

    /// Wildcard accepting a run whose elements all satisfy the predicate.
    pub fn varargs_all<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::Wildcard(VarArgWildcard::AllThat(Predicate::from_fn(
            description,
            predicate,
        )))
    }

    /// Wildcard accepting a run with at least one element satisfying the predicate.
    pub fn varargs_any<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::Wildcard(VarArgWildcard::AnyThat(Predicate::from_fn(
            description,
            predicate,
        )))
    }

    /// Check if the value matches.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Equals(expected) => expected == value,
            Self::Any => true,
            Self::Predicate(predicate) => predicate.matches(value),
            Self::Capture(capture) => capture.inner.matches(value),
            Self::Composite(composite) => composite.matches(value),
            Self::Wildcard(wildcard) => value
                .as_list()
                .is_some_and(|items| wildcard.matches_rest(items)),
        }
    }

    /// Describe what this matcher expects.
    #[must_use]
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ArgMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(value) => write!(f, "{value}"),
            Self::Any => f.write_str("any()"),
            Self::Predicate(predicate) => write!(f, "matching({})", predicate.describe()),
            Self::Capture(capture) => write!(f, "capture({})", capture.inner),
            Self::Composite(composite) => write!(f, "{composite}"),
            Self::Wildcard(wildcard) => write!(f, "{wildcard}"),
        }
    }
}

impl fmt::Debug for ArgMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn join(matchers: &[ArgMatcher]) -> String {
    matchers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
