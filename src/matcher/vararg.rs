//! Vararg pattern matching.

use std::fmt;

use super::{join, ArgMatcher, Predicate};
use crate::error::{Error, Result};
use crate::value::Value;

/// Wildcard consuming the middle run of a vararg pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum VarArgWildcard {
    /// Any run, including an empty one.
    Any,
    /// Every element satisfies the predicate. An empty run is accepted.
    AllThat(Predicate),
    /// At least one element satisfies the predicate. An empty run is rejected.
    AnyThat(Predicate),
}

impl VarArgWildcard {
    /// Check the middle run left between the fixed prefix and suffix.
    #[must_use]
    pub fn matches_rest(&self, rest: &[Value]) -> bool {
        match self {
            Self::Any => true,
            Self::AllThat(predicate) => rest.iter().all(|v| predicate.matches(v)),
            Self::AnyThat(predicate) => rest.iter().any(|v| predicate.matches(v)),
        }
    }
}

impl fmt::Display for VarArgWildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("anyVarargs()"),
            Self::AllThat(predicate) => write!(f, "varargsAll({})", predicate.describe()),
            Self::AnyThat(predicate) => write!(f, "varargsAny({})", predicate.describe()),
        }
    }
}

/// Vararg pattern: fixed `before` prefix, optional wildcard middle, fixed `after` suffix.
///
/// Matchers are composed newest first. Until a wildcard shows up, fixed matchers
/// belong to the suffix; once it has been seen, the remaining (earlier) fixed
/// matchers belong to the prefix.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositeVarArgMatcher {
    before: Vec<ArgMatcher>,
    wildcard: Option<VarArgWildcard>,
    after: Vec<ArgMatcher>,
}

impl CompositeVarArgMatcher {
    /// Fixed matchers anchored to the start.
    #[must_use]
    pub fn before(&self) -> &[ArgMatcher] {
        &self.before
    }

    /// The wildcard, if any.
    #[must_use]
    pub fn wildcard(&self) -> Option<&VarArgWildcard> {
        self.wildcard.as_ref()
    }

    /// Fixed matchers anchored to the end.
    #[must_use]
    pub fn after(&self) -> &[ArgMatcher] {
        &self.after
    }

    /// Check a vararg value. Non-sequences never match.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        let Some(items) = value.as_list() else {
            return false;
        };
        let fixed = self.before.len() + self.after.len();
        if fixed > items.len() {
            return false;
        }
        let (head, tail) = items.split_at(self.before.len());
        if !self.before.iter().zip(head).all(|(m, v)| m.matches(v)) {
            return false;
        }
        let (rest, suffix) = tail.split_at(tail.len() - self.after.len());
        if !self.after.iter().zip(suffix).all(|(m, v)| m.matches(v)) {
            return false;
        }
        match &self.wildcard {
            Some(wildcard) => wildcard.matches_rest(rest),
            None => rest.is_empty(),
        }
    }

    /// Add the next matcher, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MultipleVarargWildcards`] when a second wildcard is added.
    pub fn compose(mut self, matcher: ArgMatcher) -> Result<Self> {
        match matcher {
            ArgMatcher::Wildcard(_) if self.wildcard.is_some() => {
                return Err(Error::MultipleVarargWildcards)
            }
            ArgMatcher::Wildcard(wildcard) => self.wildcard = Some(wildcard),
            fixed if self.wildcard.is_some() => self.before.insert(0, fixed),
            fixed => self.after.insert(0, fixed),
        }
        Ok(self)
    }

    /// A vararg pattern can always take more elements.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        false
    }
}

impl fmt::Display for CompositeVarArgMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fixed_empty = self.before.is_empty() && self.after.is_empty();
        match &self.wildcard {
            None if fixed_empty => f.write_str("noVarargs()"),
            Some(wildcard) if fixed_empty => write!(f, "{wildcard}"),
            None if self.after.is_empty() => write!(f, "[{}]", join(&self.before)),
            wildcard => {
                let parts: Vec<String> = self
                    .before
                    .iter()
                    .map(ToString::to_string)
                    .chain(wildcard.as_ref().map(|_| "...".to_string()))
                    .chain(self.after.iter().map(ToString::to_string))
                    .collect();
                write!(f, "varargs({})", parts.join(", "))
            }
        }
    }
}
