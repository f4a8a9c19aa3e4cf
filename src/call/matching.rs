use super::{CallTemplate, CallTrace};

/// How closely a trace matches a template, weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CallMatchResult {
    /// Different receiver.
    NotMatching,
    /// Same receiver, different function.
    SameReceiver,
    /// Same receiver and function name, different overload.
    SameReceiverMethodOverload,
    /// Same function, but some argument is rejected.
    SameReceiverMethodSignature,
    /// Every argument accepted.
    Matching,
}

impl CallMatchResult {
    /// Grade `trace` against `template`.
    #[must_use]
    pub fn of(trace: &CallTrace, template: &CallTemplate) -> Self {
        if trace.receiver != template.receiver {
            return Self::NotMatching;
        }
        if trace.name != template.name {
            return Self::SameReceiver;
        }
        if trace.signature != template.signature {
            return Self::SameReceiverMethodOverload;
        }
        let accepted = template.matchers.iter().all(|(name, matcher)| {
            trace
                .arg(name)
                .is_some_and(|value| matcher.matches(value))
        });
        if accepted {
            Self::Matching
        } else {
            Self::SameReceiverMethodSignature
        }
    }
}
