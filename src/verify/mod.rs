//! Verification of observed calls against expectations.
//!
//! A [`Verifier`] receives the traces under verification, ordered by order stamp,
//! and the templates recorded in the verification block. On success it returns the
//! traces it accounts for, which the caller then marks as verified.
//!
//! Available policies:
//! - [`SoftVerifier`] - each template matched a bounded number of times
//! - [`ExhaustiveSoftVerifier`] - soft, and every trace accounted for
//! - [`OrderVerifier`] - templates matched by an in-order subsequence of traces
//! - [`ExhaustiveOrderVerifier`] - traces and templates paired one-to-one, in order
//! - [`NoMoreCallsVerifier`] - no trace left at all
//!
//! [`VerifyMode`] selects one of them.

mod order;
mod soft;

use std::fmt::Write as _;

use crate::call::{CallMatchResult, CallTemplate, CallTrace};
use crate::error::{Error, Result};

pub use order::{ExhaustiveOrderVerifier, OrderVerifier};
pub use soft::{ExhaustiveSoftVerifier, SoftVerifier};

/// A verification policy.
pub trait Verifier: Send + Sync {
    /// Check `traces` against `templates` and return the traces accounted for.
    ///
    /// # Errors
    ///
    /// [`Error::VerificationFailed`] describing the mismatch.
    fn verify(&self, traces: &[CallTrace], templates: &[CallTemplate]) -> Result<Vec<CallTrace>>;
}

/// Fails when any trace is left.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoMoreCallsVerifier;

impl Verifier for NoMoreCallsVerifier {
    fn verify(&self, traces: &[CallTrace], templates: &[CallTemplate]) -> Result<Vec<CallTrace>> {
        if traces.is_empty() {
            return Ok(Vec::new());
        }
        Err(fail_assertion(
            traces,
            templates,
            "Expected no more calls, but found unverified calls",
        ))
    }
}

/// Verification policy selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerifyMode {
    /// Every template matched at least once.
    #[default]
    Soft,
    /// Every template matched exactly `n` times.
    Exactly(usize),
    /// Every template matched at least `n` times.
    AtLeast(usize),
    /// Every template matched at most `n` times.
    AtMost(usize),
    /// Every template matched between `min` and `max` times, inclusive.
    InRange(usize, usize),
    /// No template matched at all.
    Not,
    /// Soft, and no call left unverified.
    Exhaustive,
    /// Templates matched in order.
    Order,
    /// Calls and templates paired one-to-one, in order.
    ExhaustiveOrder,
}

impl VerifyMode {
    /// The verifier implementing this mode.
    #[must_use]
    pub fn verifier(self) -> Box<dyn Verifier> {
        match self {
            Self::Soft => Box::new(SoftVerifier::new(1, usize::MAX)),
            Self::Exactly(n) => Box::new(SoftVerifier::new(n, n)),
            Self::AtLeast(n) => Box::new(SoftVerifier::new(n, usize::MAX)),
            Self::AtMost(n) => Box::new(SoftVerifier::new(0, n)),
            Self::InRange(min, max) => Box::new(SoftVerifier::new(min, max)),
            Self::Not => Box::new(SoftVerifier::new(0, 0)),
            Self::Exhaustive => Box::new(ExhaustiveSoftVerifier),
            Self::Order => Box::new(OrderVerifier),
            Self::ExhaustiveOrder => Box::new(ExhaustiveOrderVerifier),
        }
    }
}

/// Build a verification failure carrying `message` and a dump of every trace and
/// template, each template followed by the closest trace.
pub(crate) fn fail_assertion(
    traces: &[CallTrace],
    templates: &[CallTemplate],
    message: &str,
) -> Error {
    let mut out = String::from(message);
    out.push_str("\nCalls:");
    if traces.is_empty() {
        out.push_str("\n  (none)");
    }
    for trace in traces {
        let _ = write!(out, "\n  {trace}");
    }
    if !templates.is_empty() {
        out.push_str("\nExpected:");
    }
    for template in templates {
        let _ = write!(out, "\n  {template}");
        let closest = traces
            .iter()
            .map(|trace| (CallMatchResult::of(trace, template), trace))
            .filter(|(result, _)| *result > CallMatchResult::SameReceiver)
            .max_by_key(|(result, _)| *result);
        if let Some((result, trace)) = closest {
            let _ = write!(out, "\n    closest: {trace} ({result:?})");
        }
    }
    Error::verification_failed(out)
}


#[cfg(test)]
mod tests {
    use super::fixtures::{template, trace};
    use super::*;
    use crate::matcher::ArgMatcher;

    #[test]
    fn test_no_more_calls() {
        assert!(NoMoreCallsVerifier.verify(&[], &[]).unwrap().is_empty());
        let err = NoMoreCallsVerifier
            .verify(&[trace("f", 1, 0)], &[])
            .unwrap_err();
        assert!(err.to_string().contains("A@1.f(x = 1)"));
    }

    #[test]
    fn test_dump_lists_calls_expectations_and_closest() {
        let err = fail_assertion(
            &[trace("f", 1, 0), trace("g", 1, 1)],
            &[template("f", ArgMatcher::eq(2))],
            "boom",
        );
        let msg = err.to_string();
        assert!(msg.contains("boom"));
        assert!(msg.contains("Calls:\n  A@1.f(x = 1)\n  A@1.g(x = 1)"));
        assert!(msg.contains("Expected:\n  A@1.f(x = 2)"));
        assert!(msg.contains("closest: A@1.f(x = 1) (SameReceiverMethodSignature)"));
    }

    #[test]
    fn test_modes_select_bounds() {
        let traces = [trace("f", 1, 0), trace("f", 1, 1)];
        let templates = [template("f", ArgMatcher::any())];
        assert!(VerifyMode::Soft.verifier().verify(&traces, &templates).is_ok());
        assert!(VerifyMode::Exactly(2).verifier().verify(&traces, &templates).is_ok());
        assert!(VerifyMode::Exactly(1).verifier().verify(&traces, &templates).is_err());
        assert!(VerifyMode::AtMost(1).verifier().verify(&traces, &templates).is_err());
        assert!(VerifyMode::InRange(1, 3).verifier().verify(&traces, &templates).is_ok());
        assert!(VerifyMode::Not.verifier().verify(&traces, &templates).is_err());
        assert!(VerifyMode::Not.verifier().verify(&[], &templates).is_ok());
    }
}
