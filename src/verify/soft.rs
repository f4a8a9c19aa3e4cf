use super::{fail_assertion, Verifier};
use crate::call::{CallTemplate, CallTrace};
use crate::error::Result;

/// Each template must match between `at_least` and `at_most` traces, inclusive.
///
/// Templates are checked in order and the first one out of range fails the
/// verification. Traces matched by several templates are returned once per match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SoftVerifier {
    at_least: usize,
    at_most: usize,
}

impl SoftVerifier {
    /// Verifier with the given inclusive bounds.
    #[must_use]
    pub fn new(at_least: usize, at_most: usize) -> Self {
        Self { at_least, at_most }
    }

    fn describe_range(&self) -> String {
        match (self.at_least, self.at_most) {
            (min, max) if min == max => format!("exactly {min}"),
            (min, usize::MAX) => format!("at least {min}"),
            (0, max) => format!("at most {max}"),
            (min, max) => format!("between {min} and {max}"),
        }
    }
}

impl Verifier for SoftVerifier {
    fn verify(&self, traces: &[CallTrace], templates: &[CallTemplate]) -> Result<Vec<CallTrace>> {
        let mut verified = Vec::new();
        for template in templates {
            let matching: Vec<&CallTrace> = traces.iter().filter(|t| t.matches(template)).collect();
            let count = matching.len();
            if count < self.at_least || count > self.at_most {
                return Err(fail_assertion(
                    traces,
                    templates,
                    &format!(
                        "Expected {} call(s) of {template}, but found {count}",
                        self.describe_range()
                    ),
                ));
            }
            verified.extend(matching.into_iter().cloned());
        }
        Ok(verified)
    }
}

/// Every template matched at least once, and every trace matched by some template.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExhaustiveSoftVerifier;

impl Verifier for ExhaustiveSoftVerifier {
    fn verify(&self, traces: &[CallTrace], templates: &[CallTemplate]) -> Result<Vec<CallTrace>> {
        let verified = SoftVerifier::new(1, usize::MAX).verify(traces, templates)?;
        let unverified: Vec<String> = traces
            .iter()
            .filter(|t| !verified.iter().any(|v| v.is_same_call(t)))
            .map(ToString::to_string)
            .collect();
        if !unverified.is_empty() {
            return Err(fail_assertion(
                traces,
                templates,
                &format!("Not all calls verified: {}", unverified.join(", ")),
            ));
        }
        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallEvent;
    use crate::matcher::ArgMatcher;
    use crate::value::MockId;
    use crate::verify::fixtures::{template, trace};

    #[test]
    fn test_soft_counts_per_template() {
        let traces = [trace("f", 1, 0), trace("f", 2, 1), trace("g", 1, 2)];
        let verifier = SoftVerifier::new(1, usize::MAX);

        let verified = verifier
            .verify(&traces, &[template("f", ArgMatcher::any())])
            .unwrap();
        let stamps: Vec<u64> = verified.iter().map(|t| t.order_stamp).collect();
        assert_eq!(stamps, vec![0, 1]);

        let err = verifier
            .verify(&traces, &[template("f", ArgMatcher::eq(3))])
            .unwrap_err();
        assert!(err.to_string().contains("Expected at least 1 call(s) of A@1.f(x = 3), but found 0"));
    }

    #[test]
    fn test_soft_fails_fast_on_first_template() {
        let traces = [trace("f", 1, 0)];
        let err = SoftVerifier::new(1, 1)
            .verify(
                &traces,
                &[template("g", ArgMatcher::any()), template("h", ArgMatcher::any())],
            )
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exactly 1 call(s) of A@1.g(x = any())"));
    }

    #[test]
    fn test_range_descriptions() {
        assert_eq!(SoftVerifier::new(2, 2).describe_range(), "exactly 2");
        assert_eq!(SoftVerifier::new(0, 3).describe_range(), "at most 3");
        assert_eq!(SoftVerifier::new(1, 4).describe_range(), "between 1 and 4");
    }

    #[test]
    fn test_exhaustive_requires_every_call() {
        let traces = [trace("f", 1, 0), trace("g", 1, 1)];
        assert!(ExhaustiveSoftVerifier
            .verify(&traces, &[template("f", ArgMatcher::any()), template("g", ArgMatcher::any())])
            .is_ok());
        let err = ExhaustiveSoftVerifier
            .verify(&traces, &[template("f", ArgMatcher::any())])
            .unwrap_err();
        assert!(err.to_string().contains("Not all calls verified: A@1.g(x = 1)"));
    }

    #[test]
    fn test_exhaustive_tells_receivers_apart() {
        let other = CallEvent::new(MockId::new("B@1"), "g").arg("x", 1).to_trace(0);
        let traces = [trace("f", 1, 0), other];
        let err = ExhaustiveSoftVerifier
            .verify(&traces, &[template("f", ArgMatcher::any())])
            .unwrap_err();
        assert!(err.to_string().contains("Not all calls verified: B@1.g(x = 1)"));
    }
}
