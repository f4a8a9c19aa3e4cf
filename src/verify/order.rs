use super::{fail_assertion, Verifier};
use crate::call::{CallTemplate, CallTrace};
use crate::error::Result;

/// Templates must be matched by an in-order subsequence of the traces.
///
/// Each template takes the first matching trace after the one taken by the
/// previous template. Calls in between are allowed and left unverified.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderVerifier;

impl Verifier for OrderVerifier {
    fn verify(&self, traces: &[CallTrace], templates: &[CallTemplate]) -> Result<Vec<CallTrace>> {
        let mut verified = Vec::with_capacity(templates.len());
        let mut position = 0;
        for template in templates {
            let found = traces[position..]
                .iter()
                .position(|trace| trace.matches(template));
            let Some(offset) = found else {
                return Err(fail_assertion(
                    traces,
                    templates,
                    &format!("Expected {template} in order, but it was not called after the previous expectation"),
                ));
            };
            verified.push(traces[position + offset].clone());
            position += offset + 1;
        }
        Ok(verified)
    }
}

/// Traces and templates must pair up one-to-one, in order.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExhaustiveOrderVerifier;

impl Verifier for ExhaustiveOrderVerifier {
    fn verify(&self, traces: &[CallTrace], templates: &[CallTemplate]) -> Result<Vec<CallTrace>> {
        if traces.len() != templates.len() {
            return Err(fail_assertion(
                traces,
                templates,
                &format!(
                    "Expected exactly {} call(s) in order, but found {}",
                    templates.len(),
                    traces.len()
                ),
            ));
        }
        if let Some((index, template)) = traces
            .iter()
            .zip(templates)
            .enumerate()
            .find_map(|(i, (trace, template))| (!trace.matches(template)).then_some((i, template)))
        {
            return Err(fail_assertion(
                traces,
                templates,
                &format!("Call #{} does not match {template}", index + 1),
            ));
        }
        Ok(traces.to_vec())
    }
}
