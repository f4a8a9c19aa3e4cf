//! Property tests for vararg patterns and template resolution.

use std::sync::Arc;

use proptest::prelude::*;

use mockkit::answering::{Answer, AnsweringInterceptor, CallContext, MockMode};
use mockkit::autofill::AutofillRegistry;
use mockkit::call::{CallEvent, CallTemplate};
use mockkit::error::Error;
use mockkit::matcher::{ArgMatcher, CompositeVarArgMatcher};
use mockkit::{MockId, Value};

/// `[A, varargsAny(== "x"), B]`, composed newest first as a recording would.
fn framed_pattern() -> CompositeVarArgMatcher {
    [
        ArgMatcher::eq("B"),
        ArgMatcher::varargs_any("x", |v| v.as_str() == Some("x")),
        ArgMatcher::eq("A"),
    ]
    .into_iter()
    .try_fold(CompositeVarArgMatcher::default(), CompositeVarArgMatcher::compose)
    .unwrap()
}

fn framed(middle: &[String]) -> Value {
    Value::list(
        std::iter::once("A".to_string())
            .chain(middle.iter().cloned())
            .chain(std::iter::once("B".to_string())),
    )
}

fn find_template(key: Option<i64>) -> CallTemplate {
    CallTemplate {
        receiver: MockId::new("Repo@1"),
        name: "find".into(),
        signature: "find(id)".into(),
        matchers: vec![("id".into(), key.map_or_else(ArgMatcher::any, ArgMatcher::eq))],
    }
}

fn find(interceptor: &AnsweringInterceptor, id: i64) -> mockkit::Result<Value> {
    let event = CallEvent::new(MockId::new("Repo@1"), "find").arg("id", id);
    let trace = event.to_trace(0);
    let autofill = Arc::new(AutofillRegistry::new());
    interceptor.intercept_call(CallContext {
        event: &event,
        trace: &trace,
        self_mock: None,
        autofill: &autofill,
    })
}

proptest! {
    #[test]
    fn test_framed_vararg_needs_one_hit_in_middle(middle in prop::collection::vec("[w-z]", 0..8)) {
        let pattern = framed_pattern();
        let expected = middle.iter().any(|s| s == "x");
        prop_assert_eq!(pattern.matches(&framed(&middle)), expected);
    }

    #[test]
    fn test_framed_vararg_rejects_short_lists(items in prop::collection::vec("[A-Bx]", 0..2)) {
        let pattern = framed_pattern();
        prop_assert!(!pattern.matches(&Value::list(items)));
        prop_assert!(!pattern.matches(&Value::list(["A", "B"])));
    }

    #[test]
    fn test_second_wildcard_always_fails(
        fixed in prop::collection::vec(any::<i64>(), 0..6),
        split in 0usize..6,
    ) {
        let split = split.min(fixed.len());
        let mut matchers = fixed[..split]
            .iter()
            .map(|&v| ArgMatcher::eq(v))
            .chain(std::iter::once(ArgMatcher::any_varargs()))
            .chain(fixed[split..].iter().map(|&v| ArgMatcher::eq(v)))
            .chain(std::iter::once(ArgMatcher::varargs_all("any", |_| true)));
        let result = matchers
            .try_fold(CompositeVarArgMatcher::default(), CompositeVarArgMatcher::compose);
        prop_assert!(matches!(result, Err(Error::MultipleVarargWildcards)));
    }

    #[test]
    fn test_newest_matching_template_wins(
        setups in prop::collection::vec((prop::option::of(0i64..4), any::<i64>()), 1..12),
        id in 0i64..4,
    ) {
        let interceptor = AnsweringInterceptor::new(MockMode::Strict);
        let mut model: Vec<(Option<i64>, i64)> = Vec::new();
        for &(key, answer) in &setups {
            interceptor
                .setup(find_template(key), Answer::Const(Value::from(answer)))
                .unwrap();
            model.retain(|(k, _)| *k != key);
            model.push((key, answer));
        }

        let expected = model
            .iter()
            .rev()
            .find(|(key, _)| key.map_or(true, |k| k == id))
            .map(|&(_, answer)| answer);
        match (find(&interceptor, id), expected) {
            (Ok(value), Some(answer)) => prop_assert_eq!(value, Value::from(answer)),
            (Err(Error::CallNotMocked(_)), None) => {}
            (other, expected) => prop_assert!(false, "got {:?}, expected {:?}", other, expected),
        }
        prop_assert_eq!(interceptor.templates().len(), model.len());
    }
}
