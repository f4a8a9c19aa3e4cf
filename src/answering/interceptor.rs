use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;

use super::{Answer, FunctionScope, MockMode};
use crate::autofill::AutofillRegistry;
use crate::call::{CallEvent, CallTemplate, CallTrace};
use crate::error::{Error, Result};
use crate::matcher::ArgMatcher;
use crate::mock::Mock;
use crate::value::{TypeDesc, Value};

/// One call as seen by the interceptor.
#[derive(Debug)]
pub struct CallContext<'a> {
    /// The call delivered by the proxy.
    pub event: &'a CallEvent,
    /// Its trace.
    pub trace: &'a CallTrace,
    /// The receiving mock, resolved through its context.
    pub self_mock: Option<Mock>,
    /// Autofill used for fallbacks and autofill answers.
    pub autofill: &'a Arc<AutofillRegistry>,
}

enum Resolved {
    Answer(Answer, FunctionScope),
    Value(Value),
}

/// Clears the modification flag on drop.
struct ModificationGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ModificationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Template table of one mock.
///
/// Templates keep setup order. Setting up a template equal to an existing one drops
/// the old entry and adds the new one last; resolution scans newest first, so the
/// most recent matching stub wins.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use mockkit::answering::{Answer, AnsweringInterceptor, CallContext, MockMode};
/// use mockkit::autofill::AutofillRegistry;
/// use mockkit::call::{CallEvent, CallTemplate};
/// use mockkit::matcher::ArgMatcher;
/// use mockkit::{MockId, TypeDesc, Value};
///
/// let interceptor = AnsweringInterceptor::new(MockMode::Strict);
/// interceptor
///     .setup(
///         CallTemplate {
///             receiver: MockId::new("Repo@1"),
///             name: "find".into(),
///             signature: "find(id)".into(),
///             matchers: vec![("id".into(), ArgMatcher::any())],
///         },
///         Answer::Const(Value::from("bob")),
///     )
///     .unwrap();
///
/// let event = CallEvent::new(MockId::new("Repo@1"), "find")
///     .returning(TypeDesc::Str)
///     .arg("id", 1);
/// let trace = event.to_trace(0);
/// let autofill = Arc::new(AutofillRegistry::new());
/// let value = interceptor
///     .intercept_call(CallContext { event: &event, trace: &trace, self_mock: None, autofill: &autofill })
///     .unwrap();
/// assert_eq!(value, Value::from("bob"));
/// ```
#[derive(Debug)]
pub struct AnsweringInterceptor {
    mode: MockMode,
    answers: Mutex<Vec<(CallTemplate, Answer)>>,
    modifying: AtomicBool,
}

impl AnsweringInterceptor {
    /// Create an interceptor with no templates.
    #[must_use]
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            answers: Mutex::new(Vec::new()),
            modifying: AtomicBool::new(false),
        }
    }

    /// Fallback mode.
    #[must_use]
    pub fn mode(&self) -> MockMode {
        self.mode
    }

    /// Current templates and answers in insertion order.
    #[must_use]
    pub fn answers(&self) -> Vec<(CallTemplate, Answer)> {
        self.answers.lock().clone()
    }

    /// Templates in insertion order.
    #[must_use]
    pub fn templates(&self) -> Vec<CallTemplate> {
        self.answers.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Add a template as the newest one. An equal template set up earlier is dropped.
    ///
    /// # Errors
    ///
    /// [`Error::ConcurrentTemplating`] when another modification is in progress.
    pub fn setup(&self, template: CallTemplate, answer: Answer) -> Result<()> {
        let _guard = self.modify()?;
        tracing::debug!(template = %template, ?answer, "stub set up");
        let mut answers = self.answers.lock();
        answers.retain(|(t, _)| t != &template);
        answers.push((template, answer));
        Ok(())
    }

    /// Drop every template.
    ///
    /// # Errors
    ///
    /// [`Error::ConcurrentTemplating`] when another modification is in progress.
    pub fn reset(&self) -> Result<()> {
        let _guard = self.modify()?;
        self.answers.lock().clear();
        Ok(())
    }

    /// Resolve a blocking call.
    ///
    /// # Errors
    ///
    /// - [`Error::ConcurrentTemplating`] while templates are being modified
    /// - [`Error::CallNotMocked`] when nothing matches and the mode has no fallback
    /// - [`Error::SuspendAnswerInBlockingCall`] for async answers
    /// - whatever the answer itself fails with
    pub fn intercept_call(&self, ctx: CallContext<'_>) -> Result<Value> {
        let autofill = ctx.autofill;
        match self.resolve(&ctx)? {
            Resolved::Answer(answer, scope) => answer.call(&scope, autofill),
            Resolved::Value(value) => Ok(value),
        }
    }

    /// Resolve a suspending call. The template lookup runs before the returned
    /// future is first polled; no lock is held while it runs.
    pub fn intercept_suspend_call(
        &self,
        ctx: CallContext<'_>,
    ) -> BoxFuture<'static, Result<Value>> {
        let autofill = Arc::clone(ctx.autofill);
        match self.resolve(&ctx) {
            Ok(Resolved::Answer(answer, scope)) => answer.call_suspend(scope, autofill),
            Ok(Resolved::Value(value)) => future::ready(Ok(value)).boxed(),
            Err(e) => future::ready(Err(e)).boxed(),
        }
    }

    fn resolve(&self, ctx: &CallContext<'_>) -> Result<Resolved> {
        if self.modifying.load(Ordering::SeqCst) {
            return Err(Error::ConcurrentTemplating);
        }
        // Matchers may run user code; match against a snapshot.
        let answers = self.answers.lock().clone();
        let Some((template, answer)) = answers.into_iter().rev().find(|(t, _)| ctx.trace.matches(t))
        else {
            return self.handle_missing_answer(ctx);
        };

        for (name, matcher) in &template.matchers {
            if let ArgMatcher::Capture(capture) = matcher {
                capture.capture(ctx.trace.arg(name).cloned().unwrap_or(Value::Null));
            }
        }
        tracing::trace!(call = %ctx.trace, template = %template, "call answered");

        let event = ctx.event;
        let scope = FunctionScope::new(
            event.name.clone(),
            event.return_type.clone(),
            event.args.iter().map(|arg| arg.value.clone()).collect(),
            ctx.self_mock.clone(),
            event.supers.clone(),
        );
        Ok(Resolved::Answer(answer, scope))
    }

    fn handle_missing_answer(&self, ctx: &CallContext<'_>) -> Result<Resolved> {
        let return_type = &ctx.event.return_type;
        match self.mode {
            MockMode::Autofill => Ok(Resolved::Value(ctx.autofill.provide_value(return_type))),
            MockMode::AutoUnit if *return_type == TypeDesc::Unit => {
                Ok(Resolved::Value(Value::Unit))
            }
            _ => Err(Error::CallNotMocked(ctx.trace.to_string())),
        }
    }

    fn modify(&self) -> Result<ModificationGuard<'_>> {
        if self
            .modifying
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::ConcurrentTemplating);
        }
        Ok(ModificationGuard {
            flag: &self.modifying,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::CaptureSink;
    use crate::value::MockId;

    fn template(id: ArgMatcher) -> CallTemplate {
        CallTemplate {
            receiver: MockId::new("Repo@1"),
            name: "find".into(),
            signature: "find(id)".into(),
            matchers: vec![("id".into(), id)],
        }
    }

    fn find(id: i64, return_type: TypeDesc) -> CallEvent {
        CallEvent::new(MockId::new("Repo@1"), "find")
            .returning(return_type)
            .arg("id", id)
    }

    fn call(interceptor: &AnsweringInterceptor, event: &CallEvent) -> Result<Value> {
        let trace = event.to_trace(0);
        let autofill = Arc::new(AutofillRegistry::new());
        interceptor.intercept_call(CallContext {
            event,
            trace: &trace,
            self_mock: None,
            autofill: &autofill,
        })
    }

    #[test]
    fn test_newest_matching_template_wins() {
        let interceptor = AnsweringInterceptor::new(MockMode::Strict);
        interceptor
            .setup(template(ArgMatcher::any()), Answer::Const(Value::from("any")))
            .unwrap();
        interceptor
            .setup(template(ArgMatcher::eq(1)), Answer::Const(Value::from("one")))
            .unwrap();

        assert_eq!(call(&interceptor, &find(1, TypeDesc::Str)).unwrap(), Value::from("one"));
        assert_eq!(call(&interceptor, &find(2, TypeDesc::Str)).unwrap(), Value::from("any"));
    }

    #[test]
    fn test_equal_template_moves_to_newest() {
        let interceptor = AnsweringInterceptor::new(MockMode::Strict);
        interceptor
            .setup(template(ArgMatcher::eq(1)), Answer::Const(Value::from("a")))
            .unwrap();
        interceptor
            .setup(template(ArgMatcher::any()), Answer::Const(Value::from("b")))
            .unwrap();
        interceptor
            .setup(template(ArgMatcher::eq(1)), Answer::Const(Value::from("c")))
            .unwrap();

        assert_eq!(interceptor.answers().len(), 2);
        assert_eq!(interceptor.templates()[1], template(ArgMatcher::eq(1)));
        assert_eq!(call(&interceptor, &find(1, TypeDesc::Str)).unwrap(), Value::from("c"));
        assert_eq!(call(&interceptor, &find(2, TypeDesc::Str)).unwrap(), Value::from("b"));
    }

    #[test]
    fn test_restubbed_general_template_beats_newer_specific_one() {
        let interceptor = AnsweringInterceptor::new(MockMode::Strict);
        for (matcher, answer) in [
            (ArgMatcher::any(), "a1"),
            (ArgMatcher::eq(1), "a2"),
            (ArgMatcher::any(), "a3"),
        ] {
            interceptor
                .setup(template(matcher), Answer::Const(Value::from(answer)))
                .unwrap();
        }
        assert_eq!(call(&interceptor, &find(1, TypeDesc::Str)).unwrap(), Value::from("a3"));
    }

    #[test]
    fn test_missing_answer_per_mode() {
        let strict = AnsweringInterceptor::new(MockMode::Strict);
        let err = call(&strict, &find(1, TypeDesc::Str)).unwrap_err();
        assert!(matches!(err, Error::CallNotMocked(msg) if msg == "Repo@1.find(id = 1)"));

        let autofill = AnsweringInterceptor::new(MockMode::Autofill);
        assert_eq!(call(&autofill, &find(1, TypeDesc::Int)).unwrap(), Value::from(0));

        let auto_unit = AnsweringInterceptor::new(MockMode::AutoUnit);
        assert_eq!(call(&auto_unit, &find(1, TypeDesc::Unit)).unwrap(), Value::Unit);
        assert!(matches!(
            call(&auto_unit, &find(1, TypeDesc::Int)),
            Err(Error::CallNotMocked(_))
        ));
    }

    #[test]
    fn test_captures_applied_on_match_only() {
        let sink = CaptureSink::new();
        let interceptor = AnsweringInterceptor::new(MockMode::Autofill);
        interceptor
            .setup(
                template(ArgMatcher::capture_matching(&sink, ArgMatcher::eq(1))),
                Answer::Autofill,
            )
            .unwrap();

        call(&interceptor, &find(1, TypeDesc::Int)).unwrap();
        call(&interceptor, &find(2, TypeDesc::Int)).unwrap();
        assert_eq!(sink.values(), vec![Value::from(1)]);
    }

    #[test]
    fn test_call_during_modification_is_rejected() {
        let interceptor = AnsweringInterceptor::new(MockMode::Autofill);
        let guard = interceptor.modify().unwrap();
        assert!(matches!(
            call(&interceptor, &find(1, TypeDesc::Int)),
            Err(Error::ConcurrentTemplating)
        ));
        assert!(matches!(interceptor.reset(), Err(Error::ConcurrentTemplating)));
        drop(guard);
        assert!(call(&interceptor, &find(1, TypeDesc::Int)).is_ok());
        interceptor.reset().unwrap();
    }

    #[test]
    fn test_super_call_answer() {
        let interceptor = AnsweringInterceptor::new(MockMode::Strict);
        interceptor
            .setup(template(ArgMatcher::any()), Answer::CallsSuper("Base".into()))
            .unwrap();
        let event = find(4, TypeDesc::Int).with_super("Base", |args| {
            Ok(Value::from(args[0].as_int().unwrap_or(0) + 1))
        });
        assert_eq!(call(&interceptor, &event).unwrap(), Value::from(5));
    }

    #[tokio::test]
    async fn test_suspend_call_uses_same_resolution() {
        let interceptor = AnsweringInterceptor::new(MockMode::Strict);
        interceptor
            .setup(
                template(ArgMatcher::any()),
                Answer::calls_suspend(|scope: FunctionScope| async move {
                    Ok(scope.arg(0).cloned().unwrap_or(Value::Null))
                }),
            )
            .unwrap();
        let event = find(3, TypeDesc::Int);
        let trace = event.to_trace(0);
        let autofill = Arc::new(AutofillRegistry::new());
        let value = interceptor
            .intercept_suspend_call(CallContext {
                event: &event,
                trace: &trace,
                self_mock: None,
                autofill: &autofill,
            })
            .await
            .unwrap();
        assert_eq!(value, Value::from(3));
    }
}
