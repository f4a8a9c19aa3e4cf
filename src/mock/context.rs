use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Mock, MockConfig, WeakMock};
use crate::answering::{Answer, FunctionScope, MockMode};
use crate::autofill::AutofillRegistry;
use crate::call::{CallTemplate, CallTrace};
use crate::error::{Error, Result};
use crate::templating::TemplatingScope;
use crate::value::{MockId, Value};
use crate::verify::{NoMoreCallsVerifier, Verifier, VerifyMode};

pub(crate) struct ContextInner {
    pub(crate) config: MockConfig,
    pub(crate) autofill: Arc<AutofillRegistry>,
    next_id: AtomicU64,
    mocks: Mutex<HashMap<MockId, WeakMock>>,
}

impl ContextInner {
    pub(crate) fn resolve(&self, id: &MockId) -> Option<Mock> {
        self.mocks.lock().get(id).and_then(WeakMock::upgrade)
    }
}

/// Owner of a set of mocks.
///
/// A context hands out mock identities, keeps the registry used to resolve a
/// receiver back to its mock, orders calls across its mocks and runs stubbing and
/// verification blocks. Clones share the same context.
///
/// # Example
///
/// ```rust
/// use mockkit::{MockContext, TypeDesc, Value, VerifyMode};
///
/// let ctx = MockContext::new();
/// let log = ctx.mock("Logger");
///
/// ctx.every(|s| {
///     s.on(&log, "write")
///         .arg("level", s.any(TypeDesc::Int))
///         .spread(s.any_varargs(TypeDesc::Str))
///         .varargs("parts")
///         .invoke()
/// })
/// .unwrap()
/// .returns(())
/// .unwrap();
///
/// log.call("write").arg("level", 1).element("a").element("b").varargs("parts").invoke().unwrap();
///
/// ctx.verify_with(VerifyMode::Exactly(1), |s| {
///     s.on(&log, "write")
///         .arg("level", s.eq(1))
///         .spread(s.any_varargs(TypeDesc::Str))
///         .varargs("parts")
///         .invoke()
/// })
/// .unwrap();
/// ctx.verify_no_more_calls(&[&log]).unwrap();
/// ```
#[derive(Clone)]
pub struct MockContext {
    inner: Arc<ContextInner>,
}

impl MockContext {
    /// Context with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Context with the given configuration.
    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        let autofill = if config.isolated_autofill {
            Arc::new(AutofillRegistry::new())
        } else {
            Arc::clone(AutofillRegistry::global())
        };
        Self {
            inner: Arc::new(ContextInner {
                config,
                autofill,
                next_id: AtomicU64::new(1),
                mocks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &MockConfig {
        &self.inner.config
    }

    /// The autofill registry used by this context's mocks.
    #[must_use]
    pub fn autofill(&self) -> &Arc<AutofillRegistry> {
        &self.inner.autofill
    }

    /// Create and register a mock with the default mode.
    #[must_use]
    pub fn mock(&self, type_name: impl Into<String>) -> Mock {
        self.mock_with_mode(type_name, self.inner.config.default_mode)
    }

    /// Create and register a mock with the given mode.
    #[must_use]
    pub fn mock_with_mode(&self, type_name: impl Into<String>, mode: MockMode) -> Mock {
        let type_name = type_name.into();
        let n = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let id = MockId::new(format!("{type_name}@{n}"));
        let mock = Mock::new(Arc::clone(&self.inner), id, type_name, mode);
        self.register(&mock);
        tracing::debug!(mock = %mock.id(), %mode, "mock created");
        mock
    }

    /// Register `mock` so calls reach its interceptor and its identity resolves.
    pub fn register(&self, mock: &Mock) {
        let mut mocks = self.inner.mocks.lock();
        mocks.retain(|_, weak| weak.upgrade().is_some());
        mocks.insert(mock.id().clone(), mock.downgrade());
        mock.set_attached(true);
    }

    /// Unregister a mock. Returns whether an entry was removed.
    pub fn unregister(&self, id: &MockId) -> bool {
        let Some(weak) = self.inner.mocks.lock().remove(id) else {
            return false;
        };
        if let Some(mock) = weak.upgrade() {
            mock.set_attached(false);
        }
        true
    }

    /// The registered mock with identity `id`.
    #[must_use]
    pub fn resolve(&self, id: &MockId) -> Option<Mock> {
        self.inner.resolve(id)
    }

    /// Run `block` in a fresh recording scope and return the recorded templates.
    ///
    /// # Errors
    ///
    /// Whatever `block` fails with. Bound mocks are released either way.
    pub fn record<T, F>(&self, block: F) -> Result<Vec<CallTemplate>>
    where
        F: FnOnce(&TemplatingScope) -> Result<T>,
    {
        Ok(self.recording(block)?.templates())
    }

    /// Record a call and return a [`Stubbing`] for the last recorded template.
    ///
    /// # Errors
    ///
    /// Whatever `block` fails with, or [`Error::NoCallsRecorded`].
    pub fn every<T, F>(&self, block: F) -> Result<Stubbing>
    where
        F: FnOnce(&TemplatingScope) -> Result<T>,
    {
        let scope = self.recording(block)?;
        let template = scope.templates().pop().ok_or(Error::NoCallsRecorded)?;
        let mock = scope
            .spies()
            .into_iter()
            .find(|m| m.id() == &template.receiver)
            .or_else(|| self.resolve(&template.receiver))
            .ok_or_else(|| Error::ObjectNotMocked(template.receiver.to_string()))?;
        Ok(Stubbing { mock, template })
    }

    /// Verify with the configured default mode.
    ///
    /// # Errors
    ///
    /// See [`verify_with`](Self::verify_with).
    pub fn verify<T, F>(&self, block: F) -> Result<()>
    where
        F: FnOnce(&TemplatingScope) -> Result<T>,
    {
        self.verify_with(self.inner.config.default_verify_mode, block)
    }

    /// Check the unverified calls of the mocks reached in `block` against the
    /// templates recorded there. Calls accounted for are marked verified.
    ///
    /// # Errors
    ///
    /// Whatever `block` fails with, or [`Error::VerificationFailed`].
    pub fn verify_with<T, F>(&self, mode: VerifyMode, block: F) -> Result<()>
    where
        F: FnOnce(&TemplatingScope) -> Result<T>,
    {
        let scope = self.recording(block)?;
        let templates = scope.templates();
        let spies = scope.spies();
        let traces = unverified_traces(spies.iter());
        let verified = mode.verifier().verify(&traces, &templates)?;
        for spy in &spies {
            spy.tracer().mark_verified(&verified);
        }
        tracing::debug!(
            ?mode,
            templates = templates.len(),
            verified = verified.len(),
            "verification passed"
        );
        Ok(())
    }

    /// Fail when any of `mocks` has a call no verification accounted for.
    ///
    /// # Errors
    ///
    /// [`Error::VerificationFailed`] listing the remaining calls.
    pub fn verify_no_more_calls(&self, mocks: &[&Mock]) -> Result<()> {
        let traces = unverified_traces(mocks.iter().copied());
        NoMoreCallsVerifier.verify(&traces, &[])?;
        Ok(())
    }

    /// Drop the stubs and recorded calls of `mocks`.
    ///
    /// # Errors
    ///
    /// [`Error::ConcurrentTemplating`] when a mock's templates are being modified.
    pub fn reset(&self, mocks: &[&Mock]) -> Result<()> {
        for mock in mocks {
            mock.reset_answers()?;
            mock.reset_calls();
            tracing::debug!(mock = %mock.id(), "mock reset");
        }
        Ok(())
    }

    fn recording<T, F>(&self, block: F) -> Result<TemplatingScope>
    where
        F: FnOnce(&TemplatingScope) -> Result<T>,
    {
        let scope = TemplatingScope::new(Arc::clone(&self.inner.autofill));
        block(&scope)?;
        scope.release();
        Ok(scope)
    }
}

impl Default for MockContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockContext")
            .field("config", &self.inner.config)
            .field("mocks", &self.inner.mocks.lock().len())
            .finish()
    }
}

fn unverified_traces<'a>(mocks: impl Iterator<Item = &'a Mock>) -> Vec<CallTrace> {
    let mut traces: Vec<CallTrace> = mocks.flat_map(|m| m.tracer().unverified()).collect();
    traces.sort_by_key(|t| t.order_stamp);
    traces
}

/// Answer setter for the template recorded by [`MockContext::every`].
#[must_use = "a stubbing has no effect until an answer is set"]
#[derive(Debug)]
pub struct Stubbing {
    mock: Mock,
    template: CallTemplate,
}

impl Stubbing {
    /// The template being stubbed.
    pub fn template(&self) -> &CallTemplate {
        &self.template
    }

    /// The mock owning the template.
    pub fn mock(&self) -> &Mock {
        &self.mock
    }

    /// Set an arbitrary answer.
    ///
    /// # Errors
    ///
    /// [`Error::ConcurrentTemplating`] when the mock's templates are being modified.
    pub fn answers(self, answer: Answer) -> Result<()> {
        self.mock.interceptor().setup(self.template, answer)
    }

    /// Return `value`.
    ///
    /// # Errors
    ///
    /// See [`answers`](Self::answers).
    pub fn returns(self, value: impl Into<Value>) -> Result<()> {
        self.answers(Answer::Const(value.into()))
    }

    /// Fail with `error`.
    ///
    /// # Errors
    ///
    /// See [`answers`](Self::answers).
    pub fn throws<E>(self, error: E) -> Result<()>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.answers(Answer::Throws(Error::thrown(error)))
    }

    /// Compute the result with `f`.
    ///
    /// # Errors
    ///
    /// See [`answers`](Self::answers).
    pub fn calls<F>(self, f: F) -> Result<()>
    where
        F: Fn(&FunctionScope) -> Result<Value> + Send + Sync + 'static,
    {
        self.answers(Answer::calls(f))
    }

    /// Compute the result with async `f`. Only suspending calls can use it.
    ///
    /// # Errors
    ///
    /// See [`answers`](Self::answers).
    pub fn calls_suspend<F, Fut>(self, f: F) -> Result<()>
    where
        F: Fn(FunctionScope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.answers(Answer::calls_suspend(f))
    }

    /// Delegate to the implementation of `supertype`.
    ///
    /// # Errors
    ///
    /// See [`answers`](Self::answers).
    pub fn calls_super(self, supertype: impl Into<String>) -> Result<()> {
        self.answers(Answer::CallsSuper(supertype.into()))
    }

    /// Use each of `answers` once, in order.
    ///
    /// # Errors
    ///
    /// See [`answers`](Self::answers).
    pub fn sequentially(self, answers: impl IntoIterator<Item = Answer>) -> Result<()> {
        self.answers(Answer::sequentially(answers))
    }

    /// Return an autofilled value of the declared return type.
    ///
    /// # Errors
    ///
    /// See [`answers`](Self::answers).
    pub fn autofill(self) -> Result<()> {
        self.answers(Answer::Autofill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TypeDesc;

    #[test]
    fn test_every_without_calls() {
        let ctx = MockContext::new();
        let err = ctx.every(|_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::NoCallsRecorded));
    }

    #[test]
    fn test_every_uses_last_recorded_call() {
        let ctx = MockContext::new();
        let a = ctx.mock("A");
        let b = ctx.mock("B");
        let stubbing = ctx
            .every(|s| {
                s.on(&a, "f").invoke()?;
                s.on(&b, "g").returning(TypeDesc::Int).invoke()
            })
            .unwrap();
        assert_eq!(stubbing.mock(), &b);
        assert_eq!(stubbing.template().name, "g");
        stubbing.returns(3).unwrap();
        assert_eq!(b.call("g").returning(TypeDesc::Int).invoke().unwrap(), Value::from(3));
        assert!(a.interceptor().answers().is_empty());
    }

    #[test]
    fn test_block_error_releases_mocks() {
        let ctx = MockContext::new();
        let a = ctx.mock("A");
        let err = ctx
            .every(|s| {
                s.on(&a, "f").invoke()?;
                Err::<Value, _>(Error::NoCallsRecorded)
            })
            .unwrap_err();
        assert!(matches!(err, Error::NoCallsRecorded));
        assert!(!a.is_templating());
    }

    #[test]
    fn test_nested_recording_on_same_mock_is_concurrent() {
        let ctx = MockContext::new();
        let a = ctx.mock("A");
        let err = ctx
            .every(|s| {
                s.on(&a, "f").invoke()?;
                ctx.every(|inner| inner.on(&a, "g").invoke()).map(|_| ())
            })
            .unwrap_err();
        assert!(matches!(err, Error::ConcurrentTemplating));
        assert!(!a.is_templating());
    }

    #[test]
    fn test_verify_marks_and_no_more_calls() {
        let ctx = MockContext::with_config(MockConfig::new().mode(MockMode::Autofill));
        let a = ctx.mock("A");
        a.call("f").arg("x", 1).invoke().unwrap();
        a.call("f").arg("x", 2).invoke().unwrap();

        ctx.verify(|s| s.on(&a, "f").arg("x", s.eq(1)).invoke()).unwrap();
        let err = ctx.verify_no_more_calls(&[&a]).unwrap_err();
        assert!(err.to_string().contains("A@1.f(x = 2)"));
        assert!(!err.to_string().contains("x = 1"));

        ctx.verify(|s| s.on(&a, "f").arg("x", s.any(TypeDesc::Int)).invoke())
            .unwrap();
        ctx.verify_no_more_calls(&[&a]).unwrap();
    }

    #[test]
    fn test_failed_verification_marks_nothing() {
        let ctx = MockContext::with_config(MockConfig::new().mode(MockMode::Autofill));
        let a = ctx.mock("A");
        a.call("f").arg("x", 1).invoke().unwrap();
        assert!(ctx
            .verify_with(VerifyMode::Exactly(2), |s| s.on(&a, "f").arg("x", s.eq(1)).invoke())
            .is_err());
        assert_eq!(a.tracer().unverified().len(), 1);
    }

    #[test]
    fn test_reset_clears_answers_and_calls() {
        let ctx = MockContext::new();
        let a = ctx.mock("A");
        ctx.every(|s| s.on(&a, "f").invoke()).unwrap().returns(()).unwrap();
        a.call("f").invoke().unwrap();

        ctx.reset(&[&a]).unwrap();
        assert!(a.traces().is_empty());
        assert!(matches!(a.call("f").invoke(), Err(Error::CallNotMocked(_))));
    }

    #[test]
    fn test_resolve_and_unregister() {
        let ctx = MockContext::new();
        let a = ctx.mock("A");
        assert_eq!(ctx.resolve(a.id()), Some(a.clone()));
        assert!(ctx.unregister(a.id()));
        assert!(!ctx.unregister(a.id()));
        assert_eq!(ctx.resolve(a.id()), None);
    }

    #[test]
    fn test_isolated_autofill() {
        let ctx = MockContext::with_config(MockConfig::new().isolated_autofill());
        assert!(!Arc::ptr_eq(ctx.autofill(), AutofillRegistry::global()));
        assert!(Arc::ptr_eq(MockContext::new().autofill(), AutofillRegistry::global()));
    }
}
