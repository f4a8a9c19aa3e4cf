//! Recording sessions.
//!
//! A [`TemplatingScope`] turns the calls made inside a stubbing or verification
//! block into [`CallTemplate`]s instead of dispatching them:
//!
//! - matcher DSL calls ([`TemplatingScope::any`], [`TemplatingScope::eq`], ...) push
//!   matchers onto an accumulator and hand back a placeholder value
//! - [`TemplatingScope::intercept_arg`] assigns the accumulated matchers to a parameter
//! - [`TemplatingScope::save_template`] composes one matcher per parameter and stores
//!   the template
//!
//! Every mock reached during recording is bound to the scope and switched to
//! templating mode until the scope is released. Dropping the scope releases it, so
//! mocks are detached on every exit path, early `?` returns and panics included.
//!
//! # Example
//!
//! ```rust
//! use mockkit::{MockContext, TypeDesc};
//!
//! let ctx = MockContext::new();
//! let repo = ctx.mock("Repo");
//!
//! let templates = ctx
//!     .record(|s| {
//!         s.on(&repo, "find")
//!             .returning(TypeDesc::Str)
//!             .arg("id", s.any(TypeDesc::Int))
//!             .invoke()
//!     })
//!     .unwrap();
//!
//! assert_eq!(templates[0].to_string(), "Repo@1.find(id = any())");
//! assert!(!repo.is_templating());
//! ```

mod binder;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use self::binder::TokenBinder;
use crate::autofill::AutofillRegistry;
use crate::call::{signature, CallArg, CallTemplate};
use crate::error::{Error, Result};
use crate::matcher::{ArgMatcher, ArgMatchersComposer, CaptureSink, Matcher};
use crate::mock::{CallBuilder, Mock};
use crate::value::{MockId, TypeDesc, Value};

/// Per-mock flag telling whether the mock records calls, and for which scope.
#[derive(Default)]
pub(crate) struct TemplatingState {
    scope: Mutex<Option<Arc<ScopeShared>>>,
}

impl TemplatingState {
    pub(crate) fn is_enabled(&self) -> bool {
        self.scope.lock().is_some()
    }

    pub(crate) fn current(&self) -> Option<Arc<ScopeShared>> {
        self.scope.lock().clone()
    }

    fn is_enabled_with(&self, scope: &Arc<ScopeShared>) -> bool {
        self.scope
            .lock()
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, scope))
    }

    fn start(&self, scope: Arc<ScopeShared>) {
        *self.scope.lock() = Some(scope);
    }

    fn stop(&self) {
        *self.scope.lock() = None;
    }
}

impl fmt::Debug for TemplatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplatingState")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[derive(Default)]
struct ScopeState {
    released: bool,
    next_token: u64,
    accumulator: Vec<ArgMatcher>,
    binder: TokenBinder,
    spies: Vec<Mock>,
    templates: Vec<CallTemplate>,
}

/// Scope state shared with the mocks bound to it.
pub(crate) struct ScopeShared {
    autofill: Arc<AutofillRegistry>,
    composer: ArgMatchersComposer,
    state: Mutex<ScopeState>,
}

impl ScopeShared {
    pub(crate) fn placeholder(&self, ty: &TypeDesc) -> Value {
        self.autofill.provide_value(ty)
    }

    pub(crate) fn save_template(
        &self,
        receiver: &MockId,
        name: &str,
        args: &[CallArg],
    ) -> Result<()> {
        let mut state = self.state.lock();
        if state.released {
            return Ok(());
        }
        let mut data = state.binder.take_latest(receiver).unwrap_or_default();
        state.accumulator.clear();

        let matchers = args
            .iter()
            .map(|arg| {
                let recorded = data.matchers.remove(&arg.name).unwrap_or_default();
                Ok((arg.name.clone(), self.composer.compose(arg, recorded)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let template = CallTemplate {
            receiver: receiver.clone(),
            name: name.to_string(),
            signature: signature(name, args),
            matchers,
        };
        tracing::debug!(template = %template, "template recorded");
        state.templates.push(template);
        Ok(())
    }
}

/// A recording session.
///
/// Scopes are created by [`MockContext::record`](crate::MockContext::record),
/// [`every`](crate::MockContext::every) and [`verify`](crate::MockContext::verify),
/// which hand a reference to the block being recorded.
pub struct TemplatingScope {
    shared: Arc<ScopeShared>,
}

impl TemplatingScope {
    pub(crate) fn new(autofill: Arc<AutofillRegistry>) -> Self {
        Self {
            shared: Arc::new(ScopeShared {
                autofill,
                composer: ArgMatchersComposer,
                state: Mutex::new(ScopeState::default()),
            }),
        }
    }

    /// Start recording a call to `mock`.
    ///
    /// Binding errors are reported by the builder's `invoke`.
    #[must_use]
    pub fn on<'s>(&'s self, mock: &Mock, name: impl Into<String>) -> CallBuilder<'s> {
        CallBuilder::recording(self, mock, name)
    }

    /// A fresh token identifying one recorded call.
    pub fn next_token(&self) -> u64 {
        let mut state = self.shared.state.lock();
        state.next_token += 1;
        state.next_token
    }

    /// Bind `mock` to this scope under `token` and switch it to templating.
    ///
    /// # Errors
    ///
    /// [`Error::ConcurrentTemplating`] when the mock is already recording for
    /// another scope.
    pub fn ensure_binding(&self, token: u64, mock: &Mock) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.released {
            return Ok(());
        }
        state.binder.bind(token, mock.id());
        let templating = mock.templating();
        if templating.is_enabled_with(&self.shared) {
            return Ok(());
        }
        if templating.is_enabled() {
            return Err(Error::ConcurrentTemplating);
        }
        templating.start(Arc::clone(&self.shared));
        state.spies.push(mock.clone());
        Ok(())
    }

    /// Assign the matchers accumulated so far to parameter `name` of the call
    /// identified by `token`. Returns `value` unchanged.
    pub fn intercept_arg(&self, token: u64, name: &str, value: Value) -> Value {
        let mut state = self.shared.state.lock();
        if state.released {
            return value;
        }
        let ScopeState {
            accumulator,
            binder,
            ..
        } = &mut *state;
        if let Some(data) = binder.data_mut(token) {
            data.matchers
                .insert(name.to_string(), std::mem::take(accumulator));
            data.vararg_cursor = 0;
        }
        value
    }

    /// Account for one vararg element, or for a whole spread sequence.
    ///
    /// Elements without an explicit matcher are recorded as literal equality.
    ///
    /// # Errors
    ///
    /// - [`Error::NotASequence`] when a spread value is not a list
    /// - [`Error::VarargAmbiguity`] when only some elements have explicit matchers
    pub fn intercept_vararg_element(
        &self,
        token: u64,
        value: Value,
        is_spread: bool,
    ) -> Result<Value> {
        let mut state = self.shared.state.lock();
        if state.released {
            return Ok(value);
        }
        let ScopeState {
            accumulator,
            binder,
            ..
        } = &mut *state;
        let Some(data) = binder.data_mut(token) else {
            return Ok(value);
        };

        let elements = if is_spread {
            value
                .as_list()
                .ok_or_else(|| Error::NotASequence(value.to_string()))?
                .to_vec()
        } else {
            vec![value.clone()]
        };
        let explicit = accumulator.len().saturating_sub(data.vararg_cursor);
        if explicit != 0 && explicit < elements.len() {
            return Err(Error::VarargAmbiguity);
        }
        if explicit == 0 {
            accumulator.extend(elements.into_iter().map(ArgMatcher::Equals));
        }
        data.vararg_cursor = accumulator.len();
        Ok(value)
    }

    /// Compose and store the template of a finished call.
    ///
    /// # Errors
    ///
    /// Composition errors of the recorded matchers.
    pub fn save_template(&self, receiver: &MockId, name: &str, args: &[CallArg]) -> Result<()> {
        self.shared.save_template(receiver, name, args)
    }

    /// Stop recording and detach every bound mock. Idempotent.
    pub fn release(&self) {
        let spies = {
            let mut state = self.shared.state.lock();
            if state.released {
                return;
            }
            state.released = true;
            state.accumulator.clear();
            state.binder.clear();
            state.spies.clone()
        };
        for spy in &spies {
            spy.templating().stop();
        }
        tracing::trace!(spies = spies.len(), "templating scope released");
    }

    /// Whether [`release`](Self::release) has run.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.shared.state.lock().released
    }

    /// Templates recorded so far, in recording order.
    #[must_use]
    pub fn templates(&self) -> Vec<CallTemplate> {
        self.shared.state.lock().templates.clone()
    }

    /// Mocks bound to this scope, in binding order.
    #[must_use]
    pub fn spies(&self) -> Vec<Mock> {
        self.shared.state.lock().spies.clone()
    }

    /// Push `matcher` and return a placeholder of type `ty`.
    pub fn matches(&self, ty: &TypeDesc, matcher: ArgMatcher) -> Value {
        let placeholder = self.shared.placeholder(ty);
        let mut state = self.shared.state.lock();
        if !state.released {
            state.accumulator.push(matcher);
        }
        placeholder
    }

    /// Argument equal to `value`.
    pub fn eq(&self, value: impl Into<Value>) -> Value {
        let value = value.into();
        let mut state = self.shared.state.lock();
        if !state.released {
            state.accumulator.push(ArgMatcher::Equals(value.clone()));
        }
        value
    }

    /// Any argument of type `ty`.
    pub fn any(&self, ty: TypeDesc) -> Value {
        self.matches(&ty, ArgMatcher::any())
    }

    /// Argument accepted by `predicate`.
    pub fn matching<F>(&self, ty: TypeDesc, description: impl Into<String>, predicate: F) -> Value
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.matches(&ty, ArgMatcher::matching(description, predicate))
    }

    /// Argument accepted by a custom [`Matcher`].
    pub fn custom(&self, ty: TypeDesc, matcher: impl Matcher + 'static) -> Value {
        self.matches(&ty, ArgMatcher::custom(matcher))
    }

    /// Any argument, recorded into `sink` on every answered call.
    pub fn capture(&self, ty: TypeDesc, sink: &CaptureSink) -> Value {
        self.matches(&ty, ArgMatcher::capture(sink))
    }

    /// Argument accepted by `inner`, recorded into `sink` on every answered call.
    pub fn capture_matching(&self, ty: TypeDesc, sink: &CaptureSink, inner: ArgMatcher) -> Value {
        self.matches(&ty, ArgMatcher::capture_matching(sink, inner))
    }

    /// Negates the matcher recorded for `operand`.
    pub fn not(&self, operand: Value) -> Value {
        self.push(ArgMatcher::not());
        operand
    }

    /// All matchers recorded for `operands` must accept. An empty list fails the
    /// recorded call with [`Error::MissingArgMatchers`].
    pub fn and(&self, operands: Vec<Value>) -> Value {
        self.push(ArgMatcher::and(operands.len()));
        operands.into_iter().next().unwrap_or(Value::Null)
    }

    /// At least one matcher recorded for `operands` must accept. An empty list fails
    /// the recorded call with [`Error::MissingArgMatchers`].
    pub fn or(&self, operands: Vec<Value>) -> Value {
        self.push(ArgMatcher::or(operands.len()));
        operands.into_iter().next().unwrap_or(Value::Null)
    }

    /// Any run of vararg elements of type `elem`.
    pub fn any_varargs(&self, elem: TypeDesc) -> Value {
        self.matches(&TypeDesc::array_of(elem), ArgMatcher::any_varargs())
    }

    /// A run of vararg elements all accepted by `predicate`.
    pub fn varargs_all<F>(
        &self,
        elem: TypeDesc,
        description: impl Into<String>,
        predicate: F,
    ) -> Value
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.matches(
            &TypeDesc::array_of(elem),
            ArgMatcher::varargs_all(description, predicate),
        )
    }

    /// A run of vararg elements with at least one accepted by `predicate`.
    pub fn varargs_any<F>(
        &self,
        elem: TypeDesc,
        description: impl Into<String>,
        predicate: F,
    ) -> Value
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.matches(
            &TypeDesc::array_of(elem),
            ArgMatcher::varargs_any(description, predicate),
        )
    }

    fn push(&self, matcher: ArgMatcher) {
        let mut state = self.shared.state.lock();
        if !state.released {
            state.accumulator.push(matcher);
        }
    }
}

impl Drop for TemplatingScope {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for TemplatingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("TemplatingScope")
            .field("released", &state.released)
            .field("templates", &state.templates.len())
            .field("spies", &state.spies.len())
            .finish()
    }
}
