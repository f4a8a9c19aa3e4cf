//! Mock objects and the context that owns them.
//!
//! This module ties the engine together for test code:
//!
//! - [`MockContext`] - creates and registers mocks, runs stubbing and verification blocks
//! - [`Mock`] - handle to one mock; proxies forward their calls to [`Mock::intercept`]
//! - [`CallBuilder`] - builds a [`CallEvent`] argument by argument, recording or not
//! - [`Stubbing`] - answer setter returned by [`MockContext::every`]
//! - [`MockConfig`] - context configuration
//!
//! # Stubbing and Verifying
//!
//! ```rust
//! use mockkit::{MockContext, TypeDesc, Value};
//!
//! let ctx = MockContext::new();
//! let repo = ctx.mock("Repo");
//!
//! ctx.every(|s| {
//!     s.on(&repo, "find")
//!         .returning(TypeDesc::Str)
//!         .arg("id", s.any(TypeDesc::Int))
//!         .invoke()
//! })
//! .unwrap()
//! .returns("bob")
//! .unwrap();
//!
//! let found = repo.call("find").returning(TypeDesc::Str).arg("id", 7).invoke();
//! assert_eq!(found.unwrap(), Value::from("bob"));
//!
//! ctx.verify(|s| s.on(&repo, "find").arg("id", s.eq(7)).invoke())
//!     .unwrap();
//! ```

mod builder;
mod config;
mod context;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::answering::{AnsweringInterceptor, CallContext, MockMode};
use crate::call::{CallEvent, CallTrace};
use crate::error::{Error, Result};
use crate::templating::TemplatingState;
use crate::trace::{CallTracer, OrderStamps};
use crate::value::{MockId, Value};

pub use builder::CallBuilder;
pub use config::MockConfig;
pub use context::{MockContext, Stubbing};

use context::ContextInner;

struct MockInner {
    id: MockId,
    type_name: String,
    interceptor: AnsweringInterceptor,
    tracer: CallTracer,
    templating: TemplatingState,
    attached: AtomicBool,
    context: Arc<ContextInner>,
}

/// Handle to one mock. Clones share the same mock.
#[derive(Clone)]
pub struct Mock {
    inner: Arc<MockInner>,
}

/// Non-owning mock handle kept by the context registry.
#[derive(Clone)]
pub(crate) struct WeakMock(Weak<MockInner>);

impl WeakMock {
    pub(crate) fn upgrade(&self) -> Option<Mock> {
        self.0.upgrade().map(|inner| Mock { inner })
    }
}

impl Mock {
    fn new(context: Arc<ContextInner>, id: MockId, type_name: String, mode: MockMode) -> Self {
        Self {
            inner: Arc::new(MockInner {
                id,
                type_name,
                interceptor: AnsweringInterceptor::new(mode),
                tracer: CallTracer::new(),
                templating: TemplatingState::default(),
                attached: AtomicBool::new(true),
                context,
            }),
        }
    }

    /// Identity of this mock.
    #[must_use]
    pub fn id(&self) -> &MockId {
        &self.inner.id
    }

    /// Name of the mocked type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.inner.type_name
    }

    /// Fallback mode for unmatched calls.
    #[must_use]
    pub fn mode(&self) -> MockMode {
        self.inner.interceptor.mode()
    }

    /// Whether this mock currently records calls as templates.
    #[must_use]
    pub fn is_templating(&self) -> bool {
        self.inner.templating.is_enabled()
    }

    /// Whether this mock is registered with its context.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.attached.load(Ordering::SeqCst)
    }

    /// The template table.
    #[must_use]
    pub fn interceptor(&self) -> &AnsweringInterceptor {
        &self.inner.interceptor
    }

    /// The call log.
    #[must_use]
    pub fn tracer(&self) -> &CallTracer {
        &self.inner.tracer
    }

    /// Every call received so far, oldest first.
    #[must_use]
    pub fn traces(&self) -> Vec<CallTrace> {
        self.inner.tracer.all()
    }

    /// Start building a call to this mock.
    #[must_use]
    pub fn call(&self, name: impl Into<String>) -> CallBuilder<'static> {
        CallBuilder::direct(self, name)
    }

    /// Deliver a blocking call.
    ///
    /// While the mock is templating, the call is saved as a template and an
    /// autofilled placeholder is returned. Otherwise it is traced and answered.
    ///
    /// # Errors
    ///
    /// [`Error::ObjectNotMocked`] for unregistered mocks, template composition
    /// errors while templating, and every error of
    /// [`AnsweringInterceptor::intercept_call`].
    pub fn intercept(&self, event: CallEvent) -> Result<Value> {
        if let Some(placeholder) = self.intercept_templating(&event)? {
            return Ok(placeholder);
        }
        let trace = self.trace(&event)?;
        let context = &self.inner.context;
        self.inner.interceptor.intercept_call(CallContext {
            event: &event,
            trace: &trace,
            self_mock: context.resolve(&event.receiver),
            autofill: &context.autofill,
        })
    }

    /// Deliver a suspending call. Resolution is the same as for
    /// [`intercept`](Self::intercept); async answers are awaited.
    ///
    /// # Errors
    ///
    /// Same as [`intercept`](Self::intercept), except that async answers are allowed.
    pub async fn intercept_suspend(&self, event: CallEvent) -> Result<Value> {
        if let Some(placeholder) = self.intercept_templating(&event)? {
            return Ok(placeholder);
        }
        let trace = self.trace(&event)?;
        let context = &self.inner.context;
        let answer = self.inner.interceptor.intercept_suspend_call(CallContext {
            event: &event,
            trace: &trace,
            self_mock: context.resolve(&event.receiver),
            autofill: &context.autofill,
        });
        answer.await
    }

    /// Drop every stub.
    ///
    /// # Errors
    ///
    /// [`Error::ConcurrentTemplating`] while templates are being modified.
    pub fn reset_answers(&self) -> Result<()> {
        self.inner.interceptor.reset()
    }

    /// Drop every recorded call.
    pub fn reset_calls(&self) {
        self.inner.tracer.reset();
    }

    pub(crate) fn templating(&self) -> &TemplatingState {
        &self.inner.templating
    }

    pub(crate) fn set_attached(&self, attached: bool) {
        self.inner.attached.store(attached, Ordering::SeqCst);
    }

    pub(crate) fn downgrade(&self) -> WeakMock {
        WeakMock(Arc::downgrade(&self.inner))
    }

    fn intercept_templating(&self, event: &CallEvent) -> Result<Option<Value>> {
        let Some(scope) = self.inner.templating.current() else {
            return Ok(None);
        };
        scope.save_template(&event.receiver, &event.name, &event.args)?;
        Ok(Some(scope.placeholder(&event.return_type)))
    }

    fn trace(&self, event: &CallEvent) -> Result<CallTrace> {
        if !self.is_attached() {
            return Err(Error::ObjectNotMocked(self.inner.id.to_string()));
        }
        let trace = event.to_trace(OrderStamps::global().next_stamp());
        self.inner.tracer.record(trace.clone());
        Ok(trace)
    }
}

impl PartialEq for Mock {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Mock {}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mock")
            .field("id", &self.inner.id)
            .field("mode", &self.mode())
            .field("calls", &self.inner.tracer.call_count())
            .field("templating", &self.is_templating())
            .finish()
    }
}

impl From<&Mock> for Value {
    fn from(mock: &Mock) -> Self {
        Value::Mock(mock.id().clone())
    }
}
