//! Stubbed behavior.
//!
//! - [`Answer`] - what a stubbed call does
//! - [`FunctionScope`] - what an answer sees of the call it answers
//! - [`MockMode`] - fallback for calls no template matches
//! - [`AnsweringInterceptor`] - per-mock template table and call resolution

mod interceptor;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;

use crate::autofill::AutofillRegistry;
use crate::call::SuperCall;
use crate::error::{Error, Result};
use crate::mock::Mock;
use crate::value::{TypeDesc, Value};

pub use interceptor::{AnsweringInterceptor, CallContext};

/// Behavior of a mock for calls no template matches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MockMode {
    /// Fail with [`Error::CallNotMocked`].
    #[default]
    Strict,
    /// Return an autofilled value of the declared return type.
    Autofill,
    /// Return `Unit` for functions returning `Unit`, fail otherwise.
    AutoUnit,
}

impl fmt::Display for MockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Autofill => f.write_str("autofill"),
            Self::AutoUnit => f.write_str("autounit"),
        }
    }
}

/// Everything an answer can see of the call being answered.
#[derive(Clone)]
pub struct FunctionScope {
    /// Function name.
    pub name: String,
    /// Declared return type.
    pub return_type: TypeDesc,
    /// Argument values in declaration order.
    pub args: Vec<Value>,
    /// The mock that received the call, when still registered.
    pub self_mock: Option<Mock>,
    supers: HashMap<String, SuperCall>,
}

impl FunctionScope {
    pub(crate) fn new(
        name: String,
        return_type: TypeDesc,
        args: Vec<Value>,
        self_mock: Option<Mock>,
        supers: HashMap<String, SuperCall>,
    ) -> Self {
        Self {
            name,
            return_type,
            args,
            self_mock,
            supers,
        }
    }

    /// Argument at `index`.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Invoke the implementation of this function provided by `supertype`.
    ///
    /// # Errors
    ///
    /// [`Error::SuperCallNotAvailable`] when the call carries no such implementation,
    /// otherwise whatever the implementation returns.
    pub fn call_super(&self, supertype: &str) -> Result<Value> {
        let call = self
            .supers
            .get(supertype)
            .ok_or_else(|| Error::SuperCallNotAvailable(supertype.to_string()))?;
        call(self.args.as_slice())
    }
}

impl fmt::Debug for FunctionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionScope")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("args", &self.args)
            .field("self_mock", &self.self_mock.as_ref().map(Mock::id))
            .finish_non_exhaustive()
    }
}

type BlockingFn = Arc<dyn Fn(&FunctionScope) -> Result<Value> + Send + Sync>;
type SuspendFn = Arc<dyn Fn(FunctionScope) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// What a stubbed call does.
#[derive(Clone)]
pub enum Answer {
    /// Return a fixed value.
    Const(Value),
    /// Fail with an error.
    Throws(Error),
    /// Compute the result with a blocking closure.
    Calls(BlockingFn),
    /// Compute the result with an async closure. Only valid for suspending calls.
    CallsSuspend(SuspendFn),
    /// Delegate to the named supertype implementation.
    CallsSuper(String),
    /// Answer with each of the queued answers once, in order.
    Sequential(Arc<Mutex<VecDeque<Answer>>>),
    /// Return an autofilled value of the declared return type.
    Autofill,
}

impl Answer {
    /// Answer computed by a closure.
    pub fn calls<F>(f: F) -> Self
    where
        F: Fn(&FunctionScope) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Calls(Arc::new(f))
    }

    /// Answer computed by an async closure.
    pub fn calls_suspend<F, Fut>(f: F) -> Self
    where
        F: Fn(FunctionScope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self::CallsSuspend(Arc::new(move |scope| f(scope).boxed()))
    }

    /// Answers used once each, in order.
    pub fn sequentially(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self::Sequential(Arc::new(Mutex::new(answers.into_iter().collect())))
    }

    /// Answer a blocking call.
    ///
    /// # Errors
    ///
    /// The answer's own failure, [`Error::SuspendAnswerInBlockingCall`] for async
    /// answers, [`Error::CallNotMocked`] once a sequence is exhausted.
    pub fn call(&self, scope: &FunctionScope, autofill: &AutofillRegistry) -> Result<Value> {
        match self {
            Self::Const(value) => Ok(value.clone()),
            Self::Throws(error) => Err(error.clone()),
            Self::Calls(f) => f(scope),
            Self::CallsSuspend(_) => Err(Error::SuspendAnswerInBlockingCall(scope.name.clone())),
            Self::CallsSuper(supertype) => scope.call_super(supertype),
            Self::Sequential(queue) => Self::next_in(queue, scope)?.call(scope, autofill),
            Self::Autofill => Ok(autofill.provide_value(&scope.return_type)),
        }
    }

    /// Answer a suspending call.
    pub fn call_suspend(
        &self,
        scope: FunctionScope,
        autofill: Arc<AutofillRegistry>,
    ) -> BoxFuture<'static, Result<Value>> {
        match self {
            Self::CallsSuspend(f) => f(scope),
            Self::Sequential(queue) => match Self::next_in(queue, &scope) {
                Ok(next) => next.call_suspend(scope, autofill),
                Err(e) => future::ready(Err(e)).boxed(),
            },
            other => future::ready(other.call(&scope, &autofill)).boxed(),
        }
    }

    fn next_in(queue: &Mutex<VecDeque<Answer>>, scope: &FunctionScope) -> Result<Answer> {
        queue
            .lock()
            .pop_front()
            .ok_or_else(|| {
                Error::CallNotMocked(format!("{} (sequential answers exhausted)", scope.name))
            })
    }
}

impl fmt::Debug for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(value) => f.debug_tuple("Const").field(value).finish(),
            Self::Throws(error) => f.debug_tuple("Throws").field(error).finish(),
            Self::Calls(_) => f.write_str("Calls(..)"),
            Self::CallsSuspend(_) => f.write_str("CallsSuspend(..)"),
            Self::CallsSuper(supertype) => f.debug_tuple("CallsSuper").field(supertype).finish(),
            Self::Sequential(queue) => f.debug_tuple("Sequential").field(&queue.lock().len()).finish(),
            Self::Autofill => f.write_str("Autofill"),
        }
    }
}

impl From<Value> for Answer {
    fn from(value: Value) -> Self {
        Self::Const(value)
    }
}
