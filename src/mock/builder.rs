use crate::call::{CallArg, CallEvent};
use crate::error::{Error, Result};
use crate::templating::TemplatingScope;
use crate::value::{TypeDesc, Value};

use super::Mock;

/// Builds one call to a mock, argument by argument, the way a proxy would.
///
/// Inside a recording block (see [`TemplatingScope::on`]) every argument is routed
/// through the scope so matchers can be attached to parameters. Variadic parameters
/// are built from [`element`](Self::element) and [`spread`](Self::spread) calls and
/// closed with [`varargs`](Self::varargs).
///
/// Errors raised while building are kept and reported by [`invoke`](Self::invoke).
#[must_use = "a call is only delivered by `invoke`"]
pub struct CallBuilder<'s> {
    mock: Mock,
    scope: Option<(&'s TemplatingScope, u64)>,
    event: CallEvent,
    pending: Vec<Value>,
    error: Option<Error>,
}

impl<'s> CallBuilder<'s> {
    pub(crate) fn direct(mock: &Mock, name: impl Into<String>) -> CallBuilder<'static> {
        CallBuilder {
            mock: mock.clone(),
            scope: None,
            event: CallEvent::new(mock.id().clone(), name),
            pending: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn recording(
        scope: &'s TemplatingScope,
        mock: &Mock,
        name: impl Into<String>,
    ) -> Self {
        let token = scope.next_token();
        let error = scope.ensure_binding(token, mock).err();
        Self {
            mock: mock.clone(),
            scope: Some((scope, token)),
            event: CallEvent::new(mock.id().clone(), name),
            pending: Vec::new(),
            error,
        }
    }

    /// Set the declared return type.
    pub fn returning(mut self, return_type: TypeDesc) -> Self {
        self.event.return_type = return_type;
        self
    }

    /// Pass a regular argument.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let mut value = value.into();
        if let Some((scope, token)) = self.scope {
            value = scope.intercept_arg(token, &name, value);
        }
        self.event.args.push(CallArg::new(name, value));
        self
    }

    /// Pass one element of the variadic parameter being built.
    pub fn element(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        let value = self.intercept_element(value, false);
        self.pending.push(value);
        self
    }

    /// Spread a sequence into the variadic parameter being built.
    pub fn spread(mut self, values: impl Into<Value>) -> Self {
        let values = values.into();
        let values = self.intercept_element(values, true);
        match values {
            Value::List(items) => self.pending.extend(items),
            other => {
                if self.error.is_none() {
                    self.error = Some(Error::NotASequence(other.to_string()));
                }
            }
        }
        self
    }

    /// Close the variadic parameter `name` with the elements passed so far.
    pub fn varargs(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut value = Value::List(std::mem::take(&mut self.pending));
        if let Some((scope, token)) = self.scope {
            value = scope.intercept_arg(token, &name, value);
        }
        self.event.args.push(CallArg::vararg(name, value));
        self
    }

    /// Attach a supertype implementation of the called function.
    pub fn with_super<F>(mut self, supertype: impl Into<String>, call: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.event = self.event.with_super(supertype, call);
        self
    }

    /// The call built so far.
    #[must_use]
    pub fn event(&self) -> &CallEvent {
        &self.event
    }

    /// Deliver the call as a blocking call.
    ///
    /// # Errors
    ///
    /// The first error raised while building, then every error of
    /// [`Mock::intercept`].
    pub fn invoke(self) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.mock.intercept(self.event)
    }

    /// Deliver the call as a suspending call.
    ///
    /// # Errors
    ///
    /// The first error raised while building, then every error of
    /// [`Mock::intercept_suspend`].
    pub async fn invoke_suspend(self) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.mock.intercept_suspend(self.event).await
    }

    fn intercept_element(&mut self, value: Value, is_spread: bool) -> Value {
        let Some((scope, token)) = self.scope else {
            return value;
        };
        match scope.intercept_vararg_element(token, value.clone(), is_spread) {
            Ok(value) => value,
            Err(e) => {
                self.error.get_or_insert(e);
                value
            }
        }
    }
}

impl std::fmt::Debug for CallBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallBuilder")
            .field("mock", self.mock.id())
            .field("recording", &self.scope.is_some())
            .field("event", &self.event)
            .field("pending", &self.pending)
            .field("error", &self.error)
            .finish()
    }
}
