//! Call model.
//!
//! - [`CallEvent`] - one intercepted call as delivered by the proxy layer
//! - [`CallTemplate`] - a stub definition or verification expectation
//! - [`CallTrace`] - an observed call
//! - [`CallMatchResult`] - how close a trace comes to a template

mod matching;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::matcher::ArgMatcher;
use crate::value::{MockId, TypeDesc, Value};

pub use matching::CallMatchResult;

/// One argument of a call, keyed by its formal parameter name.
#[derive(Clone, Debug, PartialEq)]
pub struct CallArg {
    /// Formal parameter name.
    pub name: String,
    /// Actual value.
    pub value: Value,
    /// Whether the parameter is variadic. Its value is then a [`Value::List`].
    pub is_vararg: bool,
}

impl CallArg {
    /// A regular argument.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_vararg: false,
        }
    }

    /// A variadic argument.
    pub fn vararg(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_vararg: true,
        }
    }
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

/// Builds the overload-stable signature of a function from its parameter names.
#[must_use]
pub fn signature(name: &str, args: &[CallArg]) -> String {
    let params: Vec<String> = args
        .iter()
        .map(|arg| {
            if arg.is_vararg {
                format!("vararg {}", arg.name)
            } else {
                arg.name.clone()
            }
        })
        .collect();
    format!("{name}({})", params.join(", "))
}

/// Handle to a supertype implementation of the called function.
pub type SuperCall = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// A call captured by the proxy layer.
#[derive(Clone)]
pub struct CallEvent {
    /// Identity of the receiving mock.
    pub receiver: MockId,
    /// Function name.
    pub name: String,
    /// Declared return type.
    pub return_type: TypeDesc,
    /// Arguments in declaration order.
    pub args: Vec<CallArg>,
    /// Supertype implementations, keyed by supertype name.
    pub supers: HashMap<String, SuperCall>,
}

impl CallEvent {
    /// A call returning `Unit` with no arguments.
    pub fn new(receiver: MockId, name: impl Into<String>) -> Self {
        Self {
            receiver,
            name: name.into(),
            return_type: TypeDesc::Unit,
            args: Vec::new(),
            supers: HashMap::new(),
        }
    }

    /// Set the declared return type.
    #[must_use]
    pub fn returning(mut self, return_type: TypeDesc) -> Self {
        self.return_type = return_type;
        self
    }

    /// Append a regular argument.
    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.push(CallArg::new(name, value));
        self
    }

    /// Append a variadic argument.
    #[must_use]
    pub fn vararg(mut self, name: impl Into<String>, values: impl Into<Value>) -> Self {
        self.args.push(CallArg::vararg(name, values));
        self
    }

    /// Attach a supertype implementation.
    #[must_use]
    pub fn with_super<F>(mut self, supertype: impl Into<String>, call: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.supers.insert(supertype.into(), Arc::new(call));
        self
    }

    /// Overload-stable signature of the called function.
    #[must_use]
    pub fn signature(&self) -> String {
        signature(&self.name, &self.args)
    }

    /// Trace of this call with the given order stamp.
    #[must_use]
    pub fn to_trace(&self, order_stamp: u64) -> CallTrace {
        CallTrace {
            receiver: self.receiver.clone(),
            name: self.name.clone(),
            signature: self.signature(),
            args: self.args.clone(),
            order_stamp,
        }
    }
}

impl fmt::Debug for CallEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut supers: Vec<&String> = self.supers.keys().collect();
        supers.sort();
        f.debug_struct("CallEvent")
            .field("receiver", &self.receiver)
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("args", &self.args)
            .field("supers", &supers)
            .finish()
    }
}

/// Stored call pattern: a stub or an expectation.
#[derive(Clone, Debug, PartialEq)]
pub struct CallTemplate {
    /// Identity of the receiving mock.
    pub receiver: MockId,
    /// Function name.
    pub name: String,
    /// Overload-stable signature.
    pub signature: String,
    /// Matchers in parameter order, keyed by parameter name.
    pub matchers: Vec<(String, ArgMatcher)>,
}

impl CallTemplate {
    /// The matcher for a parameter.
    #[must_use]
    pub fn matcher(&self, name: &str) -> Option<&ArgMatcher> {
        self.matchers
            .iter()
            .find_map(|(param, matcher)| (param == name).then_some(matcher))
    }
}

impl fmt::Display for CallTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self
            .matchers
            .iter()
            .map(|(name, matcher)| format!("{name} = {matcher}"))
            .collect();
        write!(f, "{}.{}({})", self.receiver, self.name, args.join(", "))
    }
}

/// Immutable record of an observed call.
#[derive(Clone, Debug, PartialEq)]
pub struct CallTrace {
    /// Identity of the receiving mock.
    pub receiver: MockId,
    /// Function name.
    pub name: String,
    /// Overload-stable signature.
    pub signature: String,
    /// Actual arguments.
    pub args: Vec<CallArg>,
    /// Position of the call among all traced calls of the process.
    pub order_stamp: u64,
}

impl CallTrace {
    /// Value of the named argument.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args
            .iter()
            .find_map(|arg| (arg.name == name).then_some(&arg.value))
    }

    /// Whether both traces record the same observed call.
    #[must_use]
    pub fn is_same_call(&self, other: &CallTrace) -> bool {
        self.order_stamp == other.order_stamp && self.receiver == other.receiver
    }

    /// Whether this trace satisfies the template.
    #[must_use]
    pub fn matches(&self, template: &CallTemplate) -> bool {
        CallMatchResult::of(self, template) == CallMatchResult::Matching
    }
}

impl fmt::Display for CallTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        write!(f, "{}.{}({})", self.receiver, self.name, args.join(", "))
    }
}
