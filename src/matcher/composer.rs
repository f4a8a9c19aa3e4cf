//! Turns the matchers recorded for one parameter into a single matcher.

use super::{ArgMatcher, Composite, CompositeVarArgMatcher};
use crate::call::CallArg;
use crate::error::{Error, Result};

/// Composes recorded matchers per parameter.
///
/// Logical composites (`not`, `and`, `or`) are recorded after their operands and take
/// them from the top of a stack. Whatever remains is either the parameter's single
/// matcher or, for a vararg parameter, the element matchers of a vararg pattern.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ArgMatchersComposer;

impl ArgMatchersComposer {
    pub(crate) fn compose(&self, arg: &CallArg, matchers: Vec<ArgMatcher>) -> Result<ArgMatcher> {
        let mut stack = Self::collapse(&arg.name, matchers)?;
        if arg.is_vararg {
            if stack.is_empty() {
                return Ok(ArgMatcher::Equals(arg.value.clone()));
            }
            let varargs = stack
                .into_iter()
                .rev()
                .try_fold(CompositeVarArgMatcher::default(), CompositeVarArgMatcher::compose)?;
            return Ok(ArgMatcher::Composite(Composite::VarArg(varargs)));
        }
        match stack.len() {
            0 => Ok(ArgMatcher::Equals(arg.value.clone())),
            1 => Ok(stack.remove(0)),
            _ => Err(Error::MultipleMatchersForSingleArg(arg.name.clone())),
        }
    }

    fn collapse(name: &str, matchers: Vec<ArgMatcher>) -> Result<Vec<ArgMatcher>> {
        let mut stack: Vec<ArgMatcher> = Vec::with_capacity(matchers.len());
        for matcher in matchers {
            match matcher {
                ArgMatcher::Composite(
                    Composite::And { arity: 0, .. } | Composite::Or { arity: 0, .. },
                ) => return Err(Error::MissingArgMatchers(name.to_string())),
                ArgMatcher::Composite(mut composite)
                    if !matches!(composite, Composite::VarArg(_)) && !composite.is_filled() =>
                {
                    while !composite.is_filled() {
                        let operand = stack
                            .pop()
                            .ok_or_else(|| Error::MissingArgMatchers(name.to_string()))?;
                        composite = composite.compose(operand)?;
                    }
                    stack.push(ArgMatcher::Composite(composite));
                }
                other => stack.push(other),
            }
        }
        Ok(stack)
    }
}
